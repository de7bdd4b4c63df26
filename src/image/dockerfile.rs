//! Dockerfile rendering for a resolved [`BuildPlan`]
//!
//! The server tree is copied into the build context as `mcp-server/` and
//! staged under `/app/mcp-server` in the runtime image.

use super::error::ImageError;
use crate::plan::descriptor::{DependencyDescriptor, PackageManager};
use crate::plan::entrypoint::PROXY_PORT;
use crate::plan::BuildPlan;
use std::path::Path;
use tracing::{info, warn};

/// Directory name of the server tree inside the build context
pub const SERVER_DIR: &str = "mcp-server";

const BUILDER_IMAGE: &str = "python:3.12-alpine";
const RUNTIME_IMAGE: &str = "node:24-bullseye";

#[derive(Debug, Clone, Default)]
pub struct DockerfileRenderer;

impl DockerfileRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Uses `custom` verbatim when it exists, otherwise renders `plan`
    pub fn load_or_render(&self, custom: Option<&Path>, plan: &BuildPlan) -> Result<String, ImageError> {
        match custom {
            Some(path) if path.is_file() => {
                info!("Using custom Dockerfile {}", path.display());
                std::fs::read_to_string(path).map_err(|e| ImageError::DockerfileUnreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
            Some(path) => {
                warn!("Custom Dockerfile {} not found, generating one", path.display());
                Ok(self.render(plan))
            }
            None => Ok(self.render(plan)),
        }
    }

    pub fn render(&self, plan: &BuildPlan) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("FROM {} AS python-builder", BUILDER_IMAGE));
        lines.push("WORKDIR /app".into());
        lines.push(format!("COPY {dir}/ /app/{dir}/", dir = SERVER_DIR));
        lines.push(format!(
            "RUN find /app/{} -name '__pycache__' -type d -prune -exec rm -rf {{}} +",
            SERVER_DIR
        ));
        lines.push(String::new());

        lines.push(format!("FROM {} AS runtime", RUNTIME_IMAGE));
        lines.push(
            "RUN apt-get update \\\n    \
             && apt-get install -y --no-install-recommends python3 python3-pip python3-venv curl ca-certificates \\\n    \
             && rm -rf /var/lib/apt/lists/* \\\n    \
             && ln -sf /usr/bin/python3 /usr/local/bin/python \\\n    \
             && ln -sf /usr/bin/pip3 /usr/local/bin/pip"
                .into(),
        );
        lines.push(
            "RUN curl -LsSf https://astral.sh/uv/install.sh | env UV_INSTALL_DIR=/usr/local/bin sh".into(),
        );
        lines.push("RUN npm install -g mcp-proxy".into());
        lines.push("WORKDIR /app".into());
        lines.push(format!(
            "COPY --from=python-builder /app/{dir} /app/{dir}",
            dir = SERVER_DIR
        ));
        lines.push(format!("ENV PYTHONPATH=\"/app/{}:$PYTHONPATH\"", SERVER_DIR));

        lines.extend(install_steps(plan));

        for (key, value) in &plan.environment_variables {
            lines.push(format!("ENV {}=\"{}\"", key, escape(value)));
        }

        lines.push(format!("EXPOSE {}", PROXY_PORT));
        lines.push(format!(
            "HEALTHCHECK --interval=30s --timeout=10s --start-period=30s --retries=3 \\\n    \
             CMD curl -fsS http://localhost:{}/ping || exit 1",
            PROXY_PORT
        ));
        lines.push(format!("ENTRYPOINT {}", exec_form(plan.entrypoint_command.tokens())));

        let mut dockerfile = lines.join("\n");
        dockerfile.push('\n');
        dockerfile
    }
}

fn install_steps(plan: &BuildPlan) -> Vec<String> {
    let descriptor = plan.dependency_artifact.as_ref().map(|a| a.descriptor);
    match (descriptor, plan.package_manager) {
        (Some(DependencyDescriptor::Requirements), _) => vec![format!(
            "RUN pip install --no-cache-dir -r {}/requirements.txt",
            SERVER_DIR
        )],
        (Some(DependencyDescriptor::ProjectManifest), PackageManager::Uv) => vec![
            format!(
                "RUN cd {} && uv sync --frozen --no-dev --no-editable",
                SERVER_DIR
            ),
            format!("ENV PATH=\"/app/{}/.venv/bin:$PATH\"", SERVER_DIR),
        ],
        (Some(DependencyDescriptor::ProjectManifest), PackageManager::Poetry) => vec![
            "RUN pip install --no-cache-dir poetry".into(),
            format!(
                "RUN cd {} && poetry config virtualenvs.create false && poetry install --no-dev",
                SERVER_DIR
            ),
        ],
        (Some(DependencyDescriptor::ProjectManifest), PackageManager::Pip)
        | (Some(DependencyDescriptor::LegacySetup), _) => {
            vec![format!("RUN cd {} && pip install --no-cache-dir .", SERVER_DIR)]
        }
        (None, _) => Vec::new(),
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// JSON array with `", "` separators, as Dockerfile exec form is usually written
fn exec_form(tokens: &[String]) -> String {
    let quoted: Vec<String> = tokens
        .iter()
        .map(|t| format!("\"{}\"", escape(t)))
        .collect();
    format!("[{}]", quoted.join(", "))
}
