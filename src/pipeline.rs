//! End-to-end automation: fetch, plan, build, push, deploy
//!
//! Every external system sits behind a trait object so the same pipeline
//! runs against GitHub, Docker, ECR and CloudFormation in production and
//! against in-memory collaborators in tests.

use crate::config::{AutomationConfig, BuildConfig, ConfigError, DeployConfig};
use crate::deploy::{
    render_service_template, ClientConfig, PollPolicy, ReconcileError, ReconcileOutcome,
    StackBackend, StackReconciler, StackRequest, TemplateError,
};
use crate::fs::RealFileSystem;
use crate::image::{
    BuildContext, CommitLookup, DockerfileRenderer, ImageBuilder, ImageCoordinate, ImageError,
    ImageRegistry, TagDeriver,
};
use crate::plan::{BuildPlan, BuildPlanResolver, PlanError};
use crate::source::{FetchError, RepositoryUrl, SourceFetcher, SourceWorkspace};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("No {0} configured for this pipeline")]
    MissingCollaborator(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn help_message(&self) -> String {
        match self {
            PipelineError::Config(e) => e.help_message(),
            PipelineError::Fetch(e) => e.help_message(),
            PipelineError::Plan(e) => e.help_message(),
            PipelineError::Image(e) => e.help_message(),
            PipelineError::Reconcile(e) => e.help_message(),
            PipelineError::Other(e) => format!("Error: {:#}", e),
            other => format!("Error: {}", other),
        }
    }
}

/// Result of a deployment step
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub stack: ReconcileOutcome,
    pub setup_instructions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub plan: BuildPlan,
    pub image: ImageCoordinate,
    pub pushed: bool,
    pub deployment: Option<DeploymentOutcome>,
}

pub struct Pipeline {
    fetcher: Arc<dyn SourceFetcher>,
    tagger: TagDeriver,
    builder: Arc<dyn ImageBuilder>,
    registry: Option<Arc<dyn ImageRegistry>>,
    stacks: Option<Arc<dyn StackBackend>>,
    poll: PollPolicy,
    renderer: DockerfileRenderer,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        commits: Arc<dyn CommitLookup>,
        builder: Arc<dyn ImageBuilder>,
    ) -> Self {
        Self {
            fetcher,
            tagger: TagDeriver::new(commits),
            builder,
            registry: None,
            stacks: None,
            poll: PollPolicy::default(),
            renderer: DockerfileRenderer::new(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_stack_backend(mut self, stacks: Arc<dyn StackBackend>) -> Self {
        self.stacks = Some(stacks);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub async fn run(&self, config: &AutomationConfig) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        config.validate()?;
        let build = config
            .build
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("No 'build' section found in configuration file".to_string()))?;

        let (plan, image) = self.build_image(build).await?;

        let deployment = match config.active_deploy() {
            Some(deploy) => Some(self.deploy(deploy, &image).await?),
            None => {
                info!("Deployment skipped (deploy.enabled is false)");
                None
            }
        };

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Pipeline complete");
        Ok(PipelineOutcome {
            plan,
            image,
            pushed: build.push_to_ecr,
            deployment,
        })
    }

    async fn build_image(&self, build: &BuildConfig) -> Result<(BuildPlan, ImageCoordinate), PipelineError> {
        let repo = RepositoryUrl::parse(&build.github_url)?;
        let workspace = SourceWorkspace::new()?;

        info!(repository = %repo, branch = ?build.branch, "Fetching source");
        let server_root = self
            .fetcher
            .fetch(
                &repo,
                build.branch.as_deref(),
                build.subfolder.as_deref(),
                workspace.path(),
            )
            .await?;
        debug!("Server root: {}", server_root.display());

        let resolver = BuildPlanResolver::new(RealFileSystem::new());
        let plan = resolver.resolve(&server_root, &build.resolve_options())?;
        let dockerfile = self
            .renderer
            .load_or_render(build.dockerfile_path.as_deref(), &plan)?;

        let tag = self
            .tagger
            .derive(&build.github_url, build.branch.as_deref())
            .await;

        let registry = if build.push_to_ecr {
            Some(self.registry()?)
        } else {
            None
        };
        let repository_base = match (&registry, &build.repository_base) {
            (Some(_), Some(base)) => Some(base.clone()),
            (Some(registry), None) => Some(registry.default_repository_base().await?),
            (None, _) => None,
        };

        let image = ImageCoordinate::for_build(repository_base.as_deref(), &build.image_name, &tag);
        self.builder
            .build(&BuildContext::new(dockerfile, &server_root), &image)
            .await?;

        if let Some(registry) = registry {
            registry.ensure_repository(image.repository_name()).await?;
            let credentials = registry.credentials().await?;
            self.builder.push(&image, &credentials).await?;
        }

        Ok((plan, image))
    }

    async fn deploy(
        &self,
        deploy: &DeployConfig,
        image: &ImageCoordinate,
    ) -> Result<DeploymentOutcome, PipelineError> {
        let stacks = self
            .stacks
            .clone()
            .ok_or(PipelineError::MissingCollaborator("stack backend"))?;
        let target = deploy.target().ok_or_else(|| {
            ConfigError::Invalid("deploy.enabled requires service_name, cluster_name, and vpc_id".to_string())
        })?;

        let template = render_service_template(&target, image)?;
        let request = StackRequest::for_service(&target, template);
        let stack = StackReconciler::with_policy(stacks, self.poll)
            .reconcile(&request)
            .await?;

        let client = ClientConfig::new(&target.service_name, &stack.endpoint);
        let setup_instructions = client.setup_instructions()?;
        if let Some(path) = &deploy.save_config {
            client.save_instructions(path)?;
            info!("Client setup guide saved to {}", path.display());
        }

        Ok(DeploymentOutcome {
            stack,
            setup_instructions,
        })
    }

    fn registry(&self) -> Result<Arc<dyn ImageRegistry>, PipelineError> {
        self.registry
            .clone()
            .ok_or(PipelineError::MissingCollaborator("image registry"))
    }
}
