use super::coordinate::ImageCoordinate;
use super::dockerfile::SERVER_DIR;
use super::error::ImageError;
use super::registry::RegistryCredentials;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::image::{BuildImageOptions, PushImageOptions};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Dockerfile text plus the server tree it copies from
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub dockerfile: String,
    pub server_root: PathBuf,
}

impl BuildContext {
    pub fn new(dockerfile: String, server_root: impl Into<PathBuf>) -> Self {
        Self {
            dockerfile,
            server_root: server_root.into(),
        }
    }

    /// Tar stream with `Dockerfile` and the tree under `mcp-server/`
    pub fn to_tar(&self) -> Result<Vec<u8>, ImageError> {
        build_context_archive(&self.dockerfile, &self.server_root)
    }
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, context: &BuildContext, image: &ImageCoordinate) -> Result<(), ImageError>;

    async fn push(
        &self,
        image: &ImageCoordinate,
        credentials: &RegistryCredentials,
    ) -> Result<(), ImageError>;
}

pub struct DockerImageBuilder {
    docker: Docker,
}

impl DockerImageBuilder {
    /// Connects with local defaults (`DOCKER_HOST` or the unix socket)
    pub async fn connect() -> Result<Self, ImageError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ImageError::DaemonUnavailable(e.to_string()))?;
        docker
            .ping()
            .await
            .map_err(|e| ImageError::DaemonUnavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ImageBuilder for DockerImageBuilder {
    async fn build(&self, context: &BuildContext, image: &ImageCoordinate) -> Result<(), ImageError> {
        info!(image = %image, "Building image");
        let archive = context.to_tar()?;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: image.reference(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(Bytes::from(archive)));
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| ImageError::BuildFailed(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(ImageError::BuildFailed(error));
            }
            if let Some(line) = info.stream.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
                debug!(target: "mcpship::image::build", "{}", line);
            }
        }

        info!(image = %image, "Built image");
        Ok(())
    }

    async fn push(
        &self,
        image: &ImageCoordinate,
        credentials: &RegistryCredentials,
    ) -> Result<(), ImageError> {
        info!(image = %image, "Pushing image");

        let options = PushImageOptions {
            tag: image.tag.clone(),
        };
        let auth = DockerCredentials {
            username: Some(credentials.username.clone()),
            password: Some(credentials.password.clone()),
            serveraddress: Some(credentials.server_address.clone()),
            ..Default::default()
        };

        let mut stream = self
            .docker
            .push_image(&image.repository_path, Some(options), Some(auth));
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| ImageError::PushFailed(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(ImageError::PushFailed(error));
            }
            if let Some(status) = info.status {
                debug!(
                    target: "mcpship::image::push",
                    "{}: {}",
                    status,
                    info.progress.unwrap_or_default()
                );
            }
        }

        info!(image = %image, "Pushed image");
        Ok(())
    }
}

pub fn build_context_archive(dockerfile: &str, server_root: &Path) -> Result<Vec<u8>, ImageError> {
    let context_err = |e: std::io::Error| ImageError::Context(e.to_string());

    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    let mut header = tar::Header::new_gnu();
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "Dockerfile", dockerfile.as_bytes())
        .map_err(context_err)?;

    builder
        .append_dir_all(SERVER_DIR, server_root)
        .map_err(|e| ImageError::Context(format!("{}: {}", server_root.display(), e)))?;

    builder.into_inner().map_err(context_err)
}
