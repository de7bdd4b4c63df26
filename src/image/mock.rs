use super::coordinate::ImageCoordinate;
use super::docker::{BuildContext, ImageBuilder};
use super::error::ImageError;
use super::registry::{ImageRegistry, RegistryCredentials};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records build and push requests without touching a daemon
#[derive(Default)]
pub struct MockImageBuilder {
    built: Mutex<Vec<(String, String)>>,
    pushed: Mutex<Vec<String>>,
    build_error: Option<String>,
}

impl MockImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            build_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// `(reference, dockerfile)` per build
    pub fn built(&self) -> Vec<(String, String)> {
        self.built.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBuilder for MockImageBuilder {
    async fn build(&self, context: &BuildContext, image: &ImageCoordinate) -> Result<(), ImageError> {
        if let Some(message) = &self.build_error {
            return Err(ImageError::BuildFailed(message.clone()));
        }
        self.built
            .lock()
            .unwrap()
            .push((image.reference(), context.dockerfile.clone()));
        Ok(())
    }

    async fn push(
        &self,
        image: &ImageCoordinate,
        _credentials: &RegistryCredentials,
    ) -> Result<(), ImageError> {
        self.pushed.lock().unwrap().push(image.reference());
        Ok(())
    }
}

/// Registry with a fixed base that remembers ensured repositories
pub struct MockRegistry {
    base: String,
    ensured: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ensured: Mutex::new(Vec::new()),
        }
    }

    pub fn ensured(&self) -> Vec<String> {
        self.ensured.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageRegistry for MockRegistry {
    async fn ensure_repository(&self, repository_name: &str) -> Result<(), ImageError> {
        self.ensured.lock().unwrap().push(repository_name.to_string());
        Ok(())
    }

    async fn credentials(&self) -> Result<RegistryCredentials, ImageError> {
        Ok(RegistryCredentials {
            username: "AWS".to_string(),
            password: "mock-password".to_string(),
            server_address: format!("https://{}", self.base.split('/').next().unwrap_or_default()),
        })
    }

    async fn default_repository_base(&self) -> Result<String, ImageError> {
        Ok(self.base.clone())
    }
}
