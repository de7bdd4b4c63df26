use super::error::ImageError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::{EncryptionConfiguration, EncryptionType, ImageScanningConfiguration};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};

/// Repository namespace used when no registry is configured
pub const DEFAULT_NAMESPACE: &str = "mcp-servers";

#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_address", &self.server_address)
            .finish()
    }
}

impl RegistryCredentials {
    /// Decodes a base64 `user:password` authorization token
    pub fn from_token(token: &str, server_address: &str) -> Result<Self, ImageError> {
        let decoded = STANDARD
            .decode(token.trim())
            .map_err(|e| ImageError::Registry(format!("authorization token is not base64: {}", e)))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ImageError::Registry("authorization token is not UTF-8".to_string()))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| ImageError::Registry("authorization token has no ':'".to_string()))?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            server_address: server_address.to_string(),
        })
    }
}

#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Creates the repository (scan-on-push, AES256) if it is missing
    async fn ensure_repository(&self, repository_name: &str) -> Result<(), ImageError>;

    async fn credentials(&self) -> Result<RegistryCredentials, ImageError>;

    /// `<account>.dkr.ecr.<region>.amazonaws.com/mcp-servers`
    async fn default_repository_base(&self) -> Result<String, ImageError>;
}

pub struct EcrRegistry {
    ecr: aws_sdk_ecr::Client,
    sts: aws_sdk_sts::Client,
    region: String,
}

impl EcrRegistry {
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            ecr: aws_sdk_ecr::Client::new(&config),
            sts: aws_sdk_sts::Client::new(&config),
            region: region.to_string(),
        }
    }
}

#[async_trait]
impl ImageRegistry for EcrRegistry {
    async fn ensure_repository(&self, repository_name: &str) -> Result<(), ImageError> {
        match self
            .ecr
            .describe_repositories()
            .repository_names(repository_name)
            .send()
            .await
        {
            Ok(_) => {
                debug!(repository = repository_name, "ECR repository exists");
                return Ok(());
            }
            Err(e)
                if e.as_service_error()
                    .map_or(false, |se| se.is_repository_not_found_exception()) => {}
            Err(e) => return Err(ImageError::Registry(DisplayErrorContext(&e).to_string())),
        }

        info!(repository = repository_name, "Creating ECR repository");
        let encryption = EncryptionConfiguration::builder()
            .encryption_type(EncryptionType::Aes256)
            .build()
            .map_err(|e| ImageError::Registry(e.to_string()))?;

        match self
            .ecr
            .create_repository()
            .repository_name(repository_name)
            .image_scanning_configuration(
                ImageScanningConfiguration::builder().scan_on_push(true).build(),
            )
            .encryption_configuration(encryption)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .map_or(false, |se| se.is_repository_already_exists_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(ImageError::Registry(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn credentials(&self) -> Result<RegistryCredentials, ImageError> {
        let output = self
            .ecr
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| ImageError::Registry(DisplayErrorContext(&e).to_string()))?;

        let data = output
            .authorization_data()
            .first()
            .ok_or_else(|| ImageError::Registry("no authorization data returned".to_string()))?;
        let token = data
            .authorization_token()
            .ok_or_else(|| ImageError::Registry("authorization token missing".to_string()))?;
        let endpoint = data.proxy_endpoint().unwrap_or_default();

        RegistryCredentials::from_token(token, endpoint)
    }

    async fn default_repository_base(&self) -> Result<String, ImageError> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| ImageError::Registry(DisplayErrorContext(&e).to_string()))?;
        let account = identity
            .account()
            .ok_or_else(|| ImageError::Registry("caller identity has no account".to_string()))?;
        Ok(ecr_repository_base(account, &self.region))
    }
}

pub fn ecr_repository_base(account: &str, region: &str) -> String {
    format!("{}.dkr.ecr.{}.amazonaws.com/{}", account, region, DEFAULT_NAMESPACE)
}
