//! Container image identity, Dockerfile rendering, build and push

pub mod coordinate;
pub mod docker;
pub mod dockerfile;
mod error;
mod mock;
pub mod registry;
pub mod tag;

pub use coordinate::{derive_image_name, parse_image_uri, ImageCoordinate, LOCAL_PREFIX};
pub use docker::{BuildContext, DockerImageBuilder, ImageBuilder};
pub use dockerfile::DockerfileRenderer;
pub use error::ImageError;
pub use mock::{MockImageBuilder, MockRegistry};
pub use registry::{EcrRegistry, ImageRegistry, RegistryCredentials};
pub use tag::{CommitLookup, GitHubCommitLookup, StaticCommitLookup, TagDeriver, NO_COMMIT};
