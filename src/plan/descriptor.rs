//! Dependency descriptor detection and package manager classification
//!
//! Descriptors are checked in a fixed priority order and are mutually
//! exclusive: the first one present decides both the dependency artifact
//! and the package manager for the whole plan.

use super::error::PlanError;
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Package manager used to install the server's dependencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Pip,
    Uv,
    Poetry,
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Pip => "pip",
            PackageManager::Uv => "uv",
            PackageManager::Poetry => "poetry",
        }
    }

    /// Classifies a project manifest by its tool marker tables.
    ///
    /// `[tool.uv]` wins over `[tool.poetry]` when both are present.
    pub fn classify_manifest(content: &str) -> Self {
        if content.contains("[tool.uv]") {
            PackageManager::Uv
        } else if content.contains("[tool.poetry]") {
            PackageManager::Poetry
        } else {
            PackageManager::Pip
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of dependency descriptor found at the root of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyDescriptor {
    /// `pyproject.toml`
    ProjectManifest,
    /// `requirements.txt`
    Requirements,
    /// `setup.py`
    LegacySetup,
}

/// Detection order; first match wins
const DESCRIPTOR_PRIORITY: [DependencyDescriptor; 3] = [
    DependencyDescriptor::ProjectManifest,
    DependencyDescriptor::Requirements,
    DependencyDescriptor::LegacySetup,
];

impl DependencyDescriptor {
    pub fn filename(&self) -> &'static str {
        match self {
            DependencyDescriptor::ProjectManifest => "pyproject.toml",
            DependencyDescriptor::Requirements => "requirements.txt",
            DependencyDescriptor::LegacySetup => "setup.py",
        }
    }

    /// Whether this descriptor has a command strategy of its own
    pub fn declares_scripts(&self) -> bool {
        !matches!(self, DependencyDescriptor::Requirements)
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

/// Dependency file the image build installs from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyArtifact {
    pub descriptor: DependencyDescriptor,
    /// Path relative to the source root
    pub file: PathBuf,
}

/// Outcome of descriptor detection for one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDetection {
    pub artifact: Option<DependencyArtifact>,
    pub package_manager: PackageManager,
}

impl DescriptorDetection {
    pub fn descriptor(&self) -> Option<DependencyDescriptor> {
        self.artifact.as_ref().map(|a| a.descriptor)
    }
}

/// Finds the highest-priority descriptor under `root`
pub fn detect_descriptor<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<DescriptorDetection, PlanError> {
    for descriptor in DESCRIPTOR_PRIORITY {
        let path = root.join(descriptor.filename());
        if !fs.is_file(&path) {
            continue;
        }

        let package_manager = match descriptor {
            DependencyDescriptor::ProjectManifest => {
                let content = fs.read_to_string(&path).map_err(|e| PlanError::ReadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                PackageManager::classify_manifest(&content)
            }
            DependencyDescriptor::Requirements | DependencyDescriptor::LegacySetup => {
                PackageManager::Pip
            }
        };

        debug!(
            descriptor = %descriptor,
            package_manager = %package_manager,
            "Detected dependency descriptor"
        );

        return Ok(DescriptorDetection {
            artifact: Some(DependencyArtifact {
                descriptor,
                file: PathBuf::from(descriptor.filename()),
            }),
            package_manager,
        });
    }

    debug!("No dependency descriptor found in {}", root.display());
    Ok(DescriptorDetection {
        artifact: None,
        package_manager: PackageManager::Pip,
    })
}
