//! Asset descriptor and publish result types

use crate::{Result, ShipwrightError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Tag applied when an asset carries no explicit `image_tag`.
///
/// Older pipeline consumers always pushed under this tag; keep it fixed.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Immutable description of a container image asset to publish
#[derive(Debug, Clone)]
pub struct AssetDescriptor {
    /// Identifier of the asset within its owning deployment unit
    pub id: String,
    /// Build context directory, absolute or relative to the assembly root
    pub build_context_path: PathBuf,
    /// Build-time variables, passed to the build tool in this order
    pub build_args: Vec<(String, String)>,
    /// Multi-stage build target
    pub target_stage: Option<String>,
    /// Override path to the build file
    pub dockerfile_path: Option<String>,
    /// Explicit target repository name
    pub repository_name: Option<String>,
    /// Explicit tag; together with `repository_name` marks the asset immutable
    pub image_tag: Option<String>,
    /// Legacy output-parameter key
    pub image_name_parameter_key: Option<String>,
    /// Content hash of the asset source
    pub source_hash: String,
}

/// How the published image is addressed by the consuming pipeline.
///
/// Resolved once at validation time; the two variants are mutually
/// exclusive for the rest of a publish operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// The pipeline substitutes a parameter with a digest-qualified reference
    Legacy { parameter_key: String },
    /// The pipeline already knows the fixed repository and tag
    Direct { repository_name: String, tag: String },
}

impl AssetDescriptor {
    /// Resolve the addressing mode for this asset.
    ///
    /// The legacy parameter key takes precedence when both modes are
    /// present; neither being satisfiable is a configuration error.
    pub fn addressing(&self) -> Result<Addressing> {
        if let Some(key) = &self.image_name_parameter_key {
            return Ok(Addressing::Legacy {
                parameter_key: key.clone(),
            });
        }

        match (&self.repository_name, &self.image_tag) {
            (Some(name), Some(tag)) => Ok(Addressing::Direct {
                repository_name: name.clone(),
                tag: tag.clone(),
            }),
            _ => Err(ShipwrightError::Configuration(format!(
                "asset '{}' must specify either imageNameParameterKey or both repositoryName and imageTag",
                self.id
            ))),
        }
    }

    /// Tag used for build, login, and push
    pub fn effective_tag(&self) -> &str {
        self.image_tag.as_deref().unwrap_or(DEFAULT_IMAGE_TAG)
    }

    /// Resolve the build context against the assembly directory.
    ///
    /// Absolute paths pass through unchanged so assemblies built on one
    /// machine can be deployed from another working directory.
    pub fn resolve_context_path(&self, assembly_dir: &Path) -> PathBuf {
        if self.build_context_path.is_absolute() {
            self.build_context_path.clone()
        } else {
            assembly_dir.join(&self.build_context_path)
        }
    }

    /// Deterministic repository name for assets without an explicit one.
    ///
    /// Stable across runs for the same asset id.
    pub fn derived_repository_name(&self) -> String {
        let slug: String = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug.trim_matches('-');

        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        let digest = hex::encode(hasher.finalize());

        if slug.is_empty() {
            format!("assets/{}", &digest[..12])
        } else {
            format!("assets/{}-{}", slug, &digest[..8])
        }
    }
}

/// A single output-parameter update for the deployment unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterUpdate {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub use_previous_value: bool,
}

/// Outcome of a publish operation: zero, one, or two parameter updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub parameters: Vec<ParameterUpdate>,
}

impl PublishResult {
    /// No parameter substitution required (direct addressing, or nothing to do)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep the previously deployed parameter value
    pub fn use_previous(parameter_key: &str) -> Self {
        Self {
            parameters: vec![ParameterUpdate {
                key: parameter_key.to_string(),
                value: None,
                use_previous_value: true,
            }],
        }
    }

    /// A freshly resolved digest-qualified image reference
    pub fn resolved(parameter_key: &str, value: String) -> Self {
        Self {
            parameters: vec![ParameterUpdate {
                key: parameter_key.to_string(),
                value: Some(value),
                use_previous_value: false,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
