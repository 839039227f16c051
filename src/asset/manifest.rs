//! JSON asset manifest loading

use crate::asset::AssetDescriptor;
use crate::{Result, ShipwrightError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk asset entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAsset {
    id: String,
    build_context_path: PathBuf,
    /// "KEY=value" entries; order is preserved through to the build command
    #[serde(default)]
    build_args: Vec<String>,
    #[serde(default)]
    target_stage: Option<String>,
    #[serde(default)]
    dockerfile_path: Option<String>,
    #[serde(default)]
    repository_name: Option<String>,
    #[serde(default)]
    image_tag: Option<String>,
    #[serde(default)]
    image_name_parameter_key: Option<String>,
    source_hash: String,
}

/// A set of assets to publish, loaded from a JSON manifest file
#[derive(Debug)]
pub struct AssetManifest {
    pub assets: Vec<AssetDescriptor>,
}

impl AssetManifest {
    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a manifest from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawAsset> = serde_json::from_str(json)?;
        let assets = raw.into_iter().map(parse_asset).collect::<Result<_>>()?;
        Ok(Self { assets })
    }
}

fn parse_asset(raw: RawAsset) -> Result<AssetDescriptor> {
    let mut build_args = Vec::with_capacity(raw.build_args.len());
    for arg in &raw.build_args {
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                build_args.push((key.to_string(), value.to_string()));
            }
            _ => {
                return Err(ShipwrightError::Manifest(format!(
                    "asset '{}': build arg '{}' is not in KEY=value form",
                    raw.id, arg
                )));
            }
        }
    }

    Ok(AssetDescriptor {
        id: raw.id,
        build_context_path: raw.build_context_path,
        build_args,
        target_stage: raw.target_stage,
        dockerfile_path: raw.dockerfile_path,
        repository_name: raw.repository_name,
        image_tag: raw.image_tag,
        image_name_parameter_key: raw.image_name_parameter_key,
        source_hash: raw.source_hash,
    })
}
