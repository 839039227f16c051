//! Shipwright - container image asset publisher
//!
//! This crate implements the image-publishing step of a deployment
//! pipeline: given a build context and a target registry, it ensures the
//! repository exists, builds and tags the image with an external build
//! tool, authenticates, pushes, and hands a stable image reference back
//! to the pipeline as a parameter value.

pub mod asset;
pub mod cli;
pub mod command;
pub mod registry;

use thiserror::Error;

/// Main error type for Shipwright operations
#[derive(Error, Debug)]
pub enum ShipwrightError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Environment(String),

    #[error("Image reports no digest for repository '{repository_uri}'; digests found: {digests:?}")]
    Integrity {
        repository_uri: String,
        digests: Vec<String>,
    },

    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Command '{command}' exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Invalid asset manifest: {0}")]
    Manifest(String),
}

pub type Result<T> = std::result::Result<T, ShipwrightError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "shipwright";
