//! Registry adapter driven by static configuration
//!
//! Talks to the registry only through the build tool: existence probes go
//! via `manifest inspect` and credentials come from the Docker CLI config.
//! Repository creation is assumed to be handled out of band (or the
//! registry auto-creates on push, as most hosted registries do).

use crate::asset::AssetDescriptor;
use crate::command::CommandRunner;
use crate::registry::{DockerConfigAuth, RegistryCredentials, RegistryRepository, RepositoryHandle};
use crate::{Result, ShipwrightError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Registry collaborator configured with a fixed endpoint
pub struct ConfiguredRegistry {
    endpoint: String,
    build_tool: String,
    runner: Arc<dyn CommandRunner>,
    auth: DockerConfigAuth,
}

impl ConfiguredRegistry {
    pub fn new(endpoint: String, build_tool: String, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            endpoint,
            build_tool,
            runner,
            auth: DockerConfigAuth::new(),
        }
    }

    /// Override the credential source
    pub fn with_auth(mut self, auth: DockerConfigAuth) -> Self {
        self.auth = auth;
        self
    }
}

#[async_trait]
impl RegistryRepository for ConfiguredRegistry {
    async fn resolve(&self, asset: &AssetDescriptor) -> Result<RepositoryHandle> {
        let repository_name = asset
            .repository_name
            .clone()
            .unwrap_or_else(|| asset.derived_repository_name());

        Ok(RepositoryHandle {
            repository_uri: format!("{}/{}", self.endpoint, repository_name),
            repository_name,
        })
    }

    async fn image_exists(&self, repository_name: &str, tag: &str) -> Result<bool> {
        let reference = format!("{}/{}:{}", self.endpoint, repository_name, tag);
        let args = vec![
            "manifest".to_string(),
            "inspect".to_string(),
            reference.clone(),
        ];

        match self.runner.run(&self.build_tool, &args).await {
            Ok(_) => Ok(true),
            Err(ShipwrightError::CommandFailed { .. }) => {
                debug!("no manifest found for {}", reference);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn credentials(&self) -> Result<RegistryCredentials> {
        let (username, password) = self.auth.lookup(&self.endpoint)?;
        Ok(RegistryCredentials {
            username,
            password,
            endpoint: self.endpoint.clone(),
        })
    }
}
