//! Container registry collaborator interface

pub mod auth;
pub mod configured;

pub use auth::DockerConfigAuth;
pub use configured::ConfiguredRegistry;

use crate::asset::AssetDescriptor;
use crate::Result;
use async_trait::async_trait;
use std::fmt;

/// Target repository for one publish operation.
///
/// Resolved once per publish and never cached by the publisher.
#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    /// Fully qualified URI images are tagged and pushed under
    pub repository_uri: String,
    /// Short repository name within the registry
    pub repository_name: String,
}

/// Short-lived login credentials for the registry endpoint
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub endpoint: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Registry-side repository operations consumed by the publisher.
///
/// `resolve` may create the repository and apply lifecycle or scanning
/// policy as side effects; that is the collaborator's business.
#[async_trait]
pub trait RegistryRepository: Send + Sync {
    async fn resolve(&self, asset: &AssetDescriptor) -> Result<RepositoryHandle>;

    async fn image_exists(&self, repository_name: &str, tag: &str) -> Result<bool>;

    async fn credentials(&self) -> Result<RegistryCredentials>;
}
