//! Registry credential lookup from the Docker CLI config

use crate::{Result, ShipwrightError};
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

const USERNAME_ENV: &str = "SHIPWRIGHT_REGISTRY_USERNAME";
const PASSWORD_ENV: &str = "SHIPWRIGHT_REGISTRY_PASSWORD";

/// Relevant subset of ~/.docker/config.json
#[derive(Debug, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64-encoded "username:password"
    auth: Option<String>,
}

/// Reads login credentials from the Docker CLI config file, falling back
/// to the `SHIPWRIGHT_REGISTRY_USERNAME` / `SHIPWRIGHT_REGISTRY_PASSWORD`
/// environment variables.
#[derive(Debug)]
pub struct DockerConfigAuth {
    config_path: PathBuf,
}

impl Default for DockerConfigAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerConfigAuth {
    /// Use $DOCKER_CONFIG/config.json, or ~/.docker/config.json
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self { config_path }
    }

    /// Use a specific config.json path
    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Look up a username/password pair for a registry endpoint.
    ///
    /// Returns an error when no credentials can be found anywhere; the
    /// caller decides whether anonymous access is acceptable.
    pub fn lookup(&self, registry: &str) -> Result<(String, String)> {
        if self.config_path.exists() {
            if let Some(pair) = self.lookup_in_config(registry)? {
                debug!("found credentials for {} in docker config", registry);
                return Ok(pair);
            }
        } else {
            debug!("docker config not found at {:?}", self.config_path);
        }

        if let (Ok(username), Ok(password)) =
            (std::env::var(USERNAME_ENV), std::env::var(PASSWORD_ENV))
        {
            debug!("using credentials for {} from environment", registry);
            return Ok((username, password));
        }

        Err(ShipwrightError::Registry(format!(
            "no credentials found for registry '{}'; log in with the build tool or set {} and {}",
            registry, USERNAME_ENV, PASSWORD_ENV
        )))
    }

    fn lookup_in_config(&self, registry: &str) -> Result<Option<(String, String)>> {
        let content = std::fs::read_to_string(&self.config_path)?;
        let config: DockerConfig = serde_json::from_str(&content)?;

        let Some(entry) = config.auths.get(registry) else {
            return Ok(None);
        };
        let Some(auth_b64) = &entry.auth else {
            return Ok(None);
        };

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(auth_b64)
            .map_err(|e| {
                ShipwrightError::Registry(format!(
                    "invalid auth entry for '{}' in docker config: {}",
                    registry, e
                ))
            })?;
        let auth_str = String::from_utf8(decoded).map_err(|e| {
            ShipwrightError::Registry(format!(
                "invalid auth entry for '{}' in docker config: {}",
                registry, e
            ))
        })?;

        Ok(auth_str
            .split_once(':')
            .map(|(user, pass)| (user.to_string(), pass.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, registry: &str, user: &str, pass: &str) -> PathBuf {
        let auth = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            format!(r#"{{"auths": {{"{registry}": {{"auth": "{auth}"}}}}}}"#),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_lookup_from_docker_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "registry.example.com", "robot", "s3cret");

        let auth = DockerConfigAuth::with_config_path(path);
        let (user, pass) = auth.lookup("registry.example.com").unwrap();
        assert_eq!(user, "robot");
        assert_eq!(pass, "s3cret");
    }

    #[test]
    fn test_lookup_unknown_registry_fails() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "registry.example.com", "robot", "s3cret");

        let auth = DockerConfigAuth::with_config_path(path);
        let err = auth.lookup("other.example.com").unwrap_err();
        assert!(matches!(err, ShipwrightError::Registry(_)));
    }
}
