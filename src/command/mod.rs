//! External command execution

use crate::{Result, ShipwrightError};
use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::debug;

/// Runs an external command given as an ordered argument vector.
///
/// Implementations return the trimmed standard output on success, fail
/// with exit information on non-zero exit, and report a missing
/// executable as `ShipwrightError::ExecutableNotFound`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Command runner backed by real host processes
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        // Log only the subcommand; argument payloads may carry credentials
        debug!(
            "running {} {}",
            program,
            args.first().map(String::as_str).unwrap_or("")
        );

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ShipwrightError::ExecutableNotFound(program.to_string())
                } else {
                    ShipwrightError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ShipwrightError::CommandFailed {
                command: format!(
                    "{} {}",
                    program,
                    args.first().map(String::as_str).unwrap_or("")
                ),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
