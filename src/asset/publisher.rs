//! Orchestration of a single asset publish

use crate::asset::{Addressing, AssetDescriptor, PublishResult};
use crate::command::CommandRunner;
use crate::registry::RegistryRepository;
use crate::{Result, ShipwrightError};
use std::path::Path;
use tracing::{debug, info};

/// Publishes container image assets: resolves the target repository,
/// builds and tags the image, authenticates, pushes, and derives the
/// output parameters for the deployment unit.
///
/// One `publish` call is a single sequence of steps with no internal
/// parallelism and no state carried across calls. Failures are not
/// retried and leave any already-pushed image in the registry.
pub struct AssetPublisher<'a> {
    registry: &'a dyn RegistryRepository,
    runner: &'a dyn CommandRunner,
    build_tool: String,
}

impl<'a> AssetPublisher<'a> {
    pub fn new(registry: &'a dyn RegistryRepository, runner: &'a dyn CommandRunner) -> Self {
        Self {
            registry,
            runner,
            build_tool: "docker".to_string(),
        }
    }

    /// Use a docker-compatible build tool other than `docker`
    pub fn with_build_tool(mut self, build_tool: impl Into<String>) -> Self {
        self.build_tool = build_tool.into();
        self
    }

    /// Publish one asset.
    ///
    /// With `reuse` set the call returns immediately without contacting
    /// the registry or the build tool; redeploying unchanged
    /// infrastructure must never trigger a rebuild.
    pub async fn publish(
        &self,
        assembly_dir: &Path,
        asset: &AssetDescriptor,
        reuse: bool,
    ) -> Result<PublishResult> {
        let addressing = asset.addressing()?;

        if reuse {
            debug!("reusing previously published asset {}", asset.id);
            return Ok(match &addressing {
                Addressing::Legacy { parameter_key } => PublishResult::use_previous(parameter_key),
                Addressing::Direct { .. } => PublishResult::empty(),
            });
        }

        let context_path = asset.resolve_context_path(assembly_dir);
        let handle = self.registry.resolve(asset).await?;

        // Explicit repository+tag marks the asset immutable: skip the
        // whole build if that exact tag is already in the registry.
        if let Addressing::Direct {
            repository_name,
            tag,
        } = &addressing
        {
            if self.registry.image_exists(repository_name, tag).await? {
                info!(
                    "image {}:{} already exists, skipping build and push",
                    repository_name, tag
                );
                return Ok(PublishResult::empty());
            }
        }

        let image_ref = format!("{}:{}", handle.repository_uri, asset.effective_tag());

        info!("building image {}", image_ref);
        self.build(asset, &image_ref, &context_path).await?;

        info!("logging in to {}", handle.repository_uri);
        self.login().await?;

        info!("pushing image {}", image_ref);
        self.runner
            .run(&self.build_tool, &["push".to_string(), image_ref.clone()])
            .await?;

        match addressing {
            Addressing::Legacy { parameter_key } => {
                let value = self.resolve_digest(&image_ref, &handle.repository_uri, &handle.repository_name).await?;
                info!("published {} as {}", asset.id, value);
                Ok(PublishResult::resolved(&parameter_key, value))
            }
            // The pipeline already knows the fixed repository+tag address
            Addressing::Direct { .. } => Ok(PublishResult::empty()),
        }
    }

    async fn build(
        &self,
        asset: &AssetDescriptor,
        image_ref: &str,
        context_path: &Path,
    ) -> Result<()> {
        let mut args = vec!["build".to_string()];
        for (key, value) in &asset.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push("--tag".to_string());
        args.push(image_ref.to_string());
        args.push(context_path.to_string_lossy().into_owned());
        if let Some(stage) = &asset.target_stage {
            args.push("--target".to_string());
            args.push(stage.clone());
        }
        if let Some(file) = &asset.dockerfile_path {
            args.push("--file".to_string());
            args.push(file.clone());
        }

        match self.runner.run(&self.build_tool, &args).await {
            Err(ShipwrightError::ExecutableNotFound(_)) => {
                Err(ShipwrightError::Environment(format!(
                    "'{}' was not found on this host; install it and make sure it is on PATH",
                    self.build_tool
                )))
            }
            other => other.map(|_| ()),
        }
    }

    async fn login(&self) -> Result<()> {
        let creds = self.registry.credentials().await?;
        self.runner
            .run(
                &self.build_tool,
                &[
                    "login".to_string(),
                    "--username".to_string(),
                    creds.username,
                    "--password".to_string(),
                    creds.password,
                    creds.endpoint,
                ],
            )
            .await?;
        Ok(())
    }

    /// Resolve the digest-qualified reference for the legacy parameter.
    ///
    /// An image may carry digests for several repositories; only the one
    /// under this publish's target repository is valid. The repository
    /// URI is rewritten to the short name for presentation.
    async fn resolve_digest(
        &self,
        image_ref: &str,
        repository_uri: &str,
        repository_name: &str,
    ) -> Result<String> {
        let output = self
            .runner
            .run(
                &self.build_tool,
                &[
                    "inspect".to_string(),
                    "--format".to_string(),
                    "{{range .RepoDigests}}{{.}}|{{end}}".to_string(),
                    image_ref.to_string(),
                ],
            )
            .await?;

        let digests: Vec<String> = output
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let prefix = format!("{repository_uri}@sha256:");
        let matched = digests
            .iter()
            .find(|d| d.starts_with(&prefix))
            .ok_or_else(|| ShipwrightError::Integrity {
                repository_uri: repository_uri.to_string(),
                digests: digests.clone(),
            })?;

        Ok(matched.replacen(repository_uri, repository_name, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{ParameterUpdate, DEFAULT_IMAGE_TAG};
    use crate::registry::{RegistryCredentials, RepositoryHandle};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeRegistry {
        endpoint: String,
        image_exists: bool,
        calls: AtomicUsize,
        exists_queries: Mutex<Vec<(String, String)>>,
    }

    impl FakeRegistry {
        fn new(image_exists: bool) -> Self {
            Self {
                endpoint: "registry.example.com".to_string(),
                image_exists,
                calls: AtomicUsize::new(0),
                exists_queries: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryRepository for FakeRegistry {
        async fn resolve(&self, asset: &AssetDescriptor) -> Result<RepositoryHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.exists_queries
                .lock()
                .unwrap()
                .push((repository_name.to_string(), tag.to_string()));
            Ok(self.image_exists)
        }

        async fn credentials(&self) -> Result<RegistryCredentials> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RegistryCredentials {
                username: "robot".to_string(),
                password: "s3cret".to_string(),
                endpoint: self.endpoint.clone(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<Vec<String>>>,
        inspect_output: String,
        build_tool_missing: bool,
    }

    impl RecordingRunner {
        fn with_inspect_output(output: &str) -> Self {
            Self {
                inspect_output: output.to_string(),
                ..Self::default()
            }
        }

        fn recorded(&self) -> Vec<Vec<String>> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<String> {
            if self.build_tool_missing {
                return Err(ShipwrightError::ExecutableNotFound(program.to_string()));
            }

            let mut recorded = vec![program.to_string()];
            recorded.extend(args.iter().cloned());
            self.commands.lock().unwrap().push(recorded);

            match args.first().map(String::as_str) {
                Some("inspect") => Ok(self.inspect_output.clone()),
                _ => Ok(String::new()),
            }
        }
    }

    fn legacy_asset() -> AssetDescriptor {
        AssetDescriptor {
            id: "WebContainer".to_string(),
            build_context_path: PathBuf::from("web"),
            build_args: Vec::new(),
            target_stage: None,
            dockerfile_path: None,
            repository_name: None,
            image_tag: None,
            image_name_parameter_key: Some("WebImageName".to_string()),
            source_hash: "0123abcd".to_string(),
        }
    }

    fn direct_asset() -> AssetDescriptor {
        AssetDescriptor {
            id: "Worker".to_string(),
            build_context_path: PathBuf::from("worker"),
            build_args: Vec::new(),
            target_stage: None,
            dockerfile_path: None,
            repository_name: Some("apps/worker".to_string()),
            image_tag: Some("0123abcd".to_string()),
            image_name_parameter_key: None,
            source_hash: "0123abcd".to_string(),
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reuse_legacy_returns_previous_value_without_side_effects() {
        let registry = FakeRegistry::new(false);
        let runner = RecordingRunner::default();
        let publisher = AssetPublisher::new(&registry, &runner);

        let result = publisher
            .publish(Path::new("/assembly"), &legacy_asset(), true)
            .await
            .unwrap();

        assert_eq!(
            result.parameters,
            vec![ParameterUpdate {
                key: "WebImageName".to_string(),
                value: None,
                use_previous_value: true,
            }]
        );
        assert_eq!(registry.call_count(), 0);
        assert!(runner.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_reuse_direct_returns_empty_without_side_effects() {
        let registry = FakeRegistry::new(false);
        let runner = RecordingRunner::default();
        let publisher = AssetPublisher::new(&registry, &runner);

        let result = publisher
            .publish(Path::new("/assembly"), &direct_asset(), true)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(registry.call_count(), 0);
        assert!(runner.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_immutable_asset_skips_build_when_tag_exists() {
        let registry = FakeRegistry::new(true);
        let runner = RecordingRunner::default();
        let publisher = AssetPublisher::new(&registry, &runner);

        let result = publisher
            .publish(Path::new("/assembly"), &direct_asset(), false)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(runner.recorded().is_empty());
        assert_eq!(
            registry.exists_queries.lock().unwrap()[0],
            ("apps/worker".to_string(), "0123abcd".to_string())
        );
    }

    #[tokio::test]
    async fn test_legacy_publish_runs_full_flow() {
        let registry = FakeRegistry::new(false);
        let asset = legacy_asset();
        let repo_name = asset.derived_repository_name();
        let repo_uri = format!("registry.example.com/{repo_name}");
        let runner = RecordingRunner::with_inspect_output(&format!(
            "otherrepo@sha256:aaa|{repo_uri}@sha256:bbb|"
        ));
        let publisher = AssetPublisher::new(&registry, &runner);

        let result = publisher
            .publish(Path::new("/assembly"), &asset, false)
            .await
            .unwrap();

        assert_eq!(
            result.parameters,
            vec![ParameterUpdate {
                key: "WebImageName".to_string(),
                value: Some(format!("{repo_name}@sha256:bbb")),
                use_previous_value: false,
            }]
        );

        let commands = runner.recorded();
        assert_eq!(commands.len(), 4);
        assert_eq!(
            commands[0],
            strings(&[
                "docker",
                "build",
                "--tag",
                &format!("{repo_uri}:{DEFAULT_IMAGE_TAG}"),
                "/assembly/web",
            ])
        );
        assert_eq!(
            commands[1],
            strings(&[
                "docker",
                "login",
                "--username",
                "robot",
                "--password",
                "s3cret",
                "registry.example.com",
            ])
        );
        assert_eq!(
            commands[2],
            strings(&["docker", "push", &format!("{repo_uri}:{DEFAULT_IMAGE_TAG}")])
        );
        assert_eq!(commands[3][0..2], strings(&["docker", "inspect"])[0..2]);
    }

    #[tokio::test]
    async fn test_build_command_shape_with_all_options() {
        let registry = FakeRegistry::new(false);
        let mut asset = legacy_asset();
        asset.build_args = vec![
            ("HTTP_PROXY".to_string(), "http://proxy:3128".to_string()),
            ("RELEASE".to_string(), "1".to_string()),
        ];
        asset.target_stage = Some("release".to_string());
        asset.dockerfile_path = Some("docker/Dockerfile.web".to_string());
        asset.build_context_path = PathBuf::from("/abs/web");

        let repo_uri = format!("registry.example.com/{}", asset.derived_repository_name());
        let runner =
            RecordingRunner::with_inspect_output(&format!("{repo_uri}@sha256:bbb|"));
        let publisher = AssetPublisher::new(&registry, &runner);

        publisher
            .publish(Path::new("/assembly"), &asset, false)
            .await
            .unwrap();

        // Build args in insertion order; --target and --file after the
        // tag and context path, in that relative order.
        assert_eq!(
            runner.recorded()[0],
            strings(&[
                "docker",
                "build",
                "--build-arg",
                "HTTP_PROXY=http://proxy:3128",
                "--build-arg",
                "RELEASE=1",
                "--tag",
                &format!("{repo_uri}:latest"),
                "/abs/web",
                "--target",
                "release",
                "--file",
                "docker/Dockerfile.web",
            ])
        );
    }

    #[tokio::test]
    async fn test_direct_publish_returns_empty_result() {
        let registry = FakeRegistry::new(false);
        let runner = RecordingRunner::default();
        let publisher = AssetPublisher::new(&registry, &runner);

        let result = publisher
            .publish(Path::new("/assembly"), &direct_asset(), false)
            .await
            .unwrap();

        assert!(result.is_empty());

        // Build, login, push; no digest inspection in direct mode.
        let commands = runner.recorded();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0][1], "build");
        assert_eq!(
            commands[2],
            strings(&[
                "docker",
                "push",
                "registry.example.com/apps/worker:0123abcd",
            ])
        );
    }

    #[tokio::test]
    async fn test_no_matching_digest_is_an_integrity_error() {
        let registry = FakeRegistry::new(false);
        let runner =
            RecordingRunner::with_inspect_output("otherrepo@sha256:aaa|another@sha256:ccc|");
        let publisher = AssetPublisher::new(&registry, &runner);

        let err = publisher
            .publish(Path::new("/assembly"), &legacy_asset(), false)
            .await
            .unwrap_err();

        match err {
            ShipwrightError::Integrity { digests, .. } => {
                assert_eq!(digests.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsatisfiable_addressing_fails_before_side_effects() {
        let registry = FakeRegistry::new(false);
        let runner = RecordingRunner::default();
        let publisher = AssetPublisher::new(&registry, &runner);

        let mut asset = legacy_asset();
        asset.image_name_parameter_key = None;

        let err = publisher
            .publish(Path::new("/assembly"), &asset, false)
            .await
            .unwrap_err();

        assert!(matches!(err, ShipwrightError::Configuration(_)));
        assert_eq!(registry.call_count(), 0);
        assert!(runner.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_missing_build_tool_is_an_environment_error() {
        let registry = FakeRegistry::new(false);
        let runner = RecordingRunner {
            build_tool_missing: true,
            ..RecordingRunner::default()
        };
        let publisher = AssetPublisher::new(&registry, &runner).with_build_tool("podman");

        let err = publisher
            .publish(Path::new("/assembly"), &legacy_asset(), false)
            .await
            .unwrap_err();

        match err {
            ShipwrightError::Environment(message) => assert!(message.contains("podman")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
