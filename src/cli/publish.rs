//! `shipwright publish` command implementation

use crate::asset::{AssetManifest, AssetPublisher};
use crate::command::{CommandRunner, ShellCommandRunner};
use crate::registry::ConfiguredRegistry;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `publish` command
#[derive(Args)]
pub struct PublishArgs {
    /// Path to the asset manifest (JSON)
    pub manifest: PathBuf,

    /// Registry endpoint to publish to (e.g. registry.example.com)
    #[arg(short, long)]
    pub registry: String,

    /// Directory relative build contexts are resolved against
    #[arg(long, default_value = ".")]
    pub assembly_dir: PathBuf,

    /// Docker-compatible build tool to invoke
    #[arg(long, default_value = "docker")]
    pub build_tool: String,

    /// Reuse previously published assets instead of rebuilding
    #[arg(long)]
    pub reuse: bool,
}

/// Execute the `publish` command
pub async fn execute(args: PublishArgs) -> anyhow::Result<()> {
    let manifest = AssetManifest::load(&args.manifest)?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellCommandRunner);
    let registry = ConfiguredRegistry::new(
        args.registry.clone(),
        args.build_tool.clone(),
        Arc::clone(&runner),
    );
    let publisher =
        AssetPublisher::new(&registry, runner.as_ref()).with_build_tool(&args.build_tool);

    let mut results = serde_json::Map::new();
    for asset in &manifest.assets {
        let result = publisher
            .publish(&args.assembly_dir, asset, args.reuse)
            .await?;
        results.insert(asset.id.clone(), serde_json::to_value(&result.parameters)?);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(results))?
    );

    Ok(())
}
