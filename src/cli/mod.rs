//! CLI command definitions and handlers

pub mod publish;

use clap::{Parser, Subcommand};

/// Shipwright - container image asset publisher
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Publish the image assets listed in a manifest
    Publish(publish::PublishArgs),
}
