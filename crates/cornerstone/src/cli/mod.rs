//! Argument parsing for the `cornerstone` binary.
//!
//! Subcommands other than `serve` open the database directly, so they work
//! with the server stopped.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    ConfigCommand, ContentCommand, GalleryCommand, PasscodeCommand, ServeCommand, StatsCommand,
    StatusCommand,
};

/// cornerstone - Content and analytics backend for a consulting site
///
/// Serves page content, programs, events and the photo gallery as JSON,
/// records page views, and exposes a passcode-gated admin API.
#[derive(Debug, Parser)]
#[command(name = "cornerstone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Read and write documents
    #[command(subcommand)]
    Content(ContentCommand),

    /// Manage the admin passcode
    #[command(subcommand)]
    Passcode(PasscodeCommand),

    /// Analytics rollups and charts
    #[command(subcommand)]
    Stats(StatsCommand),

    /// Photo gallery sync
    #[command(subcommand)]
    Gallery(GalleryCommand),

    /// Show database status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Logging verbosity requested by `--quiet` and `-v`.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
