//! Arguments for each `cornerstone` subcommand.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::analytics::Period;
use crate::model::Collection;

/// Server command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Document commands.
#[derive(Debug, Subcommand)]
pub enum ContentCommand {
    /// List the documents in a collection
    List {
        /// Collection name (pages, programs, events, photos, settings, analytics)
        collection: Collection,
    },

    /// Print one document as JSON
    Get {
        /// Collection name
        collection: Collection,
        /// Document id
        id: String,
    },

    /// Validate and save a document, replacing any existing one
    Put {
        /// Collection name
        collection: Collection,
        /// Document id
        id: String,
        /// JSON file to read (defaults to stdin)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Delete a document
    Delete {
        /// Collection name
        collection: Collection,
        /// Document id
        id: String,
    },
}

/// Admin passcode commands.
#[derive(Debug, Subcommand)]
pub enum PasscodeCommand {
    /// Set the admin passcode
    Set {
        /// New passcode (an empty string disables admin login)
        value: String,
    },

    /// Check a candidate against the stored passcode
    Check {
        /// Candidate passcode
        value: String,
    },
}

/// Analytics commands.
#[derive(Debug, Subcommand)]
pub enum StatsCommand {
    /// Print a rollup of the daily counters
    Rollup {
        /// daily, weekly, monthly or yearly
        #[arg(short, long)]
        period: Option<Period>,
        /// Keep only the most recent N buckets
        #[arg(short, long)]
        last: Option<usize>,
        /// Number of top pages to list
        #[arg(short, long)]
        top: Option<usize>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write the rollup as an SVG line chart
    Chart {
        /// daily, weekly, monthly or yearly
        #[arg(short, long)]
        period: Option<Period>,
        /// Keep only the most recent N buckets
        #[arg(short, long)]
        last: Option<usize>,
        /// File to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Count a page view by hand
    Record {
        /// Page path
        path: String,
        /// Day to count against (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Count as a new visitor
        #[arg(long)]
        new_visitor: bool,
        /// Count as a new session
        #[arg(long)]
        new_session: bool,
    },
}

/// Gallery commands.
#[derive(Debug, Subcommand)]
pub enum GalleryCommand {
    /// Mirror a shared album into the gallery
    Sync {
        /// Shared album URL
        album_url: String,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
