//! `cornerstone` - Content and analytics backend for a leadership-consulting website
//!
//! This library stores page content, training programs, calendar events,
//! gallery photos and site settings as JSON documents in `SQLite`, serves
//! them over an HTTP API with a passcode-gated admin surface, and rolls
//! daily page-view counters up into weekly, monthly or yearly reports.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analytics;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gallery;
pub mod logging;
pub mod model;
pub mod server;
pub mod storage;
pub mod uploads;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
