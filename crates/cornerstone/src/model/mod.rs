//! Document types stored by cornerstone.
//!
//! Every document belongs to a [`Collection`] and is keyed by an identifier
//! that is unique within it. Saves replace the whole document.

mod content;
mod settings;
mod stats;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use content::{
    CalendarEvent, CallToAction, EventStatus, GalleryPhoto, PageContent, PageSection,
    TrainingProgram,
};
pub use settings::{PublicSettings, SiteSettings, SETTINGS_ID};
pub use stats::{date_key, normalize_path, DailyStats, Visit, OTHER_PATHS};

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("identifier pattern is valid")
});

/// A named group of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Per-route page content.
    Pages,
    /// Training program offerings.
    Programs,
    /// Calendar events.
    Events,
    /// Gallery photos.
    Photos,
    /// Site settings (a single document).
    Settings,
    /// Daily analytics counters.
    Analytics,
}

impl Collection {
    /// All collections, in display order.
    pub const ALL: [Collection; 6] = [
        Self::Pages,
        Self::Programs,
        Self::Events,
        Self::Photos,
        Self::Settings,
        Self::Analytics,
    ];

    /// The name used in the database and in URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Programs => "programs",
            Self::Events => "events",
            Self::Photos => "photos",
            Self::Settings => "settings",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::invalid(format!("unknown collection: {s}")))
    }
}

/// A typed document that can be saved to and loaded from storage.
pub trait Record: Serialize + DeserializeOwned {
    /// The collection this record type lives in.
    const COLLECTION: Collection;

    /// The document identifier.
    fn id(&self) -> String;

    /// Set the identifier when the record was submitted without one.
    ///
    /// Records with a fixed or derived identifier ignore this.
    fn assign_id(&mut self, _id: &str) {}

    /// Bind the record to the identifier it is being saved under.
    ///
    /// A record without an id takes `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the record names a different id.
    fn bind_id(&mut self, id: &str) -> Result<()> {
        let own = self.id();
        if own.is_empty() {
            self.assign_id(id);
            Ok(())
        } else if own == id {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "body id {own:?} does not match path id {id:?}"
            )))
        }
    }

    /// Check required fields. Invalid records are never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] describing the first problem found.
    fn validate(&self) -> Result<()> {
        validate_id(&self.id())
    }
}

/// Check that a document identifier is well-formed.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] if the identifier is empty, too long,
/// or contains characters other than ASCII letters, digits, `_`, `.` and `-`.
pub fn validate_id(id: &str) -> Result<()> {
    if ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(Error::invalid(format!("invalid document id: {id:?}")))
    }
}

/// Fail with a field-specific message when a required text field is blank.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::invalid(format!("{field} is required")))
    } else {
        Ok(())
    }
}
