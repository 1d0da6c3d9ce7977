//! Editable site content: pages, programs, events and gallery photos.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, validate_id, Collection, Record};
use crate::error::{Error, Result};

/// A call-to-action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    /// Button text.
    pub label: String,
    /// Link target.
    pub href: String,
}

/// A titled block of copy on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSection {
    /// Section heading.
    pub heading: String,
    /// Section copy.
    #[serde(default)]
    pub body: String,
}

/// Editable text and media references for one public route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    /// Route name, e.g. `home` or `about`.
    #[serde(default)]
    pub id: String,
    /// Main headline.
    #[serde(default)]
    pub headline: String,
    /// Line shown under the headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    /// Body paragraphs, in order.
    #[serde(default)]
    pub body: Vec<String>,
    /// Additional titled sections.
    #[serde(default)]
    pub sections: Vec<PageSection>,
    /// Primary call to action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<CallToAction>,
    /// Hero image URL or upload path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
}

impl Record for PageContent {
    const COLLECTION: Collection = Collection::Pages;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require("headline", &self.headline)?;
        if let Some(cta) = &self.cta {
            require("cta.label", &cta.label)?;
            require("cta.href", &cta.href)?;
        }
        for section in &self.sections {
            require("section heading", &section.heading)?;
        }
        Ok(())
    }
}

/// A training program offered by the business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProgram {
    /// Program slug.
    #[serde(default)]
    pub id: String,
    /// Program name.
    #[serde(default)]
    pub title: String,
    /// One-line summary for listings.
    #[serde(default)]
    pub summary: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// Human-readable duration, e.g. "6 weeks".
    #[serde(default)]
    pub duration: String,
    /// Delivery format, e.g. "In person" or "Virtual".
    #[serde(default)]
    pub format: String,
    /// Price text; programs quoted on request leave this empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// What participants come away with.
    #[serde(default)]
    pub outcomes: Vec<String>,
    /// Position in listings, ascending.
    #[serde(default)]
    pub order: u32,
    /// Whether the program appears on the public site.
    #[serde(default)]
    pub published: bool,
}

impl Record for TrainingProgram {
    const COLLECTION: Collection = Collection::Programs;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require("title", &self.title)?;
        require("summary", &self.summary)
    }
}

/// Booking status of a calendar event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Registration open.
    #[default]
    Open,
    /// Few spots left.
    Limited,
    /// No spots left.
    Full,
    /// Event will not take place.
    Cancelled,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Limited => write!(f, "limited"),
            Self::Full => write!(f, "full"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A dated event on the public calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Event slug.
    #[serde(default)]
    pub id: String,
    /// Event name.
    #[serde(default)]
    pub title: String,
    /// Day the event takes place.
    pub date: NaiveDate,
    /// Start time as `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// End time as `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Venue or "Online".
    #[serde(default)]
    pub location: String,
    /// Event description.
    #[serde(default)]
    pub description: String,
    /// Booking status.
    #[serde(default)]
    pub status: EventStatus,
    /// Remaining places, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spots_left: Option<u32>,
    /// Program this event delivers, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// External registration link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_url: Option<String>,
}

impl CalendarEvent {
    /// Whether the event falls on or after `today`.
    #[must_use]
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today
    }

    /// Parsed start time, used for ordering.
    ///
    /// Accepts an unpadded hour, which older documents may hold.
    #[must_use]
    pub fn start(&self) -> Option<NaiveTime> {
        self.start_time
            .as_deref()
            .and_then(|v| NaiveTime::parse_from_str(v.trim(), "%H:%M").ok())
    }

    /// Parse a zero-padded `HH:MM`. `9:00` is rejected.
    fn parse_time(field: &str, value: Option<&str>) -> Result<Option<NaiveTime>> {
        value
            .map(|v| {
                NaiveTime::parse_from_str(v, "%H:%M")
                    .ok()
                    .filter(|t| t.format("%H:%M").to_string() == v)
                    .ok_or_else(|| Error::invalid(format!("{field} must be HH:MM, got {v:?}")))
            })
            .transpose()
    }
}

impl Record for CalendarEvent {
    const COLLECTION: Collection = Collection::Events;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require("title", &self.title)?;

        let start = Self::parse_time("startTime", self.start_time.as_deref())?;
        let end = Self::parse_time("endTime", self.end_time.as_deref())?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(Error::invalid("endTime is before startTime"));
            }
        }
        Ok(())
    }
}

/// A photo shown in the gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPhoto {
    /// Photo id.
    #[serde(default)]
    pub id: String,
    /// Full-size image URL.
    #[serde(default)]
    pub image_url: String,
    /// Thumbnail URL, when the host provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Caption text.
    #[serde(default)]
    pub caption: String,
    /// When the photo was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    /// Shared album this photo was synced from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_url: Option<String>,
    /// Position in the gallery, ascending.
    #[serde(default)]
    pub order: u32,
}

impl Record for GalleryPhoto {
    const COLLECTION: Collection = Collection::Photos;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn assign_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require("imageUrl", &self.image_url)
    }
}
