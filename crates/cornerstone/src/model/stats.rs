//! Daily analytics counters.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Collection, Record};
use crate::error::Result;

/// Longest page path kept in the per-path counters.
const MAX_PATH_LEN: usize = 256;

/// Counter key for views of paths first seen after the day's path limit
/// was reached.
pub const OTHER_PATHS: &str = "(other)";

/// View counters for one day.
///
/// Missing counters deserialize as zero so partially written records still
/// roll up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// The day these counters cover.
    pub date: NaiveDate,
    /// Page views.
    #[serde(default)]
    pub views: u64,
    /// New visitors.
    #[serde(default)]
    pub visitors: u64,
    /// New sessions.
    #[serde(default)]
    pub sessions: u64,
    /// Views per page path.
    #[serde(default)]
    pub page_views: BTreeMap<String, u64>,
}

impl DailyStats {
    /// Empty counters for `date`.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            views: 0,
            visitors: 0,
            sessions: 0,
            page_views: BTreeMap::new(),
        }
    }

    /// Count one page view.
    ///
    /// At most `max_paths` distinct paths get their own counter. Paths that
    /// are new once that many are tracked are counted under [`OTHER_PATHS`].
    pub fn apply(&mut self, visit: &Visit, max_paths: usize) {
        self.views = self.views.saturating_add(1);
        if visit.new_visitor {
            self.visitors = self.visitors.saturating_add(1);
        }
        if visit.new_session {
            self.sessions = self.sessions.saturating_add(1);
        }
        let mut path = normalize_path(&visit.path);
        if !self.page_views.contains_key(&path) && self.distinct_paths() >= max_paths {
            path = OTHER_PATHS.to_string();
        }
        let count = self.page_views.entry(path).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Paths with their own counter.
    fn distinct_paths(&self) -> usize {
        self.page_views.len() - usize::from(self.page_views.contains_key(OTHER_PATHS))
    }
}

impl Record for DailyStats {
    const COLLECTION: Collection = Collection::Analytics;

    fn id(&self) -> String {
        date_key(self.date)
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A single page view reported by the public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    /// Path of the page viewed.
    pub path: String,
    /// First view from this visitor.
    #[serde(default)]
    pub new_visitor: bool,
    /// First view in this browsing session.
    #[serde(default)]
    pub new_session: bool,
}

impl Visit {
    /// A view that is neither a new visitor nor a new session.
    #[must_use]
    pub fn page(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            new_visitor: false,
            new_session: false,
        }
    }
}

/// Document id of the counters for `date`.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Reduce a reported path to the form used as a counter key.
///
/// Query strings and fragments are dropped, a leading `/` is ensured and a
/// trailing `/` removed (except for the root).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_matches('/');

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    normalized.push('/');
    normalized.push_str(trimmed);

    if normalized.len() > MAX_PATH_LEN {
        let mut end = MAX_PATH_LEN;
        while !normalized.is_char_boundary(end) {
            end -= 1;
        }
        normalized.truncate(end);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_id_is_iso_date() {
        assert_eq!(DailyStats::new(day()).id(), "2026-10-15");
    }

    #[test]
    fn test_apply_counts() {
        let mut stats = DailyStats::new(day());
        stats.apply(
            &Visit {
                path: "/programs".to_string(),
                new_visitor: true,
                new_session: true,
            },
            10,
        );
        stats.apply(&Visit::page("/programs/"), 10);
        stats.apply(&Visit::page("/"), 10);

        assert_eq!(stats.views, 3);
        assert_eq!(stats.visitors, 1);
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.page_views.get("/programs"), Some(&2));
        assert_eq!(stats.page_views.get("/"), Some(&1));
    }

    #[test]
    fn test_apply_caps_distinct_paths() {
        let mut stats = DailyStats::new(day());
        for i in 0..50 {
            stats.apply(&Visit::page(format!("/junk-{i}")), 3);
        }
        stats.apply(&Visit::page("/junk-1"), 3);

        assert_eq!(stats.views, 51);
        assert_eq!(stats.page_views.len(), 4);
        assert_eq!(stats.page_views.get("/junk-1"), Some(&2));
        assert_eq!(stats.page_views.get(OTHER_PATHS), Some(&47));
        assert_eq!(stats.page_views.values().sum::<u64>(), stats.views);
    }

    #[test]
    fn test_apply_cap_ignores_overflow_key() {
        let mut stats = DailyStats::new(day());
        stats.page_views.insert(OTHER_PATHS.to_string(), 5);
        stats.page_views.insert("/".to_string(), 1);

        stats.apply(&Visit::page("/about"), 2);
        stats.apply(&Visit::page("/contact"), 2);

        assert_eq!(stats.page_views.get("/about"), Some(&1));
        assert_eq!(stats.page_views.get("/contact"), None);
        assert_eq!(stats.page_views.get(OTHER_PATHS), Some(&6));
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let stats: DailyStats = serde_json::from_str(r#"{"date":"2026-10-15"}"#).unwrap();
        assert_eq!(stats, DailyStats::new(day()));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("about"), "/about");
        assert_eq!(normalize_path("/about/"), "/about");
        assert_eq!(normalize_path("/events?month=4#top"), "/events");
        assert_eq!(normalize_path("  /contact  "), "/contact");
    }

    #[test]
    fn test_normalize_path_truncates() {
        let long = format!("/{}", "é".repeat(400));
        let normalized = normalize_path(&long);
        assert!(normalized.len() <= MAX_PATH_LEN);
        assert!(normalized.starts_with("/é"));
    }
}
