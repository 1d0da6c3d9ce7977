//! Analytics rollups over daily counters.
//!
//! Daily records are grouped by a calendar [`Period`], summed per group and
//! returned oldest first. Labels are zero-padded so lexical order is
//! chronological order.

mod chart;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{date_key, DailyStats};

pub use chart::{render_chart, Chart, ChartOptions};

/// Grouping granularity for a rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// One bucket per day, `YYYY-MM-DD`.
    Daily,
    /// One bucket per ISO week, `YYYY-Www` using the ISO week-year.
    #[default]
    Weekly,
    /// One bucket per month, `YYYY-MM`.
    Monthly,
    /// One bucket per year, `YYYY`.
    Yearly,
}

impl Period {
    /// The bucket label `date` falls into.
    #[must_use]
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Daily => date_key(date),
            Self::Weekly => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
            Self::Yearly => format!("{:04}", date.year()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(Error::invalid(format!("unknown period: {other}"))),
        }
    }
}

/// Summed counters for one period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Period label.
    pub label: String,
    /// Page views.
    pub views: u64,
    /// New visitors.
    pub visitors: u64,
    /// New sessions.
    pub sessions: u64,
    /// Views per page path.
    pub page_views: BTreeMap<String, u64>,
    /// Number of daily records that contributed.
    pub days: u32,
}

impl Bucket {
    fn absorb(&mut self, day: &DailyStats) {
        self.views = self.views.saturating_add(day.views);
        self.visitors = self.visitors.saturating_add(day.visitors);
        self.sessions = self.sessions.saturating_add(day.sessions);
        for (path, count) in &day.page_views {
            let total = self.page_views.entry(path.clone()).or_insert(0);
            *total = total.saturating_add(*count);
        }
        self.days = self.days.saturating_add(1);
    }
}

/// Group daily records by `period`, oldest bucket first.
///
/// With `last`, only the most recent `last` buckets are kept.
#[must_use]
pub fn rollup(records: &[DailyStats], period: Period, last: Option<usize>) -> Vec<Bucket> {
    let mut groups: BTreeMap<String, Bucket> = BTreeMap::new();
    for day in records {
        let label = period.label(day.date);
        groups
            .entry(label.clone())
            .or_insert_with(|| Bucket {
                label,
                ..Bucket::default()
            })
            .absorb(day);
    }

    let mut buckets: Vec<Bucket> = groups.into_values().collect();
    if let Some(n) = last {
        let skip = buckets.len().saturating_sub(n);
        buckets.drain(..skip);
    }
    buckets
}

/// Views for one page path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCount {
    /// Page path.
    pub path: String,
    /// Views across the summarized buckets.
    pub views: u64,
}

/// Totals across a rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Total page views.
    pub views: u64,
    /// Total new visitors.
    pub visitors: u64,
    /// Total new sessions.
    pub sessions: u64,
    /// Most viewed pages, most views first.
    pub top_pages: Vec<PageCount>,
}

/// Total the buckets and rank pages by views.
///
/// Pages with equal views are ordered by path.
#[must_use]
pub fn summarize(buckets: &[Bucket], top_n: usize) -> Summary {
    let mut summary = Summary::default();
    let mut pages: BTreeMap<&str, u64> = BTreeMap::new();

    for bucket in buckets {
        summary.views = summary.views.saturating_add(bucket.views);
        summary.visitors = summary.visitors.saturating_add(bucket.visitors);
        summary.sessions = summary.sessions.saturating_add(bucket.sessions);
        for (path, count) in &bucket.page_views {
            let total = pages.entry(path).or_insert(0);
            *total = total.saturating_add(*count);
        }
    }

    let mut ranked: Vec<PageCount> = pages
        .into_iter()
        .map(|(path, views)| PageCount {
            path: path.to_string(),
            views,
        })
        .collect();
    // BTreeMap order is by path, and the sort is stable
    ranked.sort_by(|a, b| b.views.cmp(&a.views));
    ranked.truncate(top_n);

    summary.top_pages = ranked;
    summary
}

/// A rollup together with its summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Grouping used.
    pub period: Period,
    /// Buckets, oldest first.
    pub buckets: Vec<Bucket>,
    /// Totals over `buckets`.
    pub summary: Summary,
}

impl Report {
    /// Roll up `records` and summarize the kept buckets.
    #[must_use]
    pub fn build(
        records: &[DailyStats],
        period: Period,
        last: Option<usize>,
        top_n: usize,
    ) -> Self {
        let buckets = rollup(records, period, last);
        let summary = summarize(&buckets, top_n);
        Self {
            period,
            buckets,
            summary,
        }
    }
}
