#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert source trait and implementations.
//!
//! The dashboard consumes alerts through [`AlertSource`], a
//! fetch-with-filter capability. Two implementations ship here: a
//! [`fixtures::FixtureSource`] backed by JSON records and a
//! [`supabase::SupabaseSource`] that queries the alert tables over
//! `PostgREST`.

pub mod fixtures;
pub mod retry;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reach_alert_models::RawAlert;
use serde::{Deserialize, Serialize};

/// Errors that can occur while fetching alerts.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (network, timeout, connection reset).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or fixture JSON could not be decoded.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading fixtures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The query layer rejected or failed the request.
    #[error("Query error: {message}")]
    Query {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Returns `true` for transport-level failures, as opposed to the
    /// query layer rejecting the request.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Date-range filter applied to an alert's `effective_from`.
///
/// Both bounds are inclusive calendar days (UTC). A missing bound leaves
/// that side open; with no bounds at all every alert matches, including
/// alerts without an `effective_from`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFilter {
    /// First day included.
    pub start_date: Option<NaiveDate>,
    /// Last day included.
    pub end_date: Option<NaiveDate>,
}

impl AlertFilter {
    /// Creates a filter, swapping the bounds if they are reversed.
    #[must_use]
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        match (start_date, end_date) {
            (Some(start), Some(end)) if start > end => Self {
                start_date: Some(end),
                end_date: Some(start),
            },
            _ => Self {
                start_date,
                end_date,
            },
        }
    }

    /// Returns `true` if neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// Returns `true` if an alert starting at `effective_from` passes.
    #[must_use]
    pub fn matches(&self, effective_from: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(day) = effective_from.map(|dt| dt.date_naive()) else {
            return false;
        };

        self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

/// Decodes alert rows one at a time.
///
/// Rows that do not decode as a [`RawAlert`] are logged and skipped; the
/// rest are returned in order.
#[must_use]
pub fn decode_rows(source: &str, rows: Vec<serde_json::Value>) -> Vec<RawAlert> {
    let total = rows.len();
    let alerts: Vec<RawAlert> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(alert) => Some(alert),
            Err(e) => {
                log::warn!("Skipping undecodable alert row {index} from {source}: {e}");
                None
            }
        })
        .collect();

    if alerts.len() < total {
        log::warn!(
            "Skipped {} of {total} alert rows from {source}",
            total - alerts.len()
        );
    }
    alerts
}

/// A capability that fetches raw alerts for a filter.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Returns a short human-readable name for logs.
    fn name(&self) -> &str;

    /// Fetches every alert whose `effective_from` passes `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch fails.
    async fn fetch_alerts(&self, filter: &AlertFilter) -> Result<Vec<RawAlert>, SourceError>;
}
