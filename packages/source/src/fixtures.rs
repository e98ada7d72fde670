//! Alert source backed by JSON fixture records.
//!
//! Used for local development, demos and tests. The records are held in
//! memory and filtered on every fetch exactly as the remote query layer
//! would filter them.

use std::path::Path;

use async_trait::async_trait;
use reach_alert_models::RawAlert;

use crate::{AlertFilter, AlertSource, SourceError, decode_rows};

/// Sample alerts embedded at compile time.
const SAMPLE_ALERTS: &str = include_str!("../fixtures/sample_alerts.json");

/// An in-memory [`AlertSource`].
#[derive(Debug, Clone)]
pub struct FixtureSource {
    name: String,
    alerts: Vec<RawAlert>,
}

impl FixtureSource {
    /// Creates a source serving `alerts`.
    #[must_use]
    pub fn new(name: impl Into<String>, alerts: Vec<RawAlert>) -> Self {
        Self {
            name: name.into(),
            alerts,
        }
    }

    /// Creates a source serving the embedded sample alerts.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] if the embedded fixtures are malformed.
    pub fn sample() -> Result<Self, SourceError> {
        Self::from_json_str("sample", SAMPLE_ALERTS)
    }

    /// Parses a JSON array of raw alerts. Elements that are not valid
    /// alerts are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] if `json` is not an array.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, SourceError> {
        let name = name.into();
        let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let alerts = decode_rows(&name, rows);
        Ok(Self::new(name, alerts))
    }

    /// Loads a JSON array of raw alerts from a file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path)?;
        let source = Self::from_json_str(path.display().to_string(), &json)?;
        log::info!(
            "Loaded {} fixture alerts from {}",
            source.alerts.len(),
            path.display()
        );
        Ok(source)
    }

    /// Returns every record, unfiltered.
    #[must_use]
    pub fn alerts(&self) -> &[RawAlert] {
        &self.alerts
    }
}

#[async_trait]
impl AlertSource for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_alerts(&self, filter: &AlertFilter) -> Result<Vec<RawAlert>, SourceError> {
        let alerts: Vec<RawAlert> = self
            .alerts
            .iter()
            .filter(|a| filter.matches(a.effective_from))
            .cloned()
            .collect();

        log::debug!(
            "Fixture source '{}' returned {}/{} alerts for {filter:?}",
            self.name,
            alerts.len(),
            self.alerts.len()
        );

        Ok(alerts)
    }
}
