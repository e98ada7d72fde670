//! Alert source backed by the Supabase `PostgREST` API.
//!
//! Alerts, their areas, places and source documents live in separate
//! tables; a single embedded-resource `select` pulls the whole tree so
//! each row deserializes straight into a [`RawAlert`].

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reach_alert_models::RawAlert;

use crate::{AlertFilter, AlertSource, SourceError, decode_rows, retry};

/// Embedded-resource select for one alert with its document and areas.
const ALERT_SELECT: &str = "*,document:documents(*),alert_areas(*,place:places(*))";

/// Fetches alerts from a Supabase project's REST endpoint.
#[derive(Debug, Clone)]
pub struct SupabaseSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SupabaseSource {
    /// Creates a source for the project at `base_url`
    /// (e.g. `https://xyz.supabase.co`).
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: "alerts".to_string(),
        }
    }

    /// Overrides the alerts table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// The REST URL of the alerts table.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Builds the `PostgREST` query parameters for `filter`.
    ///
    /// The end bound is expressed as "before the start of the next day"
    /// so the whole last day is included.
    #[must_use]
    pub fn query_params(filter: &AlertFilter) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), ALERT_SELECT.to_string())];

        if let Some(start) = filter.start_date {
            params.push((
                "effective_from".to_string(),
                format!("gte.{}", start_of_day(start)),
            ));
        }

        if let Some(end) = filter.end_date {
            let bound = end.checked_add_days(Days::new(1)).map_or_else(
                || format!("lte.{end}T23:59:59Z"),
                |next| format!("lt.{}", start_of_day(next)),
            );
            params.push(("effective_from".to_string(), bound));
        }

        params.push(("order".to_string(), "effective_from.desc".to_string()));
        params
    }
}

fn start_of_day(day: NaiveDate) -> String {
    format!("{day}T00:00:00Z")
}

#[async_trait]
impl AlertSource for SupabaseSource {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn fetch_alerts(&self, filter: &AlertFilter) -> Result<Vec<RawAlert>, SourceError> {
        let url = self.endpoint();
        let params = Self::query_params(filter);

        log::info!("Fetching alerts from {url} ({filter:?})");

        let body = retry::send_json(|| {
            self.client
                .get(&url)
                .query(&params)
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        })
        .await?;

        let rows: Vec<serde_json::Value> = serde_json::from_value(body)?;
        let alerts = decode_rows(self.name(), rows);
        log::info!("Fetched {} alerts", alerts.len());

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn values_for<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn unbounded_query_selects_and_orders() {
        let params = SupabaseSource::query_params(&AlertFilter::default());
        assert_eq!(values_for(&params, "select"), vec![ALERT_SELECT]);
        assert!(values_for(&params, "effective_from").is_empty());
        assert_eq!(values_for(&params, "order"), vec!["effective_from.desc"]);
    }

    #[test]
    fn date_range_covers_whole_end_day() {
        let filter = AlertFilter::new(Some(day(2024, 10, 9)), Some(day(2024, 10, 12)));
        let params = SupabaseSource::query_params(&filter);
        assert_eq!(
            values_for(&params, "effective_from"),
            vec!["gte.2024-10-09T00:00:00Z", "lt.2024-10-13T00:00:00Z"]
        );
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let source = SupabaseSource::new("https://example.supabase.co/", "key");
        assert_eq!(
            source.endpoint(),
            "https://example.supabase.co/rest/v1/alerts"
        );
        assert_eq!(
            source.with_table("alerts_view").endpoint(),
            "https://example.supabase.co/rest/v1/alerts_view"
        );
    }
}
