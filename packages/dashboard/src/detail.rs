//! The detail panel record for the current selection.

use chrono::{DateTime, Utc};
use reach_alert_models::{AlertSeverity, AlertViewModel};
use reach_geometry::LngLat;
use serde::Serialize;

/// ID of the detail shown for a clicked map location.
pub const LOCATION_DETAIL_ID: &str = "clicked-location";

/// What a [`DetailView`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    /// An alert from the list.
    Alert,
    /// A clicked map location with no alert.
    Location,
}

/// What the detail panel shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    pub kind: DetailKind,
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub category: String,
    pub severity: AlertSeverity,
    pub urgency: String,
    pub instruction: String,
    pub source: String,
    pub coordinates: LngLat,
    /// "Lat: 27.7172, Lng: 85.3240".
    pub coordinates_label: String,
    /// Set when [`Self::coordinates`] is the fallback point rather than
    /// the alert's own geometry.
    pub approximate_location: bool,
}

impl DetailView {
    /// Detail for a selected alert.
    #[must_use]
    pub fn for_alert(alert: &AlertViewModel) -> Self {
        Self {
            kind: DetailKind::Alert,
            id: alert.id.clone(),
            title: alert.title.clone(),
            description: alert.description.clone(),
            location: alert.location.clone(),
            effective_from: alert.effective_from,
            effective_until: alert.effective_until,
            category: alert.category.to_string(),
            severity: alert.severity,
            urgency: alert.urgency.to_string(),
            instruction: alert.instruction.clone(),
            source: alert.source.clone(),
            coordinates: alert.point,
            coordinates_label: coordinates_label(alert.point),
            approximate_location: !alert.has_located_point(),
        }
    }

    /// Detail for a clicked map location that is not an alert.
    #[must_use]
    pub fn for_location(point: LngLat) -> Self {
        Self {
            kind: DetailKind::Location,
            id: LOCATION_DETAIL_ID.to_string(),
            title: "Selected Location".to_string(),
            description: format!(
                "You clicked at coordinates: {:.4}, {:.4}",
                point.lat, point.lng
            ),
            location: coordinates_label(point),
            effective_from: None,
            effective_until: None,
            category: "Info".to_string(),
            severity: AlertSeverity::Unknown,
            urgency: AlertSeverity::Unknown.to_string(),
            instruction: "No alert covers this selection.".to_string(),
            source: "User Input".to_string(),
            coordinates: point,
            coordinates_label: coordinates_label(point),
            approximate_location: false,
        }
    }

    /// Whether this is the detail of a clicked location.
    #[must_use]
    pub fn is_location(&self) -> bool {
        self.kind == DetailKind::Location
    }
}

/// Formats a point as latitude/longitude to four decimals.
#[must_use]
pub fn coordinates_label(point: LngLat) -> String {
    format!("Lat: {:.4}, Lng: {:.4}", point.lat, point.lng)
}
