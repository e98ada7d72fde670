#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transforms raw alert records into display-ready view models.
//!
//! [`transform`] is total: every raw alert produces an
//! [`AlertViewModel`], substituting placeholders for missing fields and a
//! configured fallback location when the alert's area has no usable
//! geometry.

use reach_alert_models::{
    AlertCategory, AlertSeverity, AlertUrgency, AlertViewModel, PointOrigin, RawAlert,
    RawAlertArea,
};
use reach_geometry::{LngLat, extract_representative_point};
use serde::{Deserialize, Serialize};

/// Location label used when the alert has no named place.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Placeholder for any other missing text field.
pub const UNKNOWN: &str = "Unknown";

/// Default fallback point: Kathmandu, the deployment's geographic focus.
pub const DEFAULT_FALLBACK_POINT: LngLat = LngLat::new(85.324, 27.7172);

/// Settings for [`transform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Point used when an alert has no usable geometry.
    pub fallback_point: LngLat,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            fallback_point: DEFAULT_FALLBACK_POINT,
        }
    }
}

/// Builds the view model for one raw alert.
///
/// Only the first alert area contributes the location, the point, the
/// retained polygon and the per-area overrides; place names are collected
/// from every area.
#[must_use]
pub fn transform(alert: &RawAlert, config: &TransformConfig) -> AlertViewModel {
    let area = alert.alert_areas.first();
    let place = area.and_then(|a| a.place.as_ref());
    let polygon = place.and_then(reach_alert_models::RawPlace::geometry);

    let (point, point_origin) = match extract_representative_point(polygon.as_ref()) {
        Some(point) => (point, PointOrigin::Geometry),
        None => {
            log::debug!(
                "Alert {} has no usable geometry, using fallback point {}",
                alert.id,
                config.fallback_point
            );
            (config.fallback_point, PointOrigin::Fallback)
        }
    };

    let severity = override_or(area, |a| a.specific_severity.as_deref(), alert.severity.as_deref());
    let urgency = override_or(area, |a| a.specific_urgency.as_deref(), alert.urgency.as_deref());
    let instruction = override_or(
        area,
        |a| a.specific_instruction.as_deref(),
        alert.instruction.as_deref(),
    );

    let effective_from = area
        .and_then(|a| a.specific_effective_from)
        .or(alert.effective_from);
    let effective_until = area
        .and_then(|a| a.specific_effective_until)
        .or(alert.effective_until);

    let place_names = alert
        .alert_areas
        .iter()
        .filter_map(|a| a.place.as_ref()?.name.clone())
        .collect();

    AlertViewModel {
        id: alert.id.clone(),
        title: text_or_unknown(alert.event.as_deref()),
        description: text_or_unknown(alert.description.as_deref()),
        location: place
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        effective_from,
        effective_until,
        category: AlertCategory::parse_or_unknown(alert.category.as_deref()),
        severity: AlertSeverity::parse_or_unknown(severity),
        urgency: AlertUrgency::parse_or_unknown(urgency),
        instruction: text_or_unknown(instruction),
        source: text_or_unknown(
            alert
                .document
                .as_ref()
                .and_then(|d| d.source.as_deref()),
        ),
        point,
        point_origin,
        place_names,
        polygon,
    }
}

/// Transforms every alert in order.
#[must_use]
pub fn transform_all(alerts: &[RawAlert], config: &TransformConfig) -> Vec<AlertViewModel> {
    alerts.iter().map(|a| transform(a, config)).collect()
}

fn override_or<'a>(
    area: Option<&'a RawAlertArea>,
    specific: impl Fn(&'a RawAlertArea) -> Option<&'a str>,
    general: Option<&'a str>,
) -> Option<&'a str> {
    area.and_then(specific).or(general)
}

fn text_or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use reach_alert_models::{RawDocument, RawPlace};
    use reach_geometry::RawAreaGeometry;
    use serde_json::json;

    use super::*;

    fn alert(id: &str, areas: Vec<RawAlertArea>) -> RawAlert {
        RawAlert {
            id: id.to_string(),
            event: Some("Flood Warning - Kathmandu Valley".to_string()),
            description: Some("Heavy rainfall expected.".to_string()),
            category: Some("Met".to_string()),
            severity: Some("Severe".to_string()),
            urgency: Some("Expected".to_string()),
            instruction: Some("Move to higher ground.".to_string()),
            effective_from: Some(Utc.with_ymd_and_hms(2024, 10, 10, 14, 30, 0).unwrap()),
            effective_until: Some(Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap()),
            document: Some(RawDocument {
                id: None,
                source: Some("NDMA".to_string()),
                url: None,
                title: None,
                posted_date: None,
            }),
            alert_areas: areas,
        }
    }

    fn area(name: &str, polygon: serde_json::Value) -> RawAlertArea {
        RawAlertArea {
            place: Some(RawPlace {
                id: None,
                name: Some(name.to_string()),
                polygon,
            }),
            specific_effective_from: None,
            specific_effective_until: None,
            specific_severity: None,
            specific_urgency: None,
            specific_instruction: None,
        }
    }

    #[test]
    fn maps_fields_from_first_area() {
        let raw = alert(
            "1",
            vec![
                area("Kathmandu Valley", json!("POLYGON((85 27, 85.2 27, 85.1 27.3))")),
                area("Lalitpur", json!([85.32, 27.67])),
            ],
        );
        let vm = transform(&raw, &TransformConfig::default());

        assert_eq!(vm.id, "1");
        assert_eq!(vm.title, "Flood Warning - Kathmandu Valley");
        assert_eq!(vm.location, "Kathmandu Valley");
        assert_eq!(vm.category, AlertCategory::Met);
        assert_eq!(vm.severity, AlertSeverity::Severe);
        assert_eq!(vm.urgency, AlertUrgency::Expected);
        assert_eq!(vm.source, "NDMA");
        assert_eq!(vm.place_names, vec!["Kathmandu Valley", "Lalitpur"]);
        assert_eq!(vm.point_origin, PointOrigin::Geometry);
        assert!((vm.point.lng - 85.1).abs() < 1e-9);
        assert!((vm.point.lat - 27.1).abs() < 1e-9);
        assert!(matches!(vm.polygon, Some(RawAreaGeometry::Wkt(_))));
    }

    #[test]
    fn alert_without_areas_uses_fallback() {
        let config = TransformConfig {
            fallback_point: LngLat::new(84.0, 28.0),
        };
        let vm = transform(&alert("2", vec![]), &config);

        assert_eq!(vm.point, LngLat::new(84.0, 28.0));
        assert_eq!(vm.point_origin, PointOrigin::Fallback);
        assert_eq!(vm.location, UNKNOWN_LOCATION);
        assert!(vm.place_names.is_empty());
        assert!(vm.polygon.is_none());
    }

    #[test]
    fn unusable_geometry_uses_fallback_but_keeps_payload() {
        let raw = alert("3", vec![area("Pokhara", json!("POLYGON((garbage"))]);
        let vm = transform(&raw, &TransformConfig::default());

        assert_eq!(vm.point, DEFAULT_FALLBACK_POINT);
        assert!(!vm.has_located_point());
        assert_eq!(vm.location, "Pokhara");
        assert_eq!(
            vm.polygon,
            Some(RawAreaGeometry::Wkt("POLYGON((garbage".to_string()))
        );
    }

    #[test]
    fn missing_text_fields_become_unknown() {
        let raw = RawAlert {
            id: "4".to_string(),
            event: None,
            description: None,
            category: None,
            severity: None,
            urgency: None,
            instruction: None,
            effective_from: None,
            effective_until: None,
            document: None,
            alert_areas: vec![RawAlertArea {
                place: None,
                specific_effective_from: None,
                specific_effective_until: None,
                specific_severity: None,
                specific_urgency: None,
                specific_instruction: None,
            }],
        };
        let vm = transform(&raw, &TransformConfig::default());

        assert_eq!(vm.title, UNKNOWN);
        assert_eq!(vm.description, UNKNOWN);
        assert_eq!(vm.instruction, UNKNOWN);
        assert_eq!(vm.source, UNKNOWN);
        assert_eq!(vm.location, UNKNOWN_LOCATION);
        assert_eq!(vm.severity, AlertSeverity::Unknown);
        assert_eq!(vm.category, AlertCategory::Unknown);
    }

    #[test]
    fn area_overrides_take_precedence() {
        let mut first = area("Biratnagar", json!({ "type": "Point", "coordinates": [87.2718, 26.4525] }));
        first.specific_severity = Some("Extreme".to_string());
        first.specific_instruction = Some("Stay indoors.".to_string());
        first.specific_effective_from = Some(Utc.with_ymd_and_hms(2024, 10, 11, 0, 0, 0).unwrap());

        let vm = transform(&alert("5", vec![first]), &TransformConfig::default());

        assert_eq!(vm.severity, AlertSeverity::Extreme);
        assert_eq!(vm.urgency, AlertUrgency::Expected);
        assert_eq!(vm.instruction, "Stay indoors.");
        assert_eq!(
            vm.effective_from,
            Some(Utc.with_ymd_and_hms(2024, 10, 11, 0, 0, 0).unwrap())
        );
        assert_eq!(vm.point, LngLat::new(87.2718, 26.4525));
    }

    #[test]
    fn transform_is_deterministic() {
        let raw = alert("6", vec![area("Kathmandu", json!([[85.0, 27.0], [85.2, 27.2]]))]);
        let config = TransformConfig::default();
        assert_eq!(transform(&raw, &config), transform(&raw, &config));
    }

    #[test]
    fn transform_all_preserves_order() {
        let alerts = vec![alert("a", vec![]), alert("b", vec![]), alert("c", vec![])];
        let ids: Vec<String> = transform_all(&alerts, &TransformConfig::default())
            .into_iter()
            .map(|vm| vm.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
