//! Marker popup HTML.

use reach_alert_models::{AlertSeverity, AlertViewModel};
use reach_map::Marker;

/// Maximum description length shown in a popup, in characters.
pub const POPUP_DESCRIPTION_CHARS: usize = 100;

/// Escapes text for inclusion in HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Shortens `text` to at most `max` characters, appending `...` when
/// anything was cut.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", text[..end].trim_end()),
        None => text.to_string(),
    }
}

/// CSS classes for a severity badge.
#[must_use]
pub const fn severity_badge_class(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Extreme => "bg-red-100 text-red-800",
        AlertSeverity::Severe => "bg-orange-100 text-orange-800",
        AlertSeverity::Moderate => "bg-yellow-100 text-yellow-800",
        AlertSeverity::Minor => "bg-green-100 text-green-800",
        AlertSeverity::Unknown => "bg-gray-100 text-gray-800",
    }
}

/// Popup HTML for an alert marker.
#[must_use]
pub fn popup_html(alert: &AlertViewModel) -> String {
    let approximate = if alert.has_located_point() {
        String::new()
    } else {
        r#"<p class="text-xs italic text-gray-500 mt-1">Approximate location</p>"#.to_string()
    };

    format!(
        concat!(
            r#"<div class="p-2">"#,
            r#"<h3 class="font-semibold text-sm">{title}</h3>"#,
            r#"<p class="text-xs text-gray-600 mt-1">{description}</p>"#,
            "{approximate}",
            r#"<div class="mt-2"><span class="px-2 py-1 text-xs rounded-full {badge}">{severity}</span></div>"#,
            "</div>",
        ),
        title = escape_html(&alert.title),
        description = escape_html(&truncate_chars(&alert.description, POPUP_DESCRIPTION_CHARS)),
        approximate = approximate,
        badge = severity_badge_class(alert.severity),
        severity = alert.severity,
    )
}

/// The map marker for an alert, keyed by alert ID.
#[must_use]
pub fn marker_for(alert: &AlertViewModel) -> Marker {
    Marker {
        key: alert.id.clone(),
        position: alert.point,
        popup_html: Some(popup_html(alert)),
    }
}
