//! Service alerts affecting a stop or a group of stops.

use serde::Serialize;

use crate::model::{Alert, FeedMessage, TimeRange, Translation};

/// Header used when an alert carries no header text.
pub const DEFAULT_HEADER: &str = "Service alert";

/// Severity reported when the feed gives none.
pub const UNKNOWN_SEVERITY: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub id: String,
    pub header: String,
    pub description: String,
    pub severity: String,
    pub effect: Option<String>,
    pub active_periods: Vec<TimeRange>,
    /// Route ids named by the alert's selectors, first occurrence order.
    pub affected_routes: Vec<String>,
}

/// Alerts with a selector naming `stop_id`, in feed order.
pub fn match_by_stop(feed: &FeedMessage, stop_id: &str) -> Vec<AlertSummary> {
    match_by_stops(feed, &[stop_id])
}

/// Alerts with a selector naming any of `stop_ids`, in feed order.
///
/// Route-only selectors never match; a stop query needs an explicit stop id.
pub fn match_by_stops<S: AsRef<str>>(feed: &FeedMessage, stop_ids: &[S]) -> Vec<AlertSummary> {
    feed.alerts()
        .filter(|(_, alert)| {
            alert.informed_entities.iter().any(|sel| {
                sel.stop_id
                    .as_deref()
                    .is_some_and(|id| stop_ids.iter().any(|s| s.as_ref() == id))
            })
        })
        .map(|(id, alert)| summarize(id, alert))
        .collect()
}

fn summarize(id: &str, alert: &Alert) -> AlertSummary {
    let mut affected_routes: Vec<String> = Vec::new();
    for route in alert
        .informed_entities
        .iter()
        .filter_map(|sel| sel.route_id.as_deref())
    {
        if !affected_routes.iter().any(|r| r == route) {
            affected_routes.push(route.to_string());
        }
    }

    AlertSummary {
        id: id.to_string(),
        header: first_text(&alert.header_text).unwrap_or(DEFAULT_HEADER).to_string(),
        description: first_text(&alert.description_text).unwrap_or_default().to_string(),
        severity: alert
            .severity
            .clone()
            .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string()),
        effect: alert.effect.clone(),
        active_periods: alert.active_periods.clone(),
        affected_routes,
    }
}

fn first_text(translations: &[Translation]) -> Option<&str> {
    translations
        .first()
        .map(|t| t.text.as_str())
        .filter(|t| !t.is_empty())
}
