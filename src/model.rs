//! Structured, decoded view of a GTFS-RT feed.
//!
//! The generated [`crate::gtfs_rt`] types mirror the wire format, where an
//! entity may carry any combination of optional payloads. This module
//! narrows that into a tagged [`EntityKind`] so the projection code matches
//! on exactly one variant.

use serde::Serialize;
use tracing::debug;

use crate::gtfs_rt;
use crate::gtfs_rt::trip_update::stop_time_update;

/// One decoded feed fetch. Never mutated after decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedMessage {
    /// Feed creation time, POSIX seconds.
    pub timestamp: Option<u64>,
    pub entities: Vec<FeedEntity>,
}

impl FeedMessage {
    /// The sentinel handed downstream when a fetch or decode fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn trip_updates(&self) -> impl Iterator<Item = &TripUpdate> {
        self.entities.iter().filter_map(|e| match &e.kind {
            EntityKind::TripUpdate(t) => Some(t),
            _ => None,
        })
    }

    pub fn alerts(&self) -> impl Iterator<Item = (&str, &Alert)> {
        self.entities.iter().filter_map(|e| match &e.kind {
            EntityKind::Alert(a) => Some((e.id.as_str(), a)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntity {
    pub id: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    TripUpdate(TripUpdate),
    Alert(Alert),
    /// Vehicle positions, deletions and anything else the board ignores.
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripUpdate {
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopTimeUpdate {
    pub stop_sequence: Option<u32>,
    pub stop_id: String,
    pub arrival: Option<StopTimeEvent>,
    pub departure: Option<StopTimeEvent>,
    pub schedule_relationship: ScheduleRelationship,
}

impl StopTimeUpdate {
    /// Arrival time if known, otherwise departure time.
    pub fn effective_time(&self) -> Option<i64> {
        self.arrival
            .and_then(|a| a.time)
            .or_else(|| self.departure.and_then(|d| d.time))
    }

    /// Delay matching [`Self::effective_time`]'s event.
    pub fn effective_delay(&self) -> Option<i32> {
        match self.arrival {
            Some(StopTimeEvent { time: Some(_), delay }) => delay,
            _ => self
                .departure
                .and_then(|d| d.delay)
                .or_else(|| self.arrival.and_then(|a| a.delay)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StopTimeEvent {
    pub time: Option<i64>,
    pub delay: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleRelationship {
    #[default]
    Scheduled,
    Skipped,
    NoData,
    Unscheduled,
    Unknown(i32),
}

impl From<i32> for ScheduleRelationship {
    fn from(value: i32) -> Self {
        match stop_time_update::ScheduleRelationship::try_from(value) {
            Ok(stop_time_update::ScheduleRelationship::Scheduled) => Self::Scheduled,
            Ok(stop_time_update::ScheduleRelationship::Skipped) => Self::Skipped,
            Ok(stop_time_update::ScheduleRelationship::NoData) => Self::NoData,
            Ok(stop_time_update::ScheduleRelationship::Unscheduled) => Self::Unscheduled,
            Err(_) => Self::Unknown(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alert {
    pub active_periods: Vec<TimeRange>,
    pub informed_entities: Vec<EntitySelector>,
    pub cause: Option<String>,
    pub effect: Option<String>,
    pub severity: Option<String>,
    pub url: Vec<Translation>,
    pub header_text: Vec<Translation>,
    pub description_text: Vec<Translation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntitySelector {
    pub stop_id: Option<String>,
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub text: String,
    pub language: Option<String>,
}

impl From<gtfs_rt::FeedMessage> for FeedMessage {
    fn from(feed: gtfs_rt::FeedMessage) -> Self {
        Self {
            timestamp: feed.header.timestamp,
            entities: feed.entity.into_iter().map(FeedEntity::from).collect(),
        }
    }
}

impl From<gtfs_rt::FeedEntity> for FeedEntity {
    fn from(entity: gtfs_rt::FeedEntity) -> Self {
        if entity.trip_update.is_some() && entity.alert.is_some() {
            debug!(entity_id = %entity.id, "Entity carries both a trip update and an alert; keeping the trip update");
        }

        let kind = match (entity.is_deleted, entity.trip_update, entity.alert) {
            (Some(true), _, _) => {
                debug!(entity_id = %entity.id, "Entity marked deleted; not projected");
                EntityKind::Other
            }
            (_, Some(t), _) => EntityKind::TripUpdate(t.into()),
            (_, None, Some(a)) => EntityKind::Alert(a.into()),
            (_, None, None) => EntityKind::Other,
        };

        Self {
            id: entity.id,
            kind,
        }
    }
}

impl From<gtfs_rt::TripUpdate> for TripUpdate {
    fn from(t: gtfs_rt::TripUpdate) -> Self {
        Self {
            trip_id: t.trip.trip_id,
            route_id: t.trip.route_id,
            vehicle_id: t.vehicle.and_then(|v| v.id),
            stop_time_updates: t
                .stop_time_update
                .into_iter()
                .map(StopTimeUpdate::from)
                .collect(),
        }
    }
}

impl From<gtfs_rt::trip_update::StopTimeUpdate> for StopTimeUpdate {
    fn from(u: gtfs_rt::trip_update::StopTimeUpdate) -> Self {
        Self {
            stop_sequence: u.stop_sequence,
            stop_id: u.stop_id.unwrap_or_default(),
            arrival: u.arrival.map(StopTimeEvent::from),
            departure: u.departure.map(StopTimeEvent::from),
            schedule_relationship: u.schedule_relationship.map(Into::into).unwrap_or_default(),
        }
    }
}

impl From<gtfs_rt::trip_update::StopTimeEvent> for StopTimeEvent {
    fn from(e: gtfs_rt::trip_update::StopTimeEvent) -> Self {
        Self {
            time: e.time,
            delay: e.delay,
        }
    }
}

impl From<gtfs_rt::Alert> for Alert {
    fn from(a: gtfs_rt::Alert) -> Self {
        use gtfs_rt::alert::{Cause, Effect, SeverityLevel};

        Self {
            active_periods: a
                .active_period
                .into_iter()
                .map(|p| TimeRange {
                    start: p.start,
                    end: p.end,
                })
                .collect(),
            informed_entities: a
                .informed_entity
                .into_iter()
                .map(|s| EntitySelector {
                    stop_id: s.stop_id,
                    route_id: s.route_id,
                })
                .collect(),
            cause: a.cause.map(|v| {
                Cause::try_from(v).map_or_else(|_| v.to_string(), |c| c.as_str_name().to_string())
            }),
            effect: a.effect.map(|v| {
                Effect::try_from(v).map_or_else(|_| v.to_string(), |e| e.as_str_name().to_string())
            }),
            // Vendor severities outside the schema keep their raw number
            severity: a.severity_level.map(|v| {
                SeverityLevel::try_from(v)
                    .map_or_else(|_| v.to_string(), |s| s.as_str_name().to_string())
            }),
            url: translations(a.url),
            header_text: translations(a.header_text),
            description_text: translations(a.description_text),
        }
    }
}

fn translations(text: Option<gtfs_rt::TranslatedString>) -> Vec<Translation> {
    text.map(|t| {
        t.translation
            .into_iter()
            .map(|tr| Translation {
                text: tr.text,
                language: tr.language,
            })
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: Option<i64>, delay: Option<i32>) -> Option<StopTimeEvent> {
        Some(StopTimeEvent { time, delay })
    }

    #[test]
    fn test_effective_time_prefers_arrival() {
        let u = StopTimeUpdate {
            arrival: event(Some(100), Some(30)),
            departure: event(Some(160), Some(60)),
            ..Default::default()
        };
        assert_eq!(u.effective_time(), Some(100));
        assert_eq!(u.effective_delay(), Some(30));
    }

    #[test]
    fn test_effective_time_falls_back_to_departure() {
        let u = StopTimeUpdate {
            arrival: event(None, Some(30)),
            departure: event(Some(160), Some(60)),
            ..Default::default()
        };
        assert_eq!(u.effective_time(), Some(160));
        assert_eq!(u.effective_delay(), Some(60));
    }

    #[test]
    fn test_effective_time_absent() {
        let u = StopTimeUpdate {
            arrival: event(None, Some(30)),
            ..Default::default()
        };
        assert_eq!(u.effective_time(), None);
    }

    #[test]
    fn test_schedule_relationship_from_wire() {
        assert_eq!(ScheduleRelationship::from(0), ScheduleRelationship::Scheduled);
        assert_eq!(ScheduleRelationship::from(1), ScheduleRelationship::Skipped);
        assert_eq!(ScheduleRelationship::from(2), ScheduleRelationship::NoData);
        assert_eq!(ScheduleRelationship::from(42), ScheduleRelationship::Unknown(42));
    }

    #[test]
    fn test_entity_with_neither_payload_is_other() {
        let entity = gtfs_rt::FeedEntity {
            id: "e1".to_string(),
            ..Default::default()
        };
        assert_eq!(FeedEntity::from(entity).kind, EntityKind::Other);
    }

    #[test]
    fn test_alert_enums_become_names() {
        let alert = gtfs_rt::Alert {
            severity_level: Some(gtfs_rt::alert::SeverityLevel::Warning as i32),
            effect: Some(gtfs_rt::alert::Effect::Detour as i32),
            ..Default::default()
        };
        let alert = Alert::from(alert);
        assert_eq!(alert.severity.as_deref(), Some("WARNING"));
        assert_eq!(alert.effect.as_deref(), Some("DETOUR"));
        assert_eq!(alert.cause, None);
    }

    #[test]
    fn test_vendor_enum_values_keep_raw_number() {
        let alert = gtfs_rt::Alert {
            severity_level: Some(7),
            cause: Some(99),
            ..Default::default()
        };
        let alert = Alert::from(alert);
        assert_eq!(alert.severity.as_deref(), Some("7"));
        assert_eq!(alert.cause.as_deref(), Some("99"));
        assert_eq!(alert.effect, None);
    }

    #[test]
    fn test_deleted_entity_is_other() {
        let entity = gtfs_rt::FeedEntity {
            id: "t1".to_string(),
            is_deleted: Some(true),
            trip_update: Some(gtfs_rt::TripUpdate::default()),
            ..Default::default()
        };
        assert_eq!(FeedEntity::from(entity).kind, EntityKind::Other);

        let kept = gtfs_rt::FeedEntity {
            id: "t2".to_string(),
            is_deleted: Some(false),
            trip_update: Some(gtfs_rt::TripUpdate::default()),
            ..Default::default()
        };
        assert!(matches!(FeedEntity::from(kept).kind, EntityKind::TripUpdate(_)));
    }
}
