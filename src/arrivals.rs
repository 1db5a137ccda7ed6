//! Per-stop arrival projection from a decoded trip-updates feed.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::config::StopConfig;
use crate::model::{FeedMessage, ScheduleRelationship};
use crate::service_hours::{NextService, ServiceHours};

/// One predicted call of a trip at the queried stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub stop_sequence: Option<u32>,
    /// POSIX seconds; arrival time, or departure time when no arrival is given.
    pub effective_time: i64,
    /// `effective_time` as `HH:MM` in the network's timezone.
    pub local_time: String,
    pub delay_seconds: Option<i32>,
    pub wait_minutes: i64,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalList {
    /// Timestamp of the feed the arrivals came from.
    pub timestamp: Option<u64>,
    pub arrivals: Vec<Arrival>,
    /// Only set when `arrivals` is empty. Informational, not an arrival.
    pub next_service: Option<NextService>,
}

#[derive(Debug, Clone, Copy)]
pub struct ArrivalQuery<'a> {
    pub stop: &'a StopConfig,
    /// Line labels; a trip matches when its route id contains one of them.
    pub routes: Option<&'a [String]>,
    /// Keep arrivals whose wait is zero or negative.
    pub include_departed: bool,
}

impl<'a> ArrivalQuery<'a> {
    pub fn new(stop: &'a StopConfig) -> Self {
        Self {
            stop,
            routes: None,
            include_departed: false,
        }
    }

    pub fn routes(mut self, routes: &'a [String]) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn include_departed(mut self, include: bool) -> Self {
        self.include_departed = include;
        self
    }
}

/// Projects a trip-updates feed onto one stop.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalProjector<'a> {
    service_hours: &'a ServiceHours,
    timezone: Tz,
}

impl<'a> ArrivalProjector<'a> {
    pub fn new(service_hours: &'a ServiceHours, timezone: Tz) -> Self {
        Self {
            service_hours,
            timezone,
        }
    }

    pub fn project(
        &self,
        feed: &FeedMessage,
        query: &ArrivalQuery<'_>,
        now: DateTime<Utc>,
    ) -> ArrivalList {
        let stop_id = query.stop.stop_id.as_str();
        let now_millis = now.timestamp_millis();

        let mut arrivals: Vec<Arrival> = feed
            .trip_updates()
            .filter(|t| t.stop_time_updates.iter().any(|u| u.stop_id == stop_id))
            .filter(|t| match query.routes {
                Some(routes) => t
                    .route_id
                    .as_deref()
                    .is_some_and(|id| routes.iter().any(|label| id.contains(label.as_str()))),
                None => true,
            })
            .flat_map(move |trip| {
                trip.stop_time_updates
                    .iter()
                    .filter(move |u| u.stop_id == stop_id)
                    .filter_map(move |u| {
                        let effective_time = u.effective_time()?;
                        Some(Arrival {
                            route_id: trip.route_id.clone(),
                            trip_id: trip.trip_id.clone(),
                            vehicle_id: trip.vehicle_id.clone(),
                            stop_sequence: u.stop_sequence,
                            effective_time,
                            local_time: self.local_time(effective_time),
                            delay_seconds: u.effective_delay(),
                            wait_minutes: wait_minutes(effective_time, now_millis),
                            is_cancelled: u.schedule_relationship == ScheduleRelationship::Skipped,
                        })
                    })
            })
            .filter(|a| query.include_departed || a.wait_minutes > 0)
            .collect();

        arrivals.sort_by(|a, b| {
            a.wait_minutes
                .cmp(&b.wait_minutes)
                .then_with(|| match (a.stop_sequence, b.stop_sequence) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.trip_id.cmp(&b.trip_id))
        });

        debug!(stop_id, arrivals = arrivals.len(), "Projected arrivals");

        let next_service = if arrivals.is_empty() {
            let local_now = now.with_timezone(&self.timezone).naive_local();
            self.service_hours
                .earliest_resumption(&hint_lines(query), &local_now)
        } else {
            None
        };

        ArrivalList {
            timestamp: feed.timestamp,
            arrivals,
            next_service,
        }
    }

    fn local_time(&self, epoch_secs: i64) -> String {
        DateTime::from_timestamp(epoch_secs, 0)
            .map(|t| t.with_timezone(&self.timezone).format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Stop lines named by the route filter, or all of the stop's lines when the
/// filter names none of them.
fn hint_lines<'q>(query: &ArrivalQuery<'q>) -> Vec<&'q str> {
    let lines = query.stop.lines.iter().map(String::as_str);
    let named: Vec<&str> = match query.routes {
        Some(routes) => lines
            .clone()
            .filter(|line| routes.iter().any(|label| line.contains(label.as_str())))
            .collect(),
        None => Vec::new(),
    };

    if named.is_empty() { lines.collect() } else { named }
}

/// Whole minutes from `now_millis` to `epoch_secs`, halves rounded up.
pub fn wait_minutes(epoch_secs: i64, now_millis: i64) -> i64 {
    let diff = epoch_secs.saturating_mul(1000).saturating_sub(now_millis);
    diff.saturating_add(30_000).div_euclid(60_000)
}
