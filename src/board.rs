//! Query API over configured stops and locations.
//!
//! A [`Board`] resolves stop keys and location names against the static
//! config and runs the arrival projector and alert matcher on feeds the
//! caller already fetched. It holds no per-query state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::alerts::{AlertSummary, match_by_stop, match_by_stops};
use crate::arrivals::{ArrivalList, ArrivalProjector, ArrivalQuery};
use crate::config::{AppConfig, StopConfig};
use crate::error::BoardError;
use crate::model::FeedMessage;

/// Arrivals at one configured stop.
#[derive(Debug, Clone, Serialize)]
pub struct StopSchedule {
    pub key: String,
    pub stop: StopConfig,
    #[serde(flatten)]
    pub arrivals: ArrivalList,
}

/// Per-query options shared by stop and location lookups.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
    pub routes: Option<Vec<String>>,
    pub include_departed: bool,
}

pub struct Board<'a> {
    config: &'a AppConfig,
}

impl<'a> Board<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        self.config
    }

    fn stop(&self, key: &str) -> Result<&'a StopConfig, BoardError> {
        self.config.stop(key).ok_or_else(|| {
            warn!(stop_key = key, "Unknown stop key");
            BoardError::UnknownStop(key.to_string())
        })
    }

    fn location(&self, name: &str) -> Result<&'a [String], BoardError> {
        self.config.location(name).ok_or_else(|| {
            warn!(location = name, "Unknown location");
            BoardError::UnknownLocation(name.to_string())
        })
    }

    /// # Errors
    ///
    /// [`BoardError::UnknownStop`] if `key` is not in the stop table.
    pub fn stop_schedule(
        &self,
        trips: &FeedMessage,
        key: &str,
        options: &ScheduleOptions,
        now: DateTime<Utc>,
    ) -> Result<StopSchedule, BoardError> {
        let stop = self.stop(key)?;
        let projector = ArrivalProjector::new(&self.config.service_hours, self.config.timezone);

        let mut query = ArrivalQuery::new(stop).include_departed(options.include_departed);
        if let Some(routes) = &options.routes {
            query = query.routes(routes);
        }

        let arrivals = projector.project(trips, &query, now);
        debug!(
            stop_key = key,
            stop = %stop.name,
            arrivals = arrivals.arrivals.len(),
            "Stop schedule built"
        );

        Ok(StopSchedule {
            key: key.to_string(),
            stop: stop.clone(),
            arrivals,
        })
    }

    /// Schedules for every stop of `location`, in configured order.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownLocation`] if `location` is not configured.
    pub fn location_schedules(
        &self,
        trips: &FeedMessage,
        location: &str,
        options: &ScheduleOptions,
        now: DateTime<Utc>,
    ) -> Result<Vec<StopSchedule>, BoardError> {
        self.location(location)?
            .iter()
            .map(|key| self.stop_schedule(trips, key, options, now))
            .collect()
    }

    /// # Errors
    ///
    /// [`BoardError::UnknownStop`] if `key` is not in the stop table.
    pub fn stop_alerts(
        &self,
        alerts: &FeedMessage,
        key: &str,
    ) -> Result<Vec<AlertSummary>, BoardError> {
        let stop = self.stop(key)?;
        Ok(match_by_stop(alerts, &stop.stop_id))
    }

    /// # Errors
    ///
    /// [`BoardError::UnknownLocation`] if `location` is not configured.
    pub fn location_alerts(
        &self,
        alerts: &FeedMessage,
        location: &str,
    ) -> Result<Vec<AlertSummary>, BoardError> {
        let stop_ids = self
            .location(location)?
            .iter()
            .map(|key| self.stop(key).map(|s| s.stop_id.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match_by_stops(alerts, &stop_ids))
    }
}
