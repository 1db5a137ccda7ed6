use serde::Serialize;

use crate::model::{EntityKind, FeedMessage, ScheduleRelationship};

/// Entity and field counts for one decoded feed, logged after each fetch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub timestamp: Option<u64>,
    pub total_entities: usize,

    // entity types
    pub trip_updates: usize,
    pub alerts: usize,
    pub other: usize,

    // stop time updates
    pub stop_time_updates: usize,
    pub without_time: usize,
    pub departure_only: usize,
    pub skipped: usize,

    // alert selectors
    pub alerts_with_stop: usize,
}

impl FeedSummary {
    pub fn from_feed(feed: &FeedMessage) -> Self {
        let mut s = FeedSummary {
            timestamp: feed.timestamp,
            total_entities: feed.entities.len(),
            ..Default::default()
        };

        for e in &feed.entities {
            match &e.kind {
                EntityKind::TripUpdate(t) => {
                    s.trip_updates += 1;
                    s.stop_time_updates += t.stop_time_updates.len();

                    for u in &t.stop_time_updates {
                        if u.effective_time().is_none() {
                            s.without_time += 1;
                        } else if u.arrival.and_then(|a| a.time).is_none() {
                            s.departure_only += 1;
                        }

                        if u.schedule_relationship == ScheduleRelationship::Skipped {
                            s.skipped += 1;
                        }
                    }
                }
                EntityKind::Alert(a) => {
                    s.alerts += 1;

                    if a.informed_entities.iter().any(|sel| sel.stop_id.is_some()) {
                        s.alerts_with_stop += 1;
                    }
                }
                EntityKind::Other => s.other += 1,
            }
        }

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of stop time updates that carry a usable time.
    pub fn timed_pct(&self) -> f64 {
        Self::pct(self.stop_time_updates - self.without_time, self.stop_time_updates)
    }
}
