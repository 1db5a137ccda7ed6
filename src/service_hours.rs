//! Weekly scheduled service windows per line, and the questions the board
//! asks of them: is the line running now, and when does it start again.
//!
//! All functions take local wall-clock time; converting from UTC into the
//! network's timezone is the caller's job.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::InvalidClockTime;

const MINUTES_PER_DAY: u16 = 1440;

/// Time of day in minutes since midnight, `00:00..=24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        let total = hours.checked_mul(60)?.checked_add(minutes)?;
        (minutes < 60 && total <= MINUTES_PER_DAY).then_some(Self(total))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    fn of(now: &NaiveDateTime) -> u16 {
        // hour() < 24 and minute() < 60, so this is always below 1440
        (now.hour() * 60 + now.minute()) as u16
    }
}

impl FromStr for ClockTime {
    type Err = InvalidClockTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidClockTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hours = h.parse().map_err(|_| invalid())?;
        let minutes = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hours, minutes).ok_or_else(invalid)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One day's operating interval. `start >= end` means the window runs past
/// midnight into the next calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl ServiceWindow {
    pub fn crosses_midnight(&self) -> bool {
        self.start >= self.end
    }

    /// `start` inclusive, `end` exclusive.
    pub fn contains(&self, minute: u16) -> bool {
        let (start, end) = (self.start.minutes(), self.end.minutes());
        if self.crosses_midnight() {
            minute >= start || minute < end
        } else {
            minute >= start && minute < end
        }
    }
}

/// A line's windows by day type. Missing Saturday, Sunday or Friday windows
/// fall back to `weekday`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub weekday: ServiceWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<ServiceWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<ServiceWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<ServiceWindow>,
}

impl WeeklySchedule {
    pub fn for_day(&self, day: Weekday) -> &ServiceWindow {
        let window = match day {
            Weekday::Sun => self.sunday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            _ => None,
        };
        window.unwrap_or(&self.weekday)
    }

    /// The window service resumes on after `day`'s window.
    ///
    /// Only Friday, Saturday and Sunday look ahead to a distinct day type;
    /// every other day resumes on the plain weekday window.
    pub fn following(&self, day: Weekday) -> &ServiceWindow {
        match day {
            Weekday::Fri => self.saturday.as_ref().unwrap_or(&self.weekday),
            Weekday::Sat => self.sunday.as_ref().unwrap_or(&self.weekday),
            _ => &self.weekday,
        }
    }
}

/// When a stopped line starts running again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resumption {
    /// Start time as `HH:MM`.
    pub label: String,
    pub is_tomorrow: bool,
}

/// The earliest resumption among a set of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextService {
    pub line: String,
    pub label: String,
    pub is_tomorrow: bool,
    pub minutes_until: u16,
}

impl fmt::Display for NextService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tomorrow {
            write!(f, "tomorrow at {}", self.label)
        } else {
            write!(f, "at {}", self.label)
        }
    }
}

/// Static service-hours table keyed by line label (`"RER A"`, `"77"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceHours(HashMap<String, WeeklySchedule>);

impl ServiceHours {
    pub fn new(table: HashMap<String, WeeklySchedule>) -> Self {
        Self(table)
    }

    pub fn get(&self, line: &str) -> Option<&WeeklySchedule> {
        self.0.get(line)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `line` is scheduled to run at `now`.
    ///
    /// Lines without configured hours are always considered active so the
    /// board never hides a line it knows nothing about.
    pub fn is_active(&self, line: &str, now: &NaiveDateTime) -> bool {
        match self.get(line) {
            Some(schedule) => schedule.for_day(now.weekday()).contains(ClockTime::of(now)),
            None => true,
        }
    }

    /// The next scheduled start for `line`.
    ///
    /// Returns `None` for unknown lines, and while `now` falls inside a window
    /// that runs past midnight (the line is already running).
    pub fn next_resumption(&self, line: &str, now: &NaiveDateTime) -> Option<Resumption> {
        let schedule = self.get(line)?;
        let minute = ClockTime::of(now);
        let today = schedule.for_day(now.weekday());

        if today.crosses_midnight() && today.contains(minute) {
            return None;
        }

        if minute < today.start.minutes() {
            Some(Resumption {
                label: today.start.to_string(),
                is_tomorrow: false,
            })
        } else {
            Some(Resumption {
                label: schedule.following(now.weekday()).start.to_string(),
                is_tomorrow: true,
            })
        }
    }

    /// The line among `lines` that resumes soonest, by minutes from `now`.
    ///
    /// Lines without configured hours are skipped. Ties go to the line listed
    /// first.
    pub fn earliest_resumption<S: AsRef<str>>(
        &self,
        lines: &[S],
        now: &NaiveDateTime,
    ) -> Option<NextService> {
        let minute = ClockTime::of(now);
        let mut best: Option<NextService> = None;

        for line in lines {
            let line = line.as_ref();
            let Some(schedule) = self.get(line) else {
                continue;
            };

            let today = schedule.for_day(now.weekday()).start;
            let (start, minutes_until, is_tomorrow) = if minute < today.minutes() {
                (today, today.minutes() - minute, false)
            } else {
                let tomorrow = schedule.following(now.weekday()).start;
                (tomorrow, MINUTES_PER_DAY - minute + tomorrow.minutes(), true)
            };

            if best.as_ref().is_none_or(|b| minutes_until < b.minutes_until) {
                best = Some(NextService {
                    line: line.to_string(),
                    label: start.to_string(),
                    is_tomorrow,
                    minutes_until,
                });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // January 2026: the 5th is a Monday, the 9th a Friday, the 10th a
    // Saturday and the 11th a Sunday.
    fn at(day: u32, hm: &str) -> NaiveDateTime {
        let t: ClockTime = hm.parse().unwrap();
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(u32::from(t.minutes() / 60), u32::from(t.minutes() % 60), 0)
            .unwrap()
    }

    fn window(start: &str, end: &str) -> ServiceWindow {
        ServiceWindow {
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
        }
    }

    fn every_day(start: &str, end: &str) -> WeeklySchedule {
        WeeklySchedule {
            weekday: window(start, end),
            saturday: None,
            sunday: None,
            friday: None,
        }
    }

    fn table(entries: &[(&str, WeeklySchedule)]) -> ServiceHours {
        ServiceHours::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn rer_a() -> WeeklySchedule {
        WeeklySchedule {
            weekday: window("05:00", "00:40"),
            saturday: Some(window("05:00", "01:40")),
            sunday: Some(window("05:30", "00:40")),
            friday: None,
        }
    }

    fn n34() -> WeeklySchedule {
        WeeklySchedule {
            weekday: window("00:40", "05:30"),
            friday: Some(window("23:53", "05:30")),
            saturday: Some(window("00:40", "05:30")),
            sunday: Some(window("00:40", "05:00")),
        }
    }

    #[test]
    fn test_clock_time_parse() {
        assert_eq!("5:00".parse::<ClockTime>().unwrap().minutes(), 300);
        assert_eq!("00:40".parse::<ClockTime>().unwrap().minutes(), 40);
        assert_eq!("24:00".parse::<ClockTime>().unwrap().minutes(), 1440);
        assert!("24:01".parse::<ClockTime>().is_err());
        assert!("7:5".parse::<ClockTime>().is_err());
        assert!("07:60".parse::<ClockTime>().is_err());
        assert!("noon".parse::<ClockTime>().is_err());
    }

    #[test]
    fn test_clock_time_display_pads() {
        assert_eq!("5:00".parse::<ClockTime>().unwrap().to_string(), "05:00");
    }

    #[test]
    fn test_midnight_crossing_window() {
        let hours = table(&[("N", every_day("23:00", "01:00"))]);
        assert!(hours.is_active("N", &at(5, "23:30")));
        assert!(hours.is_active("N", &at(5, "00:30")));
        assert!(!hours.is_active("N", &at(5, "12:00")));
    }

    #[test]
    fn test_window_boundaries() {
        let hours = table(&[("520", every_day("07:00", "20:00"))]);
        assert!(!hours.is_active("520", &at(5, "06:59")));
        assert!(hours.is_active("520", &at(5, "07:00")));
        assert!(hours.is_active("520", &at(5, "19:59")));
        assert!(!hours.is_active("520", &at(5, "20:00")));
    }

    #[test]
    fn test_unknown_line_is_active() {
        let hours = ServiceHours::default();
        assert!(hours.is_active("999", &at(5, "03:00")));
        assert_eq!(hours.next_resumption("999", &at(5, "03:00")), None);
    }

    #[test]
    fn test_is_active_total_over_a_week() {
        let hours = table(&[("RER A", rer_a()), ("N34", n34())]);
        let start = at(5, "00:00");
        for minute in 0..(7 * 1440) {
            let now = start + chrono::Duration::minutes(minute);
            let _ = hours.is_active("RER A", &now);
            let _ = hours.is_active("N34", &now);
            let _ = hours.next_resumption("N34", &now);
        }
    }

    #[test]
    fn test_day_selection() {
        let hours = table(&[("N34", n34())]);
        // Friday night starts early
        assert!(hours.is_active("N34", &at(9, "23:55")));
        // Thursday at the same time it is not running
        assert!(!hours.is_active("N34", &at(8, "23:55")));
        // Sunday stops at 05:00
        assert!(!hours.is_active("N34", &at(11, "05:10")));
        assert!(hours.is_active("N34", &at(10, "05:10")));
    }

    #[test]
    fn test_next_resumption_in_overnight_gap() {
        let hours = table(&[("RER A", rer_a())]);
        assert_eq!(
            hours.next_resumption("RER A", &at(5, "02:00")),
            Some(Resumption {
                label: "05:00".to_string(),
                is_tomorrow: false,
            })
        );
    }

    #[test]
    fn test_next_resumption_none_while_overnight_service_runs() {
        let hours = table(&[("RER A", rer_a())]);
        assert_eq!(hours.next_resumption("RER A", &at(5, "00:20")), None);
        assert_eq!(hours.next_resumption("RER A", &at(5, "12:00")), None);
    }

    #[test]
    fn test_next_resumption_tomorrow() {
        let hours = table(&[("520", every_day("07:00", "20:00"))]);
        assert_eq!(
            hours.next_resumption("520", &at(5, "21:00")),
            Some(Resumption {
                label: "07:00".to_string(),
                is_tomorrow: true,
            })
        );
    }

    #[test]
    fn test_next_resumption_uses_following_day_window() {
        let hours = table(&[(
            "201",
            WeeklySchedule {
                weekday: window("06:00", "20:00"),
                saturday: Some(window("06:30", "20:00")),
                sunday: Some(window("07:00", "20:00")),
                friday: None,
            },
        )]);
        // Friday evening resumes on Saturday's start
        assert_eq!(
            hours.next_resumption("201", &at(9, "21:00")).unwrap().label,
            "06:30"
        );
        // Saturday evening resumes on Sunday's start
        assert_eq!(
            hours.next_resumption("201", &at(10, "21:00")).unwrap().label,
            "07:00"
        );
        // Sunday evening resumes on the weekday start
        assert_eq!(
            hours.next_resumption("201", &at(11, "21:00")).unwrap().label,
            "06:00"
        );
    }

    #[test]
    fn test_earliest_resumption_picks_minimum() {
        let hours = table(&[
            ("77", every_day("5:30", "0:45")),
            ("201", every_day("6:00", "0:30")),
            ("N33", every_day("0:30", "5:30")),
        ]);
        let next = hours
            .earliest_resumption(&["201", "77", "N33"], &at(5, "03:00"))
            .unwrap();
        assert_eq!(next.line, "77");
        assert_eq!(next.label, "05:30");
        assert!(!next.is_tomorrow);
        assert_eq!(next.minutes_until, 150);
        assert_eq!(next.to_string(), "at 05:30");
    }

    #[test]
    fn test_earliest_resumption_next_day_distance() {
        let hours = table(&[("N33", every_day("0:30", "5:30"))]);
        let next = hours.earliest_resumption(&["N33"], &at(5, "23:00")).unwrap();
        assert!(next.is_tomorrow);
        assert_eq!(next.minutes_until, 90);
        assert_eq!(next.to_string(), "tomorrow at 00:30");
    }

    #[test]
    fn test_earliest_resumption_tie_goes_to_first() {
        let hours = table(&[
            ("108", every_day("5:45", "0:30")),
            ("110", every_day("5:45", "0:30")),
        ]);
        let next = hours
            .earliest_resumption(&["110", "108"], &at(5, "04:00"))
            .unwrap();
        assert_eq!(next.line, "110");
    }

    #[test]
    fn test_earliest_resumption_skips_unknown_lines() {
        let hours = table(&[("520", every_day("7:00", "20:00"))]);
        let next = hours
            .earliest_resumption(&["999", "520"], &at(5, "06:00"))
            .unwrap();
        assert_eq!(next.line, "520");
        assert_eq!(next.minutes_until, 60);
        assert!(hours.earliest_resumption(&["999"], &at(5, "06:00")).is_none());
    }
}
