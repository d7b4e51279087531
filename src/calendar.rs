//! Week-level calendar model: days, times of day, half-open intervals,
//! and the period grid shared by the detector and the placers.

use crate::error::SchedulerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical 7-member day enumeration used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// The five instructional days
    pub const WEEKDAYS: [DayOfWeek; 5] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    /// Zero-based index, Monday = 0
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Canonicalize a day name ("mon", "Monday", "MONDAY") to the enum
    pub fn normalize(name: &str) -> Option<DayOfWeek> {
        match name.trim().to_lowercase().as_str() {
            "mon" | "monday" => Some(DayOfWeek::Monday),
            "tue" | "tues" | "tuesday" => Some(DayOfWeek::Tuesday),
            "wed" | "wednesday" => Some(DayOfWeek::Wednesday),
            "thu" | "thur" | "thurs" | "thursday" => Some(DayOfWeek::Thursday),
            "fri" | "friday" => Some(DayOfWeek::Friday),
            "sat" | "saturday" => Some(DayOfWeek::Saturday),
            "sun" | "sunday" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A time of day as minutes since midnight. Serializes as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, SchedulerError> {
        if hour >= 24 || minute >= 60 {
            return Err(SchedulerError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(TimeOfDay(hour as u16 * 60 + minute as u16))
    }

    pub fn from_minutes(minutes: u16) -> Result<Self, SchedulerError> {
        if minutes >= 24 * 60 {
            return Err(SchedulerError::InvalidTime(format!("{minutes} minutes")));
        }
        Ok(TimeOfDay(minutes))
    }

    pub fn hour(&self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.0 % 60) as u8
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        self.0
    }

    /// Minutes between two times, zero if `other` is earlier
    pub fn minutes_until(&self, other: TimeOfDay) -> u16 {
        other.0.saturating_sub(self.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| SchedulerError::InvalidTime(s.to_string()))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| SchedulerError::InvalidTime(s.to_string()))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| SchedulerError::InvalidTime(s.to_string()))?;
        TimeOfDay::new(hour, minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open `[start, end)` interval within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, SchedulerError> {
        if start >= end {
            return Err(SchedulerError::InvalidInterval {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(TimeRange { start, end })
    }

    /// Half-open overlap: `a.start < b.end && b.start < a.end`
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared sub-interval of two overlapping ranges
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    pub fn duration_minutes(&self) -> u16 {
        self.start.minutes_until(self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One numbered period in the daily grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTime {
    /// 1-based period number
    pub number: u8,
    pub time: TimeRange,
}

/// The daily period grid. Every instructional day shares the same grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodGrid {
    periods: Vec<PeriodTime>,
}

impl PeriodGrid {
    /// Standard grid: `count` 50-minute periods from 08:00 with 5-minute
    /// passing time.
    pub fn standard(count: u8) -> Self {
        let mut periods = Vec::with_capacity(count as usize);
        let mut start = 8 * 60u16;
        for number in 1..=count {
            let time = TimeRange {
                start: TimeOfDay(start),
                end: TimeOfDay(start + 50),
            };
            periods.push(PeriodTime { number, time });
            start += 55;
        }
        PeriodGrid { periods }
    }

    /// Ordered periods of one day. The grid is day-uniform; weekend days
    /// have no periods.
    pub fn periods_of_day(&self, day: DayOfWeek) -> &[PeriodTime] {
        if DayOfWeek::WEEKDAYS.contains(&day) {
            &self.periods
        } else {
            &[]
        }
    }

    pub fn period(&self, number: u8) -> Option<&PeriodTime> {
        self.periods.iter().find(|p| p.number == number)
    }

    pub fn period_count(&self) -> u8 {
        self.periods.len() as u8
    }

    /// Span of the instructional day
    pub fn day_range(&self) -> Option<TimeRange> {
        let first = self.periods.first()?;
        let last = self.periods.last()?;
        Some(TimeRange {
            start: first.time.start,
            end: last.time.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    #[test]
    fn test_half_open_overlap() {
        let a = TimeRange::new(t(9, 0), t(9, 50)).unwrap();
        let b = TimeRange::new(t(9, 30), t(10, 20)).unwrap();
        let c = TimeRange::new(t(9, 50), t(10, 40)).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Touching endpoints do not overlap
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_intersection_window() {
        let a = TimeRange::new(t(9, 0), t(9, 50)).unwrap();
        let b = TimeRange::new(t(9, 30), t(10, 20)).unwrap();

        let shared = a.intersection(&b).unwrap();
        assert_eq!(shared.start, t(9, 30));
        assert_eq!(shared.end, t(9, 50));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        assert!(TimeRange::new(t(10, 0), t(9, 0)).is_err());
        assert!(TimeRange::new(t(9, 0), t(9, 0)).is_err());
    }

    #[test]
    fn test_time_parsing_round_trip() {
        let parsed: TimeOfDay = "09:05".parse().unwrap();
        assert_eq!(parsed, t(9, 5));
        assert_eq!(parsed.to_string(), "09:05");
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("midday".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_day_normalize() {
        assert_eq!(DayOfWeek::normalize("MON"), Some(DayOfWeek::Monday));
        assert_eq!(DayOfWeek::normalize(" thursday "), Some(DayOfWeek::Thursday));
        assert_eq!(DayOfWeek::normalize("someday"), None);
    }

    #[test]
    fn test_standard_grid() {
        let grid = PeriodGrid::standard(8);
        assert_eq!(grid.period_count(), 8);

        let p1 = grid.period(1).unwrap();
        assert_eq!(p1.time.start, t(8, 0));
        assert_eq!(p1.time.end, t(8, 50));

        let p3 = grid.period(3).unwrap();
        assert_eq!(p3.time.start, t(9, 50));

        assert_eq!(grid.periods_of_day(DayOfWeek::Monday).len(), 8);
        assert!(grid.periods_of_day(DayOfWeek::Saturday).is_empty());
    }
}
