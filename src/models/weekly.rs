//! Weekly availability templates.
//!
//! Availability often arrives as a recurring week: day name → list of
//! `{ "start_time": "HH:MM", "end_time": "HH:MM" }` in 24-hour format.
//! This module converts that shape to and from epoch-relative slots.
//!
//! # Week Epoch
//! Week `n` starts at `n * WEEK_MS`, Sunday 00:00. Sunday is day 0.
//!
//! # Midnight
//! `end_time` may be `24:00`, or `00:00` after a later start; both mean the
//! end of that day. Slots never wrap into the next day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Availability, TimeSlot, DAY_MS, MINUTE_MS};
use crate::error::RequestError;

/// One week in milliseconds.
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// Day of the week, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[serde(alias = "Sunday")]
    Sunday,
    #[serde(alias = "Monday")]
    Monday,
    #[serde(alias = "Tuesday")]
    Tuesday,
    #[serde(alias = "Wednesday")]
    Wednesday,
    #[serde(alias = "Thursday")]
    Thursday,
    #[serde(alias = "Friday")]
    Friday,
    #[serde(alias = "Saturday")]
    Saturday,
}

impl Weekday {
    /// All days, Sunday first.
    pub const ALL: [Weekday; 7] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    /// Zero-based position in the week.
    pub fn index(self) -> i64 {
        self as i64
    }

    /// Day for a zero-based index (taken modulo 7).
    pub fn from_index(index: i64) -> Self {
        Self::ALL[index.rem_euclid(7) as usize]
    }
}

/// A wall-clock slot within one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSlot {
    /// Start, `HH:MM`.
    pub start_time: String,
    /// End, `HH:MM`.
    pub end_time: String,
}

impl ClockSlot {
    /// Creates a clock slot.
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Offsets of start and end from the start of the day (ms).
    pub fn offsets_ms(&self) -> Result<(i64, i64), RequestError> {
        let start = parse_clock(&self.start_time)?;
        if start == DAY_MS {
            return Err(RequestError::InvalidClockTime(self.start_time.clone()));
        }
        let mut end = parse_clock(&self.end_time)?;
        if end == 0 && start > 0 {
            end = DAY_MS;
        }
        if end <= start {
            return Err(RequestError::InvalidSlot {
                start_ms: start,
                end_ms: end,
            });
        }
        Ok((start, end))
    }
}

/// Recurring weekly availability, keyed by day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyAvailability {
    days: BTreeMap<Weekday, Vec<ClockSlot>>,
}

impl WeeklyAvailability {
    /// Creates an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot to a day.
    pub fn with_slot(
        mut self,
        day: Weekday,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        self.days
            .entry(day)
            .or_default()
            .push(ClockSlot::new(start_time, end_time));
        self
    }

    /// Slots for a day (empty if none).
    pub fn slots(&self, day: Weekday) -> &[ClockSlot] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether no day has any slot.
    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    /// Epoch-relative slots for week number `week`.
    pub fn to_slots(&self, week: i64) -> Result<Vec<TimeSlot>, RequestError> {
        let week_start = week * WEEK_MS;
        let mut out = Vec::new();
        for (day, slots) in &self.days {
            let day_start = week_start + day.index() * DAY_MS;
            for slot in slots {
                let (start, end) = slot.offsets_ms()?;
                out.push(TimeSlot::new(day_start + start, day_start + end));
            }
        }
        Ok(out)
    }

    /// Converts the template into an availability set for week number `week`.
    pub fn to_availability(&self, week: i64) -> Result<Availability, RequestError> {
        Availability::new(self.to_slots(week)?)
    }

    /// Renders epoch-relative slots back into a weekly template.
    ///
    /// Slots crossing midnight are split per day. Week numbers are dropped,
    /// so slots from different weeks land on the same day names.
    pub fn from_slots<'a>(slots: impl IntoIterator<Item = &'a TimeSlot>) -> Self {
        let mut weekly = Self::new();
        for slot in slots {
            let mut cursor = slot.start_ms;
            while cursor < slot.end_ms {
                let day_start = cursor - cursor.rem_euclid(DAY_MS);
                let piece_end = slot.end_ms.min(day_start + DAY_MS);
                let day = Weekday::from_index(day_start.div_euclid(DAY_MS));
                weekly.days.entry(day).or_default().push(ClockSlot::new(
                    format_clock(cursor - day_start),
                    format_clock(piece_end - day_start),
                ));
                cursor = piece_end;
            }
        }
        weekly
    }
}

/// Parses `HH:MM` into an offset from midnight (ms). Accepts `24:00`.
fn parse_clock(text: &str) -> Result<i64, RequestError> {
    let invalid = || RequestError::InvalidClockTime(text.to_string());
    let bytes = text.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let digit = |i: usize| -> Result<i64, RequestError> {
        let b = bytes[i];
        if b.is_ascii_digit() {
            Ok(i64::from(b - b'0'))
        } else {
            Err(invalid())
        }
    };
    let hours = digit(0)? * 10 + digit(1)?;
    let minutes = digit(3)? * 10 + digit(4)?;
    if minutes > 59 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(invalid());
    }
    Ok((hours * 60 + minutes) * MINUTE_MS)
}

fn format_clock(offset_ms: i64) -> String {
    let minutes = offset_ms / MINUTE_MS;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HOUR_MS;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:00").unwrap(), 0);
        assert_eq!(parse_clock("09:30").unwrap(), 9 * HOUR_MS + 30 * MINUTE_MS);
        assert_eq!(parse_clock("24:00").unwrap(), DAY_MS);
        assert!(parse_clock("24:01").is_err());
        assert!(parse_clock("9:30").is_err());
        assert!(parse_clock("09-30").is_err());
        assert!(parse_clock("12:60").is_err());
        assert!(parse_clock("ab:cd").is_err());
    }

    #[test]
    fn test_midnight_end() {
        let slot = ClockSlot::new("19:00", "00:00");
        assert_eq!(slot.offsets_ms().unwrap(), (19 * HOUR_MS, DAY_MS));

        let slot = ClockSlot::new("19:00", "24:00");
        assert_eq!(slot.offsets_ms().unwrap(), (19 * HOUR_MS, DAY_MS));

        assert!(ClockSlot::new("24:00", "24:00").offsets_ms().is_err());
        assert!(ClockSlot::new("10:00", "09:00").offsets_ms().is_err());
    }

    #[test]
    fn test_weekly_to_availability() {
        let weekly = WeeklyAvailability::new()
            .with_slot(Weekday::Sunday, "19:00", "21:00")
            .with_slot(Weekday::Friday, "10:00", "14:00");

        let availability = weekly.to_availability(0).unwrap();
        assert_eq!(
            availability.slots(),
            &[
                TimeSlot::new(19 * HOUR_MS, 21 * HOUR_MS),
                TimeSlot::new(5 * DAY_MS + 10 * HOUR_MS, 5 * DAY_MS + 14 * HOUR_MS),
            ]
        );

        let next_week = weekly.to_availability(1).unwrap();
        assert_eq!(next_week.slots()[0].start_ms, WEEK_MS + 19 * HOUR_MS);
    }

    #[test]
    fn test_weekly_json_shape() {
        let json = r#"{
            "Sunday": [{"start_time": "19:00", "end_time": "21:00"}],
            "monday": [],
            "saturday": [{"start_time": "10:00", "end_time": "14:00"}]
        }"#;
        let weekly: WeeklyAvailability = serde_json::from_str(json).unwrap();
        assert_eq!(weekly.slots(Weekday::Sunday).len(), 1);
        assert!(weekly.slots(Weekday::Monday).is_empty());
        assert!(weekly.slots(Weekday::Tuesday).is_empty());
        assert_eq!(weekly.slots(Weekday::Saturday)[0].end_time, "14:00");
    }

    #[test]
    fn test_from_slots_splits_midnight() {
        let slots = [TimeSlot::new(22 * HOUR_MS, DAY_MS + 2 * HOUR_MS)];
        let weekly = WeeklyAvailability::from_slots(&slots);
        assert_eq!(
            weekly.slots(Weekday::Sunday),
            &[ClockSlot::new("22:00", "24:00")]
        );
        assert_eq!(
            weekly.slots(Weekday::Monday),
            &[ClockSlot::new("00:00", "02:00")]
        );
    }

    #[test]
    fn test_overlapping_template_rejected() {
        let weekly = WeeklyAvailability::new()
            .with_slot(Weekday::Monday, "09:00", "12:00")
            .with_slot(Weekday::Monday, "11:00", "13:00");
        assert!(matches!(
            weekly.to_availability(0),
            Err(RequestError::OverlappingAvailability { .. })
        ));
    }
}
