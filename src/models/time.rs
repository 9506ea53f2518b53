//! Time slots and availability sets.
//!
//! # Time Model
//! All times are in milliseconds relative to a scheduling epoch.
//! The consumer defines what epoch means (the weekly helpers use
//! Sunday 00:00 of week zero).
//!
//! # Availability
//! An entity is available at `t` iff `t` falls in one of its slots.
//! Slots are kept sorted, non-overlapping, and coalesced, so "a slot lies
//! within availability" is a single containment test against one interval.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60_000;
/// One hour in milliseconds.
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Interval start (ms, inclusive).
    pub start_ms: i64,
    /// Interval end (ms, exclusive).
    pub end_ms: i64,
}

impl TimeSlot {
    /// Creates a new time slot.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Creates a slot, rejecting empty or inverted intervals.
    pub fn try_new(start_ms: i64, end_ms: i64) -> Result<Self, RequestError> {
        let slot = Self::new(start_ms, end_ms);
        slot.check()?;
        Ok(slot)
    }

    /// Creates a slot of `duration_ms` starting at `start_ms`.
    pub fn starting_at(start_ms: i64, duration_ms: i64) -> Self {
        Self::new(start_ms, start_ms.saturating_add(duration_ms))
    }

    /// Duration of this slot (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether the slot has positive length.
    #[inline]
    pub fn is_proper(&self) -> bool {
        self.end_ms > self.start_ms
    }

    /// Whether a timestamp falls within this slot.
    #[inline]
    pub fn contains(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Whether `other` lies entirely inside this slot.
    #[inline]
    pub fn covers(&self, other: &Self) -> bool {
        self.start_ms <= other.start_ms && other.end_ms <= self.end_ms
    }

    /// Whether two slots overlap. Touching slots do not.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// Common part of two slots, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start_ms.max(other.start_ms);
        let end = self.end_ms.min(other.end_ms);
        (end > start).then(|| Self::new(start, end))
    }

    pub(crate) fn check(&self) -> Result<(), RequestError> {
        if self.is_proper() {
            Ok(())
        } else {
            Err(RequestError::InvalidSlot {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            })
        }
    }
}

impl std::fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start_ms, self.end_ms)
    }
}

/// Ordered set of non-overlapping availability slots.
///
/// Empty means never available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimeSlot>", into = "Vec<TimeSlot>")]
pub struct Availability {
    slots: Vec<TimeSlot>,
}

impl Availability {
    /// An availability with no slots.
    pub fn never() -> Self {
        Self::default()
    }

    /// Builds an availability set from arbitrary-order slots.
    ///
    /// Fails on empty/inverted slots or on any overlap. Touching slots are
    /// merged into one.
    pub fn new(mut slots: Vec<TimeSlot>) -> Result<Self, RequestError> {
        for slot in &slots {
            slot.check()?;
        }
        slots.sort();

        let mut merged: Vec<TimeSlot> = Vec::with_capacity(slots.len());
        for slot in slots {
            match merged.last_mut() {
                Some(last) if last.overlaps(&slot) => {
                    return Err(RequestError::OverlappingAvailability {
                        first_start_ms: last.start_ms,
                        first_end_ms: last.end_ms,
                        second_start_ms: slot.start_ms,
                        second_end_ms: slot.end_ms,
                    });
                }
                Some(last) if last.end_ms == slot.start_ms => last.end_ms = slot.end_ms,
                _ => merged.push(slot),
            }
        }

        Ok(Self { slots: merged })
    }

    /// Single-slot availability.
    pub fn single(start_ms: i64, end_ms: i64) -> Result<Self, RequestError> {
        Self::new(vec![TimeSlot::new(start_ms, end_ms)])
    }

    /// The slots in ascending order.
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Whether no slot exists.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether a timestamp is available.
    pub fn is_available_at(&self, time_ms: i64) -> bool {
        self.containing(time_ms).is_some()
    }

    /// Whether the whole of `slot` is available.
    pub fn covers(&self, slot: &TimeSlot) -> bool {
        self.containing(slot.start_ms)
            .is_some_and(|s| s.covers(slot))
    }

    /// Total available time (ms).
    pub fn total_ms(&self) -> i64 {
        self.slots.iter().map(TimeSlot::duration_ms).sum()
    }

    /// Available time within `range` (ms).
    pub fn available_time_in(&self, range: &TimeSlot) -> i64 {
        self.slots
            .iter()
            .filter_map(|s| s.intersection(range))
            .map(|s| s.duration_ms())
            .sum()
    }

    /// Slots clipped to `window`; all slots when `window` is `None`.
    pub fn clipped_to(&self, window: Option<&TimeSlot>) -> Vec<TimeSlot> {
        match window {
            None => self.slots.clone(),
            Some(w) => self.slots.iter().filter_map(|s| s.intersection(w)).collect(),
        }
    }

    fn containing(&self, time_ms: i64) -> Option<&TimeSlot> {
        // Slots are sorted and disjoint: the candidate is the last one starting at or before t.
        let idx = self.slots.partition_point(|s| s.start_ms <= time_ms);
        idx.checked_sub(1)
            .map(|i| &self.slots[i])
            .filter(|s| s.contains(time_ms))
    }
}

impl TryFrom<Vec<TimeSlot>> for Availability {
    type Error = RequestError;

    fn try_from(slots: Vec<TimeSlot>) -> Result<Self, Self::Error> {
        Self::new(slots)
    }
}

impl From<Availability> for Vec<TimeSlot> {
    fn from(availability: Availability) -> Self {
        availability.slots
    }
}

/// Rounds `time_ms` up to the next multiple of `granularity_ms` (epoch-anchored).
/// `None` when that multiple is past `i64::MAX`.
pub(crate) fn align_up(time_ms: i64, granularity_ms: i64) -> Option<i64> {
    let rem = time_ms.rem_euclid(granularity_ms);
    if rem == 0 {
        Some(time_ms)
    } else {
        time_ms.checked_add(granularity_ms - rem)
    }
}
