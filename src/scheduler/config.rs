//! Scheduler configuration.
//!
//! Everything a run depends on is passed in explicitly; there are no
//! global defaults for granularity, budget, or tie-breaking.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::models::MINUTE_MS;

/// How candidates with equal soft score are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Candidate generation order: earlier start first, then entity
    /// registration order.
    #[default]
    Earliest,
    /// Reverse generation order.
    Latest,
    /// Shuffled by an RNG seeded with this value. Reproducible for a seed.
    Seeded(u64),
}

/// Order in which activities are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOrder {
    /// Fewest feasible placements first (minimum remaining values), ties by
    /// submission order.
    #[default]
    FewestCandidates,
    /// Submission order.
    Submission,
}

/// Per-run scheduler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Candidate start times are multiples of this (ms, epoch-anchored).
    pub slot_granularity_ms: i64,
    /// Maximum candidate commits before the run gives up. Every commit
    /// counts, not only those undone by backtracking: a run placing `n`
    /// activities takes at least `n` steps, so a budget of 1 only suffices
    /// for a single activity.
    pub max_search_steps: u64,
    /// Maximum placements generated for one activity before the run gives
    /// up. Bounds enumeration for requirements with many combinations.
    pub max_candidates_per_activity: u64,
    /// Ordering of equally scored candidates.
    pub tie_break: TieBreakPolicy,
    /// Ordering of activities.
    pub activity_order: ActivityOrder,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slot_granularity_ms: 15 * MINUTE_MS,
            max_search_steps: 100_000,
            max_candidates_per_activity: 100_000,
            tie_break: TieBreakPolicy::Earliest,
            activity_order: ActivityOrder::FewestCandidates,
        }
    }
}

impl SchedulerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slot granularity.
    pub fn with_granularity(mut self, granularity_ms: i64) -> Self {
        self.slot_granularity_ms = granularity_ms;
        self
    }

    /// Sets the search-step budget.
    pub fn with_max_steps(mut self, max_search_steps: u64) -> Self {
        self.max_search_steps = max_search_steps;
        self
    }

    /// Sets the per-activity candidate limit.
    pub fn with_max_candidates(mut self, max_candidates_per_activity: u64) -> Self {
        self.max_candidates_per_activity = max_candidates_per_activity;
        self
    }

    /// Sets the tie-break policy.
    pub fn with_tie_break(mut self, tie_break: TieBreakPolicy) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Sets the activity order.
    pub fn with_activity_order(mut self, order: ActivityOrder) -> Self {
        self.activity_order = order;
        self
    }

    /// Parses a JSON configuration; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| RequestError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are usable.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.slot_granularity_ms <= 0 {
            return Err(RequestError::InvalidConfig(format!(
                "slot_granularity_ms must be positive, got {}",
                self.slot_granularity_ms
            )));
        }
        if self.max_search_steps == 0 {
            return Err(RequestError::InvalidConfig(
                "max_search_steps must be at least 1".to_string(),
            ));
        }
        if self.max_candidates_per_activity == 0 {
            return Err(RequestError::InvalidConfig(
                "max_candidates_per_activity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.slot_granularity_ms, 900_000);
        assert_eq!(config.max_search_steps, 100_000);
        assert_eq!(config.max_candidates_per_activity, 100_000);
        assert_eq!(config.tie_break, TieBreakPolicy::Earliest);
        assert_eq!(config.activity_order, ActivityOrder::FewestCandidates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfig::new()
            .with_granularity(MINUTE_MS)
            .with_max_steps(10)
            .with_max_candidates(50)
            .with_tie_break(TieBreakPolicy::Seeded(7))
            .with_activity_order(ActivityOrder::Submission);
        assert_eq!(config.slot_granularity_ms, MINUTE_MS);
        assert_eq!(config.max_search_steps, 10);
        assert_eq!(config.max_candidates_per_activity, 50);
        assert_eq!(config.tie_break, TieBreakPolicy::Seeded(7));
        assert_eq!(config.activity_order, ActivityOrder::Submission);
    }

    #[test]
    fn test_invalid_values() {
        assert!(SchedulerConfig::new().with_granularity(0).validate().is_err());
        assert!(SchedulerConfig::new().with_max_steps(0).validate().is_err());
        assert!(SchedulerConfig::new().with_max_candidates(0).validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            SchedulerConfig::from_json(r#"{"max_search_steps": 5, "tie_break": {"seeded": 3}}"#)
                .unwrap();
        assert_eq!(config.max_search_steps, 5);
        assert_eq!(config.tie_break, TieBreakPolicy::Seeded(3));
        assert_eq!(config.slot_granularity_ms, 900_000);

        assert!(matches!(
            SchedulerConfig::from_json(r#"{"slot_granularity_ms": -1}"#),
            Err(RequestError::InvalidConfig(_))
        ));
        assert!(matches!(
            SchedulerConfig::from_json("not json"),
            Err(RequestError::Malformed(_))
        ));
    }
}
