//! Schedule quality metrics (KPIs).
//!
//! Computes summary indicators from a finalized schedule and the registry it
//! was generated against.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Assignment count | Activities placed |
//! | Makespan | Latest end time |
//! | Total score | Sum of soft scores at commit time |
//! | Utilization | Booked time / available time, per entity |
//! | Avg Utilization | Mean over entities with any availability |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Schedule;
use crate::registry::EntityRegistry;

/// Schedule performance indicators.
///
/// All time values are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Number of assignments.
    pub assignment_count: usize,
    /// Latest end time (ms).
    pub makespan_ms: i64,
    /// Sum of soft scores.
    pub total_score: f64,
    /// Average entity utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-entity utilization. Entities that are never available are omitted.
    pub utilization_by_entity: BTreeMap<String, f64>,
}

impl ScheduleKpi {
    /// Computes KPIs for `schedule` over the entities in `registry`.
    pub fn calculate(schedule: &Schedule, registry: &EntityRegistry) -> Self {
        let mut utilization_by_entity = BTreeMap::new();
        for entity in registry.iter() {
            let available = entity.availability.total_ms();
            if available == 0 {
                continue;
            }
            let busy: i64 = schedule
                .assignments_for_entity(&entity.id)
                .map(|a| a.slot.duration_ms())
                .sum();
            utilization_by_entity.insert(entity.id.clone(), busy as f64 / available as f64);
        }

        let avg_utilization = if utilization_by_entity.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_entity.values().sum();
            sum / utilization_by_entity.len() as f64
        };

        Self {
            assignment_count: schedule.len(),
            makespan_ms: schedule.makespan_ms(),
            total_score: schedule.total_score(),
            avg_utilization,
            utilization_by_entity,
        }
    }

    /// Whether average utilization reaches `min_utilization`.
    pub fn meets_utilization(&self, min_utilization: f64) -> bool {
        self.avg_utilization >= min_utilization
    }
}
