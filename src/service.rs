//! Request/response boundary for schedule generation.
//!
//! A transport layer hands in a [`GenerateRequest`] (typed or as JSON) and
//! gets back either a [`GenerateResponse`] or an [`ErrorResponse`]. The only
//! outward call is to an [`Authorizer`], asked whether the caller may
//! generate for the request's scope. Token handling, persistence, and HTTP
//! live outside this crate.
//!
//! Each request gets its own registry snapshot, so independent requests can
//! run on separate threads without sharing mutable state.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{InfeasibleReason, RequestError, ScheduleError};
use crate::models::{Activity, ConstraintSet, Schedule};
use crate::registry::{EntityRegistry, RegistrySnapshot};
use crate::scheduler::{CancellationToken, ScheduleKpi, Scheduler, SchedulerConfig, SearchStats};

/// Decides whether generation may run for a registry scope.
pub trait Authorizer: Send + Sync {
    /// Whether the caller may generate schedules for `scope`.
    fn may_generate(&self, scope: &str) -> bool;
}

/// Authorizes every scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn may_generate(&self, _scope: &str) -> bool {
        true
    }
}

impl<F> Authorizer for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn may_generate(&self, scope: &str) -> bool {
        self(scope)
    }
}

/// One generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Registry scope checked by the authorizer.
    pub scope: String,
    /// Entities to schedule onto.
    pub entities: EntityRegistry,
    /// Constraints; the standard hard set when absent.
    #[serde(default)]
    pub constraints: Option<ConstraintSet>,
    /// Activities to place.
    pub activities: Vec<Activity>,
    /// Scheduler settings.
    #[serde(default)]
    pub config: SchedulerConfig,
}

impl GenerateRequest {
    /// Creates a request with standard constraints and default settings.
    pub fn new(scope: impl Into<String>, entities: EntityRegistry, activities: Vec<Activity>) -> Self {
        Self {
            scope: scope.into(),
            entities,
            constraints: None,
            activities,
            config: SchedulerConfig::default(),
        }
    }

    /// Sets the constraint set.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Sets the scheduler configuration.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses a JSON request.
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        serde_json::from_str(body).map_err(|e| RequestError::Malformed(e.to_string()))
    }
}

/// Successful generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The finalized schedule.
    pub schedule: Schedule,
    /// Search counters.
    pub stats: SearchStats,
    /// Quality metrics.
    pub kpi: ScheduleKpi,
}

/// Stable error category for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    Infeasible,
    Internal,
    Unauthorized,
    Cancelled,
}

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Whether the same request may succeed if retried (with a larger budget,
    /// or without cancellation).
    pub retryable: bool,
}

impl From<&ScheduleError> for ErrorResponse {
    fn from(err: &ScheduleError) -> Self {
        let (kind, retryable) = match err {
            ScheduleError::InvalidRequest(_) => (ErrorKind::InvalidRequest, false),
            ScheduleError::Infeasible(InfeasibleReason::BudgetExhausted { .. }) => {
                (ErrorKind::Infeasible, true)
            }
            ScheduleError::Infeasible(_) => (ErrorKind::Infeasible, false),
            ScheduleError::InvariantViolation { .. } => (ErrorKind::Internal, false),
            ScheduleError::Unauthorized { .. } => (ErrorKind::Unauthorized, false),
            ScheduleError::Cancelled => (ErrorKind::Cancelled, true),
        };
        Self {
            kind,
            message: err.to_string(),
            retryable,
        }
    }
}

impl From<ScheduleError> for ErrorResponse {
    fn from(err: ScheduleError) -> Self {
        Self::from(&err)
    }
}

/// Entry point for generation requests.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGenerator<A = AllowAll> {
    authorizer: A,
}

impl<A: Authorizer> ScheduleGenerator<A> {
    /// Creates a generator that consults `authorizer`.
    pub fn new(authorizer: A) -> Self {
        Self { authorizer }
    }

    /// Runs one request.
    pub fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ScheduleError> {
        self.run(request, None)
    }

    /// Runs one request, stopping between placements once `token` fires.
    pub fn generate_cancellable(
        &self,
        request: &GenerateRequest,
        token: CancellationToken,
    ) -> Result<GenerateResponse, ScheduleError> {
        self.run(request, Some(token))
    }

    /// Runs independent requests on scoped threads. Results keep input order.
    pub fn generate_all(
        &self,
        requests: &[GenerateRequest],
    ) -> Vec<Result<GenerateResponse, ScheduleError>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| scope.spawn(move || self.generate(request)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// JSON in, JSON out.
    pub fn handle_json(&self, body: &str) -> Result<String, ErrorResponse> {
        let request = GenerateRequest::from_json(body)
            .map_err(|e| ErrorResponse::from(ScheduleError::from(e)))?;
        let response = self.generate(&request).map_err(ErrorResponse::from)?;
        serde_json::to_string(&response).map_err(|e| ErrorResponse {
            kind: ErrorKind::Internal,
            message: e.to_string(),
            retryable: false,
        })
    }

    fn run(
        &self,
        request: &GenerateRequest,
        token: Option<CancellationToken>,
    ) -> Result<GenerateResponse, ScheduleError> {
        if !self.authorizer.may_generate(&request.scope) {
            warn!(scope = %request.scope, "generation not authorized");
            return Err(ScheduleError::Unauthorized {
                scope: request.scope.clone(),
            });
        }

        let snapshot = RegistrySnapshot::from(request.entities.clone());
        let constraints = request
            .constraints
            .clone()
            .unwrap_or_else(ConstraintSet::standard);

        let mut scheduler =
            Scheduler::new(&snapshot, &constraints).with_config(request.config.clone());
        if let Some(token) = token {
            scheduler = scheduler.with_cancellation(token);
        }
        let schedule = scheduler.run(&request.activities)?;
        let stats = scheduler.stats().clone();
        debug!(scope = %request.scope, assignments = schedule.len(), "request served");

        let kpi = ScheduleKpi::calculate(&schedule, &snapshot);
        Ok(GenerateResponse {
            schedule,
            stats,
            kpi,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityKind, TimeSlot, HOUR_MS};

    fn entities(rooms: &[&str]) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for id in rooms {
            registry
                .register(
                    Entity::room(*id)
                        .available(vec![TimeSlot::new(9 * HOUR_MS, 17 * HOUR_MS)])
                        .unwrap(),
                )
                .unwrap();
        }
        registry
    }

    fn meetings(n: usize) -> Vec<Activity> {
        (1..=n)
            .map(|i| Activity::new(format!("A{i}"), HOUR_MS).requires(EntityKind::Room, 1))
            .collect()
    }

    #[test]
    fn test_generate() {
        let generator = ScheduleGenerator::new(AllowAll);
        let request = GenerateRequest::new("campus", entities(&["R1"]), meetings(2));

        let response = generator.generate(&request).unwrap();
        assert_eq!(response.schedule.len(), 2);
        assert_eq!(response.stats.steps, 2);
        assert_eq!(response.kpi.assignment_count, 2);
        assert!((response.kpi.utilization_by_entity["R1"] - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_unauthorized_scope() {
        let generator = ScheduleGenerator::new(|scope: &str| scope == "campus");
        let request = GenerateRequest::new("other", entities(&["R1"]), meetings(1));

        let err = generator.generate(&request).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::Unauthorized {
                scope: "other".into()
            }
        );
        let payload = ErrorResponse::from(&err);
        assert_eq!(payload.kind, ErrorKind::Unauthorized);
        assert!(!payload.retryable);
    }

    #[test]
    fn test_error_kinds() {
        let budget = ErrorResponse::from(ScheduleError::Infeasible(
            InfeasibleReason::BudgetExhausted { steps: 5 },
        ));
        assert_eq!(budget.kind, ErrorKind::Infeasible);
        assert!(budget.retryable);

        let fault = ErrorResponse::from(ScheduleError::InvariantViolation {
            entity_id: "R1".into(),
            message: "overlap".into(),
        });
        assert_eq!(fault.kind, ErrorKind::Internal);

        let cancelled = ErrorResponse::from(ScheduleError::Cancelled);
        assert_eq!(cancelled.kind, ErrorKind::Cancelled);
        assert!(cancelled.retryable);

        let json = serde_json::to_string(&cancelled).unwrap();
        assert!(json.contains(r#""kind":"cancelled""#));
    }

    #[test]
    fn test_cancellable() {
        let generator = ScheduleGenerator::new(AllowAll);
        let request = GenerateRequest::new("campus", entities(&["R1"]), meetings(1));
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            generator.generate_cancellable(&request, token),
            Err(ScheduleError::Cancelled)
        );
    }

    #[test]
    fn test_handle_json() {
        let generator = ScheduleGenerator::new(AllowAll);
        let body = r#"{
            "scope": "campus",
            "entities": [
                {"id": "R1", "kind": "room", "availability": [{"start_ms": 0, "end_ms": 7200000}]}
            ],
            "activities": [
                {"id": "A1", "duration_ms": 3600000, "requirements": [{"kind": "room"}]}
            ],
            "config": {"slot_granularity_ms": 3600000}
        }"#;

        let out = generator.handle_json(body).unwrap();
        let response: GenerateResponse = serde_json::from_str(&out).unwrap();
        let a1 = response.schedule.assignment_for_activity("A1").unwrap();
        assert_eq!(a1.slot, TimeSlot::new(0, HOUR_MS));
    }

    #[test]
    fn test_handle_json_errors() {
        let generator = ScheduleGenerator::new(AllowAll);
        let malformed = generator.handle_json("{").unwrap_err();
        assert_eq!(malformed.kind, ErrorKind::InvalidRequest);

        let infeasible = r#"{
            "scope": "campus",
            "entities": [{"id": "R1", "kind": "room"}],
            "activities": [{"id": "A1", "duration_ms": 3600000, "requirements": [{"kind": "room"}]}]
        }"#;
        let err = generator.handle_json(infeasible).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Infeasible);
        assert!(!err.retryable);
    }

    #[test]
    fn test_generate_all_keeps_order() {
        let generator = ScheduleGenerator::new(AllowAll);
        let requests = vec![
            GenerateRequest::new("a", entities(&["R1"]), meetings(3)),
            GenerateRequest::new("b", entities(&["R1"]), meetings(9))
                .with_config(SchedulerConfig::new().with_max_steps(1_000)),
            GenerateRequest::new("c", entities(&["R1", "R2"]), meetings(4)),
        ];

        let results = generator.generate_all(&requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().schedule.len(), 3);
        assert!(results[1].as_ref().unwrap_err().is_infeasible());
        assert_eq!(results[2].as_ref().unwrap().schedule.len(), 4);

        for (request, result) in requests.iter().zip(&results).filter(|(_, r)| r.is_ok()) {
            let again = generator.generate(request).unwrap();
            assert_eq!(result.as_ref().unwrap().schedule, again.schedule);
        }
    }
}
