//! Backtracking assignment search.
//!
//! # Algorithm
//!
//! 1. Validate the request and configuration.
//! 2. For each activity, lay out the start times on the epoch-anchored
//!    granularity grid inside some eligible entity's availability (clipped to
//!    the activity window) where every requirement has enough free entities,
//!    and count the entity combinations this allows.
//! 3. Order activities by fewest combinations first (MRV), ties by
//!    submission order.
//! 4. Depth-first: the first time a depth is reached, build its activity's
//!    candidates (bounded by `max_candidates_per_activity`) and drop those
//!    failing a hard constraint on the empty schedule. Rank the candidates
//!    that pass conflict detection and hard constraints by soft score (ties
//!    per [`TieBreakPolicy`]); commit the best, descend. When a depth runs
//!    out of candidates, undo the previous commit and try its next-ranked
//!    candidate.
//! 5. Every commit is one search step; exceeding the budget stops the run.
//!
//! The search is iterative (an explicit frame stack), so depth is bounded by
//! the number of activities, not the call stack.
//!
//! # Reference
//! Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach",
//! Ch. 6.3: Backtracking Search for CSPs

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use super::{ActivityOrder, CancellationToken, SchedulerConfig, TieBreakPolicy};
use crate::conflict::ConflictDetector;
use crate::error::{InfeasibleReason, RequestError, ScheduleError};
use crate::models::{
    align_up, Activity, Assignment, Candidate, ConstraintSet, Entity, EntityRequirement, Schedule,
    TimeSlot,
};
use crate::registry::{EntityRegistry, RegistrySnapshot};
use crate::validation::validate_request;

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// `run` not called yet, or the request was rejected before searching.
    Unstarted,
    /// Searching.
    InProgress,
    /// A schedule was produced.
    Complete,
    /// No schedule exists, or the budget ran out.
    Infeasible,
    /// Cancelled between placements.
    Cancelled,
    /// The produced schedule failed its post-run validation.
    Faulted,
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Candidate commits.
    pub steps: u64,
    /// Commits undone.
    pub backtracks: u64,
    /// Deepest number of simultaneously placed activities.
    pub max_depth: usize,
    /// Candidates checked against the in-progress schedule.
    pub candidates_evaluated: u64,
}

struct Placement<'r> {
    candidate: Candidate<'r>,
    score: f64,
}

/// Ranked placements for one depth, and the next one to try.
struct Frame<'r> {
    ranked: Vec<Placement<'r>>,
    next: usize,
}

/// Backtracking scheduler for one generation run.
///
/// Reads a registry snapshot and a constraint set; both stay untouched. A
/// scheduler value runs once.
///
/// # Example
///
/// ```
/// use u_slot::models::{Activity, ConstraintSet, Entity, EntityKind, TimeSlot, HOUR_MS};
/// use u_slot::registry::EntityRegistry;
/// use u_slot::scheduler::Scheduler;
///
/// let mut registry = EntityRegistry::new();
/// registry
///     .register(Entity::room("R1").available(vec![TimeSlot::new(9 * HOUR_MS, 17 * HOUR_MS)]).unwrap())
///     .unwrap();
/// let snapshot = registry.snapshot();
/// let constraints = ConstraintSet::standard();
///
/// let activities = vec![
///     Activity::new("A1", HOUR_MS).requires(EntityKind::Room, 1),
///     Activity::new("A2", HOUR_MS).requires(EntityKind::Room, 1),
/// ];
/// let schedule = Scheduler::new(&snapshot, &constraints).run(&activities).unwrap();
/// assert_eq!(
///     schedule.assignment_for_activity("A2").unwrap().slot,
///     TimeSlot::new(10 * HOUR_MS, 11 * HOUR_MS)
/// );
/// ```
#[derive(Debug)]
pub struct Scheduler<'a> {
    registry: &'a RegistrySnapshot,
    constraints: &'a ConstraintSet,
    config: SchedulerConfig,
    cancellation: Option<CancellationToken>,
    state: SearchState,
    stats: SearchStats,
}

impl<'a> Scheduler<'a> {
    /// Creates a scheduler with the default configuration.
    pub fn new(registry: &'a RegistrySnapshot, constraints: &'a ConstraintSet) -> Self {
        Self {
            registry,
            constraints,
            config: SchedulerConfig::default(),
            cancellation: None,
            state: SearchState::Unstarted,
            stats: SearchStats::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Counters from the run so far.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Configuration in use.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Places every activity, or explains why it cannot.
    ///
    /// # Errors
    /// - `InvalidRequest` for bad configuration or activities, and for a
    ///   second call on the same scheduler (`AlreadyRun`).
    /// - `Infeasible(NoCandidates)` when some activity cannot be placed.
    /// - `Infeasible(BudgetExhausted)` when `max_search_steps` runs out.
    /// - `Cancelled` when the token fires between placements.
    /// - `InvariantViolation` if the result fails post-run validation.
    pub fn run(&mut self, activities: &[Activity]) -> Result<Schedule, ScheduleError> {
        if self.state != SearchState::Unstarted {
            return Err(RequestError::AlreadyRun.into());
        }
        self.config.validate()?;
        validate_request(self.registry, activities)?;

        info!(
            activities = activities.len(),
            entities = self.registry.len(),
            constraints = self.constraints.len(),
            "schedule generation started"
        );
        self.state = SearchState::InProgress;

        let result = self
            .search(activities)
            .and_then(|schedule| self.post_check(schedule));

        self.state = match &result {
            Ok(_) => SearchState::Complete,
            Err(ScheduleError::Cancelled) => SearchState::Cancelled,
            Err(e) if e.is_internal() => SearchState::Faulted,
            Err(_) => SearchState::Infeasible,
        };
        info!(
            state = ?self.state,
            steps = self.stats.steps,
            backtracks = self.stats.backtracks,
            "schedule generation finished"
        );
        result
    }

    fn search(&mut self, activities: &[Activity]) -> Result<Schedule, ScheduleError> {
        let registry: &EntityRegistry = self.registry;
        let constraints = self.constraints;
        let granularity = self.config.slot_granularity_ms;
        let budget = self.config.max_search_steps;
        let tie_break = self.config.tie_break;
        let mut schedule = Schedule::new();

        let layouts: Vec<Layout<'_>> = activities
            .iter()
            .map(|activity| Layout::new(registry, activity, granularity))
            .collect();
        for layout in &layouts {
            if layout.estimate == 0 {
                warn!(activity = %layout.activity.id, "activity has no candidate placement");
                return Err(ScheduleError::Infeasible(InfeasibleReason::NoCandidates {
                    activity_id: layout.activity.id.clone(),
                }));
            }
            debug!(
                activity = %layout.activity.id,
                starts = layout.starts.len(),
                estimate = layout.estimate,
                "placements laid out"
            );
        }

        let mut order: Vec<usize> = (0..activities.len()).collect();
        if self.config.activity_order == ActivityOrder::FewestCandidates {
            // Stable: equal counts keep submission order.
            order.sort_by_key(|&i| layouts[i].estimate);
        }

        // Filled the first time a depth reaches the activity, reused on backtrack.
        let mut pools: Vec<Option<Vec<Candidate<'_>>>> = activities.iter().map(|_| None).collect();
        let mut frames: Vec<Frame<'_>> = Vec::with_capacity(order.len());
        let mut dead_end: Option<&str> = None;

        while schedule.len() < order.len() {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                warn!(placed = schedule.len(), "schedule generation cancelled");
                return Err(ScheduleError::Cancelled);
            }

            let depth = schedule.len();
            if frames.len() == depth {
                let index = order[depth];
                if pools[index].is_none() {
                    pools[index] = Some(self.expand(&layouts[index])?);
                }
                let pool = pools[index].as_deref().unwrap_or_default();
                let ranked = rank(pool, &schedule, constraints, tie_break, &mut self.stats);
                if ranked.is_empty() {
                    dead_end = Some(activities[index].id.as_str());
                }
                frames.push(Frame { ranked, next: 0 });
            }

            let frame = &mut frames[depth];
            if let Some(placement) = frame.ranked.get(frame.next) {
                frame.next += 1;
                if self.stats.steps >= budget {
                    warn!(steps = self.stats.steps, placed = depth, "search budget exhausted");
                    return Err(ScheduleError::Infeasible(InfeasibleReason::BudgetExhausted {
                        steps: self.stats.steps,
                    }));
                }
                self.stats.steps += 1;

                let candidate = &placement.candidate;
                trace!(
                    activity = %candidate.activity.id,
                    slot = %candidate.slot,
                    score = placement.score,
                    "commit"
                );
                schedule.commit(
                    Assignment::new(
                        candidate.activity.id.clone(),
                        candidate.slot,
                        candidate.entity_ids(),
                    )
                    .with_score(placement.score),
                );
                self.stats.max_depth = self.stats.max_depth.max(depth + 1);
            } else {
                frames.pop();
                match schedule.undo() {
                    Some(undone) => {
                        self.stats.backtracks += 1;
                        debug!(activity = %undone.activity_id, depth, "backtrack");
                    }
                    None => {
                        let activity_id = dead_end
                            .unwrap_or(activities[order[0]].id.as_str())
                            .to_string();
                        warn!(activity = %activity_id, "search space exhausted");
                        return Err(ScheduleError::Infeasible(InfeasibleReason::NoCandidates {
                            activity_id,
                        }));
                    }
                }
            }
        }

        Ok(schedule)
    }

    /// Candidates of one activity that pass the hard constraints on an empty
    /// schedule. A candidate failing there fails against any schedule, so an
    /// empty pool ends the run.
    fn expand<'r>(&self, layout: &Layout<'r>) -> Result<Vec<Candidate<'r>>, ScheduleError> {
        let limit = self.config.max_candidates_per_activity;
        let Some(generated) = enumerate(layout, limit) else {
            warn!(activity = %layout.activity.id, limit, "candidate limit exceeded");
            return Err(ScheduleError::Infeasible(InfeasibleReason::BudgetExhausted {
                steps: self.stats.steps,
            }));
        };

        let empty = Schedule::new();
        let pool: Vec<Candidate<'r>> = generated
            .into_iter()
            .filter(|c| self.constraints.evaluate_hard(c, &empty).is_satisfied())
            .collect();
        if pool.is_empty() {
            warn!(activity = %layout.activity.id, "activity has no candidate placement");
            return Err(ScheduleError::Infeasible(InfeasibleReason::NoCandidates {
                activity_id: layout.activity.id.clone(),
            }));
        }
        debug!(activity = %layout.activity.id, candidates = pool.len(), "candidates enumerated");
        Ok(pool)
    }

    fn post_check(&self, schedule: Schedule) -> Result<Schedule, ScheduleError> {
        if let Err(e) = schedule.validate_against(self.registry) {
            error!(error = %e, "generated schedule failed validation");
            return Err(e);
        }
        Ok(schedule)
    }
}

/// Entities that may fill a merged requirement, and how many it takes.
type Group<'r> = (usize, Vec<&'r Entity>);

/// Where an activity can go, before any entity combination is built.
struct Layout<'r> {
    activity: &'r Activity,
    /// Grid starts at which every group has enough available entities, with
    /// the available entities per group.
    starts: Vec<(TimeSlot, Vec<Group<'r>>)>,
    /// Upper bound on the number of candidates; saturates at `u64::MAX`.
    estimate: u64,
}

impl<'r> Layout<'r> {
    fn new(registry: &'r EntityRegistry, activity: &'r Activity, granularity_ms: i64) -> Self {
        let groups = requirement_groups(registry, activity);

        let mut grid = BTreeSet::new();
        for entity in groups.iter().flat_map(|(_, eligible)| eligible) {
            for free in entity.availability.clipped_to(activity.window.as_ref()) {
                let mut next = align_up(free.start_ms, granularity_ms);
                while let Some(t) = next {
                    match t.checked_add(activity.duration_ms) {
                        Some(end) if end <= free.end_ms => {
                            grid.insert(t);
                        }
                        _ => break,
                    }
                    next = t.checked_add(granularity_ms);
                }
            }
        }

        let mut starts = Vec::new();
        let mut estimate = 0u64;
        for start in grid {
            let slot = TimeSlot::starting_at(start, activity.duration_ms);
            let free: Vec<Group<'r>> = groups
                .iter()
                .map(|(count, eligible)| {
                    let available: Vec<&'r Entity> = eligible
                        .iter()
                        .copied()
                        .filter(|e| e.is_available_for(&slot))
                        .collect();
                    (*count, available)
                })
                .collect();
            if free.iter().any(|(count, pool)| pool.len() < *count) {
                continue;
            }
            let combos = free
                .iter()
                .fold(1u64, |acc, (count, pool)| acc.saturating_mul(binomial(pool.len(), *count)));
            estimate = estimate.saturating_add(combos);
            starts.push((slot, free));
        }

        Self {
            activity,
            starts,
            estimate,
        }
    }
}

/// Requirements with the same kind and the same candidate list are
/// interchangeable, so they are merged into one group and picked together.
fn requirement_groups<'r>(registry: &'r EntityRegistry, activity: &'r Activity) -> Vec<Group<'r>> {
    let mut merged: Vec<(&EntityRequirement, Group<'r>)> = Vec::new();
    for req in activity.requirements.iter().filter(|req| req.count > 0) {
        let existing = merged
            .iter_mut()
            .find(|(seen, _)| interchangeable(seen, req));
        if let Some((_, (count, _))) = existing {
            *count += req.count as usize;
            continue;
        }
        let eligible: Vec<&'r Entity> = registry
            .of_kind(&req.kind)
            .filter(|e| req.accepts(&e.id))
            .collect();
        merged.push((req, (req.count as usize, eligible)));
    }
    merged.into_iter().map(|(_, group)| group).collect()
}

fn interchangeable(a: &EntityRequirement, b: &EntityRequirement) -> bool {
    a.kind == b.kind
        && a.candidates.iter().collect::<BTreeSet<_>>() == b.candidates.iter().collect::<BTreeSet<_>>()
}

/// `n` choose `k`, saturating.
fn binomial(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
        if acc > u128::from(u64::MAX) {
            return u64::MAX;
        }
    }
    acc as u64
}

/// Every placement of the layout's activity, in generation order: start time
/// ascending, then entity combinations in registration order. Within a group
/// entities are picked in registration order, and entity sets already seen at
/// the same start are skipped. `None` once more than `limit` combinations
/// have been generated.
fn enumerate<'r>(layout: &Layout<'r>, limit: u64) -> Option<Vec<Candidate<'r>>> {
    let mut out = Vec::new();
    let mut generated = 0u64;
    for (slot, free) in &layout.starts {
        let mut seen: BTreeSet<Vec<&'r str>> = BTreeSet::new();
        let mut chosen = Vec::new();
        let flow = combine(free, 0, 0, 0, &mut chosen, &mut |entities| {
            generated += 1;
            if generated > limit {
                return ControlFlow::Break(());
            }
            let mut key: Vec<&'r str> = entities.iter().map(|&e| e.id.as_str()).collect();
            key.sort_unstable();
            if seen.insert(key) {
                out.push(Candidate::new(layout.activity, *slot, entities.to_vec()));
            }
            ControlFlow::Continue(())
        });
        if flow.is_break() {
            return None;
        }
    }
    Some(out)
}

/// Emits every way to pick `count` distinct entities per group, with no
/// entity used by two groups. Stops early when `emit` breaks.
fn combine<'r, F>(
    groups: &[Group<'r>],
    group: usize,
    from: usize,
    picked: usize,
    chosen: &mut Vec<&'r Entity>,
    emit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&[&'r Entity]) -> ControlFlow<()>,
{
    let Some((count, pool)) = groups.get(group) else {
        return emit(chosen);
    };
    if picked == *count {
        return combine(groups, group + 1, 0, 0, chosen, emit);
    }
    for (i, &entity) in pool.iter().enumerate().skip(from) {
        if chosen.iter().any(|c| c.id == entity.id) {
            continue;
        }
        chosen.push(entity);
        let flow = combine(groups, group, i + 1, picked + 1, chosen, emit);
        chosen.pop();
        if flow.is_break() {
            return flow;
        }
    }
    ControlFlow::Continue(())
}

/// Feasible candidates against `schedule`, best soft score first.
fn rank<'r>(
    pool: &[Candidate<'r>],
    schedule: &Schedule,
    constraints: &ConstraintSet,
    tie_break: TieBreakPolicy,
    stats: &mut SearchStats,
) -> Vec<Placement<'r>> {
    let mut feasible = Vec::new();
    for candidate in pool {
        stats.candidates_evaluated += 1;
        if ConflictDetector::detect(candidate, schedule).is_err() {
            continue;
        }
        if !constraints.evaluate_hard(candidate, schedule).is_satisfied() {
            continue;
        }
        feasible.push(Placement {
            score: constraints.evaluate_soft(candidate, schedule),
            candidate: candidate.clone(),
        });
    }

    match tie_break {
        TieBreakPolicy::Earliest => {}
        TieBreakPolicy::Latest => feasible.reverse(),
        TieBreakPolicy::Seeded(seed) => feasible.shuffle(&mut StdRng::seed_from_u64(seed)),
    }
    // Stable: equal scores keep the tie-break order above.
    feasible.sort_by(|a, b| b.score.total_cmp(&a.score));
    feasible
}
