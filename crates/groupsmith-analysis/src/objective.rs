//! Solver-independent objective re-derivation.
//!
//! Replays the exact integer arithmetic of the soft-constraint builders
//! against a concrete assignment. For the solver's own assignment the total
//! equals the solver-reported objective value bit for bit; that parity is
//! the contract that makes offline what-if scoring trustworthy.

use std::collections::HashMap;

use serde::Serialize;

use groupsmith_config::{CapacityMode, Settings};
use groupsmith_core::{Assignment, Person, PersonId, RankComparator};
use groupsmith_model::scoring;
use groupsmith_model::ModelInputs;

use crate::analysis::request_satisfied;

/// The recomputed objective, split by term family.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ObjectiveBreakdown {
    /// Σ weights of satisfied possible requests.
    pub request_score: i64,
    /// Σ cohort-flow fit bonuses.
    pub cohort_fit_bonus: i64,
    /// Σ progression rewards.
    pub progression_bonus: i64,
    /// Σ regression penalties.
    pub regression_penalty: i64,
    /// Σ tiered overflow penalties beyond the unavoidable exemption.
    pub overflow_penalty: i64,
    /// Σ at-least-one-request penalties.
    pub none_satisfied_penalty: i64,
}

impl ObjectiveBreakdown {
    /// The composed objective: rewards minus penalties.
    pub fn total(&self) -> i64 {
        self.request_score + self.cohort_fit_bonus + self.progression_bonus
            - self.regression_penalty
            - self.overflow_penalty
            - self.none_satisfied_penalty
    }
}

/// Recomputes every objective family from the assignment.
pub fn recompute_objective(
    inputs: ModelInputs<'_>,
    settings: &Settings,
    assignment: &Assignment,
) -> ObjectiveBreakdown {
    let persons = scoring::sorted_persons(inputs.persons);
    let groups = scoring::sorted_groups(inputs.groups);
    let persons_by_id: HashMap<&PersonId, &Person> =
        persons.iter().map(|p| (&p.id, *p)).collect();
    let classes = scoring::classify_requests(&persons, inputs.requests, settings);
    let ranks = RankComparator::new(
        settings.named_levels.clone(),
        settings.wildcard_marker.clone(),
    );

    let mut breakdown = ObjectiveBreakdown::default();

    // Request satisfaction, with diminished weights.
    let satisfied: Vec<bool> = inputs
        .requests
        .iter()
        .map(|r| request_satisfied(r, assignment, &persons_by_id))
        .collect();
    for (idx, class) in classes.iter().enumerate() {
        if class.possible && satisfied[idx] {
            breakdown.request_score += class.weight;
        }
    }

    // Cohort-flow fit for the group each person actually landed in.
    let plan = scoring::cohort_flow(&persons, &groups, &ranks, settings);
    for bucket in &plan {
        for &p in &bucket.persons {
            let Some(group_id) = assignment.group_of(&persons[p].id) else {
                continue;
            };
            for (slot, &g) in bucket.groups.iter().enumerate() {
                if &groups[g].id == group_id {
                    breakdown.cohort_fit_bonus += scoring::cohort_fit_coef(
                        persons[p].cohort_level,
                        bucket.targets[slot],
                        bucket.range,
                        settings.cohort_fit_scale,
                    );
                }
            }
        }
    }

    // Progression against the latest prior period.
    let latest = scoring::latest_history(inputs.history);
    for (person_id, record) in latest {
        let Some(group_id) = assignment.group_of(person_id) else {
            continue;
        };
        let Some(prior) = ranks.rank(&record.prior_group_name) else {
            continue;
        };
        let group = groups.iter().find(|g| &g.id == group_id);
        let Some(rank) = group.and_then(|g| ranks.rank(&g.name)) else {
            continue;
        };
        if rank < prior {
            breakdown.regression_penalty += settings.regression_penalty;
        } else if rank > prior {
            breakdown.progression_bonus += settings.progression_bonus;
        }
    }

    // Tiered overflow beyond the unavoidable exemption, per bucket.
    if settings.capacity_mode == CapacityMode::Soft {
        for bucket in scoring::overflow_buckets(&persons, &groups, settings) {
            let mut total_overflow = 0;
            for &g in &bucket.groups {
                let standard = i64::from(groups[g].capacity).min(settings.capacity_max);
                let occupancy = assignment.occupancy(&groups[g].id) as i64;
                total_overflow += (occupancy - standard).max(0);
            }
            let penalised = (total_overflow - bucket.exempt).max(0);
            breakdown.overflow_penalty +=
                scoring::overflow_penalty(penalised, settings.overflow_penalties);
        }
    }

    // At-least-one-request penalties, under the same aggregation policy the
    // builders used.
    for person in &persons {
        let agg = scoring::aggregation_for(&person.id, inputs.requests, &classes, settings);
        if !agg.is_active() {
            continue;
        }
        let any = agg.members.iter().any(|idx| satisfied[*idx]);
        if agg.forced_penalty || !any {
            breakdown.none_satisfied_penalty += settings.none_satisfied_penalty;
        }
    }

    breakdown
}
