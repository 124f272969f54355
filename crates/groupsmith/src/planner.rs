//! The planning orchestrator.
//!
//! Validate → assemble → precheck → solve → diagnose-or-analyze → report.
//! Every solve attempt gets its own freshly built context; independent
//! partitions can be solved in parallel since no variable or constraint
//! crosses a partition boundary.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{info, warn};

use groupsmith_analysis::{analyze, AssignmentReport, SolveStats};
use groupsmith_config::Settings;
use groupsmith_core::{
    Assignment, Group, GroupsmithError, HistoricalRecord, Lock, Person, Request, Result,
};
use groupsmith_engine::BranchBoundEngine;
use groupsmith_model::{
    diagnose, hard, precheck, soft, solve_model, Diagnosis, Engine, ModelContext, ModelInputs,
    SolveParams, SolveStatus,
};

/// Outcome of a planning run. Infeasibility is not an error: it surfaces
/// as a status with a diagnosis and no report, and the caller must treat
/// it as an operation failure needing human remediation.
#[derive(Debug)]
pub struct PlanOutcome {
    pub status: SolveStatus,
    /// Present exactly when the status carries a solution.
    pub report: Option<AssignmentReport>,
    /// Present when the model was infeasible.
    pub diagnosis: Option<Diagnosis>,
}

/// Plans assignments with a configured engine.
pub struct AssignmentPlanner<E = BranchBoundEngine> {
    settings: Settings,
    engine: E,
}

impl AssignmentPlanner<BranchBoundEngine> {
    /// Creates a planner backed by the reference branch-and-bound engine.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            engine: BranchBoundEngine::new(),
        }
    }
}

impl<E: Engine> AssignmentPlanner<E> {
    /// Swaps in another engine behind the same boundary.
    pub fn with_engine<E2: Engine>(self, engine: E2) -> AssignmentPlanner<E2> {
        AssignmentPlanner {
            settings: self.settings,
            engine,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Plans the whole population in one model.
    pub fn plan(&self, inputs: ModelInputs<'_>) -> Result<PlanOutcome> {
        validate_inputs(&inputs)?;
        self.plan_validated(inputs)
    }

    /// Plans each partition as its own model, in parallel. Equivalent to
    /// [`plan`](Self::plan) because nothing crosses partitions, but scales
    /// to many sessions.
    pub fn plan_partitioned(&self, inputs: ModelInputs<'_>) -> Result<PlanOutcome> {
        validate_inputs(&inputs)?;

        let mut partitions: Vec<&str> = inputs
            .persons
            .iter()
            .map(|p| p.partition.as_str())
            .chain(inputs.groups.iter().map(|g| g.partition.as_str()))
            .collect();
        partitions.sort_unstable();
        partitions.dedup();
        if partitions.len() <= 1 {
            return self.plan_validated(inputs);
        }
        info!(partitions = partitions.len(), "solving partitions in parallel");

        let slices: Vec<PartitionSlice> = partitions
            .iter()
            .map(|partition| PartitionSlice::extract(partition, &inputs))
            .collect();
        let outcomes: Vec<Result<PlanOutcome>> = slices
            .par_iter()
            .map(|slice| self.plan_validated(slice.inputs()))
            .collect();

        let mut merged_assignment = Assignment::new();
        let mut status = SolveStatus::Optimal;
        let mut diagnosis = None;
        let mut warnings = Vec::new();
        let mut objective = 0;
        let mut wall_time = std::time::Duration::ZERO;
        let mut variables = 0;
        let mut constraints = 0;

        for outcome in outcomes {
            let outcome = outcome?;
            status = worse(status, outcome.status);
            if diagnosis.is_none() {
                diagnosis = outcome.diagnosis;
            }
            if let Some(report) = outcome.report {
                for (person, group) in report.assignment.iter() {
                    merged_assignment.place(person.clone(), group.clone());
                }
                objective += report.stats.objective;
                wall_time = wall_time.max(report.stats.wall_time);
                variables += report.stats.variables;
                constraints += report.stats.constraints;
                warnings.extend(report.warnings);
            }
        }

        if !status.has_solution() {
            return Ok(PlanOutcome {
                status,
                report: None,
                diagnosis,
            });
        }

        // Re-analyze over the merged assignment; per-partition objectives
        // sum to the same total because no term crosses partitions.
        let analysis = analyze(inputs, &self.settings, &merged_assignment);
        let satisfied = analysis.satisfied_by_person.clone();
        let report = AssignmentReport {
            assignment: merged_assignment,
            stats: SolveStats {
                status,
                objective,
                wall_time,
                variables,
                constraints,
            },
            satisfied,
            warnings,
            analysis,
        };
        if !report.objective_parity() {
            warn!(
                solver = report.stats.objective,
                recomputed = report.analysis.objective.total(),
                "merged objective parity violated"
            );
        }
        Ok(PlanOutcome {
            status,
            report: Some(report),
            diagnosis: None,
        })
    }

    fn plan_validated(&self, inputs: ModelInputs<'_>) -> Result<PlanOutcome> {
        let mut ctx = ModelContext::new(inputs, &self.settings, HashSet::new());
        let precheck_warnings = precheck(&ctx);
        hard::build_hard_constraints(&mut ctx);
        soft::build_soft_terms(&mut ctx)?;

        let params =
            SolveParams::new(self.settings.time_limit).with_workers(self.settings.workers as usize);
        let output = solve_model(&mut ctx, &self.engine, &params)?;
        drop(ctx);

        if output.status == SolveStatus::Infeasible {
            let diagnosis = diagnose(inputs, &self.settings, &self.engine)?;
            info!(%diagnosis, "model infeasible");
            return Ok(PlanOutcome {
                status: SolveStatus::Infeasible,
                report: None,
                diagnosis: Some(diagnosis),
            });
        }
        let Some(assignment) = output.assignment else {
            return Ok(PlanOutcome {
                status: output.status,
                report: None,
                diagnosis: None,
            });
        };

        let analysis = analyze(inputs, &self.settings, &assignment);
        let satisfied = analysis.satisfied_by_person.clone();
        let report = AssignmentReport {
            assignment,
            stats: SolveStats {
                status: output.status,
                objective: output.objective,
                wall_time: output.wall_time,
                variables: output.stats.variables,
                constraints: output.stats.constraints,
            },
            satisfied,
            warnings: precheck_warnings.iter().map(|w| w.to_string()).collect(),
            analysis,
        };
        if !report.objective_parity() {
            warn!(
                solver = report.stats.objective,
                recomputed = report.analysis.objective.total(),
                "objective parity violated"
            );
        }
        Ok(PlanOutcome {
            status: output.status,
            report: Some(report),
            diagnosis: None,
        })
    }
}

/// Worst-wins status merge for partitioned planning.
fn worse(a: SolveStatus, b: SolveStatus) -> SolveStatus {
    let severity = |s: SolveStatus| match s {
        SolveStatus::Optimal => 0,
        SolveStatus::Feasible => 1,
        SolveStatus::Unknown => 2,
        SolveStatus::Infeasible => 3,
    };
    if severity(b) > severity(a) {
        b
    } else {
        a
    }
}

/// Owned per-partition input slices for parallel solving.
struct PartitionSlice {
    persons: Vec<Person>,
    groups: Vec<Group>,
    requests: Vec<Request>,
    locks: Vec<Lock>,
    history: Vec<HistoricalRecord>,
}

impl PartitionSlice {
    fn extract(partition: &str, inputs: &ModelInputs<'_>) -> Self {
        let persons: Vec<Person> = inputs
            .persons
            .iter()
            .filter(|p| p.partition == partition)
            .cloned()
            .collect();
        let person_ids: HashSet<_> = persons.iter().map(|p| p.id.clone()).collect();
        let groups: Vec<Group> = inputs
            .groups
            .iter()
            .filter(|g| g.partition == partition)
            .cloned()
            .collect();
        let requests: Vec<Request> = inputs
            .requests
            .iter()
            .filter(|r| person_ids.contains(&r.requester))
            .cloned()
            .collect();
        let locks: Vec<Lock> = inputs
            .locks
            .iter()
            .filter(|lock| match lock {
                Lock::Pin { person, .. } => person_ids.contains(person),
                Lock::Together { members, .. } => {
                    members.iter().any(|m| person_ids.contains(m))
                }
            })
            .cloned()
            .collect();
        let history: Vec<HistoricalRecord> = inputs
            .history
            .iter()
            .filter(|h| person_ids.contains(&h.person))
            .cloned()
            .collect();
        Self {
            persons,
            groups,
            requests,
            locks,
            history,
        }
    }

    fn inputs(&self) -> ModelInputs<'_> {
        ModelInputs {
            persons: &self.persons,
            groups: &self.groups,
            requests: &self.requests,
            locks: &self.locks,
            history: &self.history,
        }
    }
}

/// Fail-fast validation of malformed input, before any model assembly.
fn validate_inputs(inputs: &ModelInputs<'_>) -> Result<()> {
    let mut person_ids = HashSet::new();
    for person in inputs.persons {
        if !person_ids.insert(&person.id) {
            return Err(GroupsmithError::Validation(format!(
                "duplicate person id {}",
                person.id
            )));
        }
    }
    let mut group_ids = HashSet::new();
    for group in inputs.groups {
        if !group_ids.insert(&group.id) {
            return Err(GroupsmithError::Validation(format!(
                "duplicate group id {}",
                group.id
            )));
        }
    }
    let mut request_ids = HashSet::new();
    for request in inputs.requests {
        if !request_ids.insert(&request.id) {
            return Err(GroupsmithError::Validation(format!(
                "duplicate request id {}",
                request.id
            )));
        }
        if !(1..=10).contains(&request.priority) {
            return Err(GroupsmithError::Validation(format!(
                "request {} priority {} outside 1..=10",
                request.id, request.priority
            )));
        }
        if !(0.0..=1.0).contains(&request.confidence) {
            return Err(GroupsmithError::Validation(format!(
                "request {} confidence {} outside 0..=1",
                request.id, request.confidence
            )));
        }
    }
    for lock in inputs.locks {
        if let Lock::Together { name, members } = lock {
            if members.len() < 2 {
                return Err(GroupsmithError::Validation(format!(
                    "together-lock {name} needs at least 2 members"
                )));
            }
            let distinct: HashSet<_> = members.iter().collect();
            if distinct.len() != members.len() {
                return Err(GroupsmithError::Validation(format!(
                    "together-lock {name} lists a member twice"
                )));
            }
        }
    }
    Ok(())
}
