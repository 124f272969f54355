//! Solve invocation: objective assembly, submission, and extraction.

use std::time::Duration;

use tracing::info;

use groupsmith_core::{Assignment, Result};

use crate::context::ModelContext;
use crate::engine::{Engine, SolveParams, SolveStatus};

/// Variable and constraint counts of the submitted model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStats {
    pub variables: usize,
    pub constraints: usize,
}

/// Result of one solve invocation.
#[derive(Debug, Clone)]
pub struct SolveOutput {
    pub status: SolveStatus,
    /// Present exactly when the status carries a solution.
    pub assignment: Option<Assignment>,
    /// Engine-reported objective; 0 when there is no solution.
    pub objective: i64,
    pub wall_time: Duration,
    pub stats: ModelStats,
}

/// Consumes the accumulator into the objective, validates the model, and
/// submits it. The context must not be reused after extraction.
pub fn solve_model(
    ctx: &mut ModelContext<'_>,
    engine: &dyn Engine,
    params: &SolveParams,
) -> Result<SolveOutput> {
    ctx.soft.install_into(&mut ctx.model)?;
    ctx.model.validate()?;

    let stats = ModelStats {
        variables: ctx.model.var_count(),
        constraints: ctx.model.constraint_count(),
    };
    info!(
        engine = engine.name(),
        variables = stats.variables,
        constraints = stats.constraints,
        objective_terms = ctx.model.objective().len(),
        time_limit_ms = params.time_limit.as_millis() as u64,
        workers = params.workers,
        "submitting model"
    );

    let solution = engine.solve(&ctx.model, params)?;
    info!(
        status = %solution.status,
        objective = solution.objective,
        wall_time_ms = solution.wall_time.as_millis() as u64,
        "solve finished"
    );

    let assignment = solution.values.as_ref().map(|values| {
        ctx.persons
            .iter()
            .enumerate()
            .map(|(p, person)| {
                let g = values.int_value(ctx.group_of[p]) as usize;
                (person.id.clone(), ctx.groups[g].id.clone())
            })
            .collect::<Assignment>()
    });

    Ok(SolveOutput {
        status: solution.status,
        assignment,
        objective: solution.objective,
        wall_time: solution.wall_time,
        stats,
    })
}
