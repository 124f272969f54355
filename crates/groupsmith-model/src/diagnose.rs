//! Infeasibility diagnosis.
//!
//! When the full model is infeasible, the diagnoser re-assembles and
//! re-solves it several times, each run with exactly one rule category
//! disabled under a reduced time budget, to localise a blocking rule. This
//! is diagnostic tooling only: a diagnosis solve's assignment is never
//! returned as output, because it was obtained with a rule (possibly a
//! safety rule) switched off.

use std::collections::HashSet;

use tracing::info;

use groupsmith_config::Settings;
use groupsmith_core::Result;

use crate::context::{ModelContext, ModelInputs, RuleCategory};
use crate::engine::{Engine, SolveParams};
use crate::{hard, soft, solve};

/// Outcome of a diagnosis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    /// Disabling this single category made the model solvable.
    Blocking(RuleCategory),
    /// No single category's removal helped.
    MultipleInteracting,
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnosis::Blocking(category) => write!(f, "blocked by {category} constraints"),
            Diagnosis::MultipleInteracting => write!(f, "multiple interacting constraints"),
        }
    }
}

/// Sequentially re-solves with one category disabled at a time and returns
/// the first category whose removal yields a solution.
pub fn diagnose(
    inputs: ModelInputs<'_>,
    settings: &Settings,
    engine: &dyn Engine,
) -> Result<Diagnosis> {
    let params = SolveParams::new(settings.diagnosis_time_limit);
    for category in RuleCategory::ALL {
        let mut disabled = HashSet::new();
        disabled.insert(category);
        let mut ctx = ModelContext::new(inputs, settings, disabled);
        hard::build_hard_constraints(&mut ctx);
        soft::build_soft_terms(&mut ctx)?;
        let output = solve::solve_model(&mut ctx, engine, &params)?;
        info!(%category, status = %output.status, "diagnosis solve");
        if output.status.has_solution() {
            return Ok(Diagnosis::Blocking(category));
        }
    }
    Ok(Diagnosis::MultipleInteracting)
}
