//! The assignment report handed downstream.

use std::collections::BTreeMap;
use std::time::Duration;

use groupsmith_core::{Assignment, PersonId, RequestId};
use groupsmith_model::SolveStatus;

use crate::analysis::SolutionAnalysis;

/// Solver statistics for the report.
#[derive(Debug, Clone)]
pub struct SolveStats {
    pub status: SolveStatus,
    pub objective: i64,
    pub wall_time: Duration,
    pub variables: usize,
    pub constraints: usize,
}

/// Everything a downstream consumer gets from a successful solve: the
/// final placement, solver statistics, satisfied request ids per person,
/// advisory warnings, and the full analysis.
#[derive(Debug, Clone)]
pub struct AssignmentReport {
    pub assignment: Assignment,
    pub stats: SolveStats,
    pub satisfied: BTreeMap<PersonId, Vec<RequestId>>,
    pub warnings: Vec<String>,
    pub analysis: SolutionAnalysis,
}

impl AssignmentReport {
    /// Quick check used by callers and tests: does the re-derived score
    /// agree with the solver?
    pub fn objective_parity(&self) -> bool {
        self.analysis.objective.total() == self.stats.objective
    }
}
