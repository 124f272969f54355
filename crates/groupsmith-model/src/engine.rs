//! The external engine boundary.
//!
//! Everything past this trait is a black box: an engine takes the assembled
//! model plus a time limit and worker count, and returns a status with
//! variable values. Callers must not assume that repeated runs return the
//! same feasible solution unless the engine guarantees it. Cancellation is
//! time-limit based only.

use std::time::Duration;

use groupsmith_core::Result;

use crate::ir::{BoolVar, CpModel, IntVar, VarId};

/// Outcome status of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Proven best solution found.
    Optimal,
    /// A solution was found but optimality was not proven in time.
    Feasible,
    /// Proven that no solution exists.
    Infeasible,
    /// Nothing proven before the time limit.
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Solve-call parameters.
#[derive(Debug, Clone)]
pub struct SolveParams {
    pub time_limit: Duration,
    pub workers: usize,
}

impl SolveParams {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            workers: 1,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// A complete variable valuation returned by an engine.
#[derive(Debug, Clone)]
pub struct VarValues(Vec<i64>);

impl VarValues {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    pub fn value(&self, var: impl Into<VarId>) -> i64 {
        self.0[var.into().index()]
    }

    pub fn bool_value(&self, var: BoolVar) -> bool {
        self.value(var) != 0
    }

    pub fn int_value(&self, var: IntVar) -> i64 {
        self.value(var)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

/// Result of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineSolution {
    pub status: SolveStatus,
    /// Present exactly when `status.has_solution()`.
    pub values: Option<VarValues>,
    /// Engine-reported objective value; 0 when there is no solution.
    pub objective: i64,
    pub wall_time: Duration,
}

/// A constraint engine. Implementations must be safe to share across the
/// planner's parallel per-partition solves; each call gets its own freshly
/// assembled model and contexts are never reused.
pub trait Engine: Send + Sync {
    /// Short engine name for logs and reports.
    fn name(&self) -> &'static str;

    /// Solves the model. Errors are reserved for engine failures;
    /// infeasibility and timeouts are statuses, not errors.
    fn solve(&self, model: &CpModel, params: &SolveParams) -> Result<EngineSolution>;
}
