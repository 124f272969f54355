//! Groupsmith Analysis - post-solve interpretation of assignments.
//!
//! Given any concrete assignment, solver-produced or hypothetical, this
//! crate recomputes request satisfaction, per-group cohesion, provenance
//! satisfaction rates, and the exact integer objective. The re-derived
//! objective equals the solver-reported value for the solver's own
//! assignment, which is what makes offline what-if comparisons trustworthy
//! without re-solving.

pub mod analysis;
pub mod objective;
pub mod report;

pub use analysis::{analyze, GroupCohesion, RequestOutcome, SolutionAnalysis, SourceRate};
pub use objective::{recompute_objective, ObjectiveBreakdown};
pub use report::{AssignmentReport, SolveStats};
