//! Groupsmith Model - constraint-model translation for group assignment
//!
//! This crate turns people, groups, preferences, and locks into a formal
//! decision-variable model with hard constraints and a weighted maximisation
//! objective, submits it to an engine behind the [`Engine`] trait, and
//! interprets the outcome.
//!
//! The flow is: [`ModelContext::new`] assembles the variable matrix, then
//! [`hard::build_hard_constraints`] and [`soft::build_soft_terms`] mutate the
//! shared model and accumulator, then [`solve::solve_model`] hands the model
//! to the engine. On infeasibility, [`diagnose::diagnose`] re-solves with
//! rule categories disabled one at a time to localise the blocking rule.
//!
//! Model assembly is single-threaded and deterministic: identical input
//! yields identical variable order, names, and constraints.

pub mod accumulator;
pub mod context;
pub mod diagnose;
pub mod engine;
pub mod hard;
pub mod ir;
pub mod precheck;
pub mod scoring;
pub mod soft;
pub mod solve;

#[cfg(test)]
mod tests;

pub use accumulator::{SoftTerm, SoftTermAccumulator};
pub use context::{ModelContext, ModelInputs, RuleCategory};
pub use diagnose::{diagnose, Diagnosis};
pub use engine::{Engine, EngineSolution, SolveParams, SolveStatus, VarValues};
pub use ir::{BoolVar, CmpOp, CpModel, IntVar, LinearExpr, Lit, VarId};
pub use precheck::{precheck, PrecheckWarning};
pub use solve::{solve_model, ModelStats, SolveOutput};
