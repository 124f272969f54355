//! Reference engine: exhaustive branch-and-bound over the decision model.
//!
//! Branches on the declared decision variables first, prunes with an
//! optimistic objective bound, and fixes every remaining variable through
//! constraint propagation plus objective-preferred value ordering. Complete
//! and exact: given time it proves optimality or infeasibility; under a
//! time limit it returns the best solution found so far.
//!
//! This engine is meant for small and medium instances and for the test
//! suite. Production deployments can put any CP/ILP engine behind the same
//! [`Engine`](groupsmith_model::Engine) trait.

mod propagate;
mod search;

#[cfg(test)]
mod tests;

pub use search::BranchBoundEngine;
