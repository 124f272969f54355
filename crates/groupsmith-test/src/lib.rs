//! Shared test fixtures for Groupsmith crates.
//!
//! Data-only scenario builders plus a seeded random instance generator.
//! Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! groupsmith-test = { workspace = true }
//! ```

pub mod scenario;

pub use scenario::{RandomSpec, Scenario};
