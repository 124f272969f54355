//! Groupsmith - constraint-based group assignment planning.
//!
//! Assigns a population of people to capacity-bounded groups under hard
//! safety and operational rules plus weighted soft preferences, then
//! reports which preferences were honoured.
//!
//! # Example
//!
//! ```
//! use groupsmith::prelude::*;
//!
//! let persons = vec![
//!     Person::new("p1", "Ana", 6, "june").with_eligibility("F"),
//!     Person::new("p2", "Bea", 6, "june").with_eligibility("F"),
//! ];
//! let groups = vec![Group::new("g1", "L6A", 4, "june").with_eligibility("F")];
//! let requests = vec![Request::new("r1", PersonId::new("p1"), RequestKind::MutualAffinity)
//!     .with_target(PersonId::new("p2"))
//!     .with_priority(8)];
//!
//! let planner = AssignmentPlanner::new(Settings::default());
//! let outcome = planner
//!     .plan(ModelInputs {
//!         persons: &persons,
//!         groups: &groups,
//!         requests: &requests,
//!         locks: &[],
//!         history: &[],
//!     })
//!     .unwrap();
//!
//! let report = outcome.report.unwrap();
//! assert!(report.assignment.same_group(&PersonId::new("p1"), &PersonId::new("p2")));
//! assert!(report.objective_parity());
//! ```

mod planner;

pub use planner::{AssignmentPlanner, PlanOutcome};

pub use groupsmith_analysis::{
    analyze, AssignmentReport, GroupCohesion, ObjectiveBreakdown, RequestOutcome,
    SolutionAnalysis, SolveStats, SourceRate,
};
pub use groupsmith_config::{CapacityMode, ConfigError, ParamMap, ParamValue, Settings};
pub use groupsmith_core::{
    AgeDirection, Assignment, Group, GroupEligibility, GroupId, GroupsmithError, HistoricalRecord,
    Lock, Person, PersonId, RankComparator, Request, RequestId, RequestKind, Result,
};
pub use groupsmith_engine::BranchBoundEngine;
pub use groupsmith_model::{
    diagnose, precheck, Diagnosis, Engine, ModelContext, ModelInputs, PrecheckWarning,
    RuleCategory, SolveParams, SolveStatus,
};

/// Everything needed to define and solve an assignment problem.
pub mod prelude {
    pub use crate::planner::{AssignmentPlanner, PlanOutcome};
    pub use groupsmith_analysis::AssignmentReport;
    pub use groupsmith_config::{ParamMap, ParamValue, Settings};
    pub use groupsmith_core::{
        AgeDirection, Assignment, Group, GroupId, HistoricalRecord, Lock, Person, PersonId,
        Request, RequestId, RequestKind,
    };
    pub use groupsmith_engine::BranchBoundEngine;
    pub use groupsmith_model::{Engine, ModelInputs, SolveStatus};
}
