//! Groupsmith Core - domain types for group assignment planning
//!
//! This crate provides the fundamental types shared by every Groupsmith crate:
//! - Input entities: people, groups, requests, locks, historical records
//! - The rank comparator ordering groups by level and sub-level suffix
//! - The final assignment type produced by a solve
//! - The error taxonomy

pub mod assignment;
pub mod domain;
pub mod error;
pub mod rank;

pub use assignment::Assignment;
pub use domain::{
    AgeDirection, Group, GroupEligibility, GroupId, HistoricalRecord, Lock, Person, PersonId,
    Request, RequestId, RequestKind,
};
pub use error::{GroupsmithError, Result};
pub use rank::{GroupRank, RankComparator};
