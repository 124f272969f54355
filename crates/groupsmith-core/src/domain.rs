//! Input entities for assignment planning.
//!
//! All of these are immutable inputs: the planner reads them, never mutates
//! them. References between entities are by id, resolved through index maps
//! at model-assembly time.

use std::fmt;

/// Identifier of a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person to be placed into exactly one group.
///
/// The partition (e.g. a session) bounds where the person may be placed: no
/// person or group crosses partitions. The eligibility attribute drives the
/// segregation rule; a person with no attribute is left unconstrained by it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Ordinal cohort level (e.g. grade).
    pub cohort_level: i32,
    /// Continuous age derived from the birth date, when known.
    pub age: Option<f64>,
    /// Categorical eligibility attribute (e.g. gender). `None` means the
    /// attribute is unknown; such people are logged and never segregated.
    pub eligibility: Option<String>,
    /// Partition key (e.g. session).
    pub partition: String,
}

impl Person {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cohort_level: i32,
        partition: impl Into<String>,
    ) -> Self {
        Self {
            id: PersonId::new(id),
            name: name.into(),
            cohort_level,
            age: None,
            eligibility: None,
            partition: partition.into(),
        }
    }

    pub fn with_eligibility(mut self, eligibility: impl Into<String>) -> Self {
        self.eligibility = Some(eligibility.into());
        self
    }

    pub fn with_age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }
}

/// Eligibility of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupEligibility {
    /// Accepts any attribute value. Exempt from segregation and
    /// cohort-spread rules.
    Any,
    /// Accepts only people with this concrete attribute value.
    Only(String),
}

/// A capacity-bounded group that people are placed into.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub id: GroupId,
    /// Display name encoding an ordinal level and optional single-letter
    /// sub-level suffix, e.g. `"L6A"`. Names containing the configured
    /// any-eligibility marker make the group a wildcard group.
    pub name: String,
    /// Standard capacity. In soft-capacity mode this is the overflow
    /// threshold; the absolute ceiling comes from configuration.
    pub capacity: u32,
    pub eligibility: GroupEligibility,
    /// Partition key (e.g. session).
    pub partition: String,
}

impl Group {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
        partition: impl Into<String>,
    ) -> Self {
        Self {
            id: GroupId::new(id),
            name: name.into(),
            capacity,
            eligibility: GroupEligibility::Any,
            partition: partition.into(),
        }
    }

    pub fn with_eligibility(mut self, attribute: impl Into<String>) -> Self {
        self.eligibility = GroupEligibility::Only(attribute.into());
        self
    }

    /// True if this group accepts any attribute: either declared `Any` or
    /// its name carries the any-eligibility marker.
    pub fn is_wildcard(&self, marker: &str) -> bool {
        matches!(self.eligibility, GroupEligibility::Any)
            || (!marker.is_empty() && self.name.contains(marker))
    }

    /// Concrete attribute this group is reserved for, if any.
    pub fn concrete_eligibility(&self, marker: &str) -> Option<&str> {
        if self.is_wildcard(marker) {
            return None;
        }
        match &self.eligibility {
            GroupEligibility::Only(attr) => Some(attr),
            GroupEligibility::Any => None,
        }
    }
}

/// Direction of an attribute preference: the cohort the requester wants to
/// be surrounded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgeDirection {
    Older,
    Younger,
}

/// Kind of a placement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestKind {
    /// Requester wants to share a group with the target.
    MutualAffinity,
    /// Requester must not share a group with the target.
    AntiAffinity,
    /// Requester prefers a group without members on the wrong side of their
    /// own cohort level.
    AttributePreference(AgeDirection),
}

/// A weighted soft preference extracted upstream from free-form input.
///
/// The provenance `sources` act as weight multipliers: explicit written
/// requests can be configured to outweigh inferred signals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    pub id: RequestId,
    pub requester: PersonId,
    /// Target person for pairwise kinds; `None` for attribute preferences.
    pub target: Option<PersonId>,
    pub kind: RequestKind,
    /// Priority in 1..=10.
    pub priority: u8,
    /// Provenance tags (source fields the request was extracted from).
    pub sources: Vec<String>,
    /// Extraction confidence in 0.0..=1.0.
    pub confidence: f64,
}

impl Request {
    pub fn new(id: impl Into<String>, requester: PersonId, kind: RequestKind) -> Self {
        Self {
            id: RequestId::new(id),
            requester,
            target: None,
            kind,
            priority: 5,
            sources: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn with_target(mut self, target: PersonId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Pairwise requests reference a target person; attribute preferences
    /// do not.
    pub fn is_pairwise(&self) -> bool {
        matches!(
            self.kind,
            RequestKind::MutualAffinity | RequestKind::AntiAffinity
        )
    }
}

/// A hard placement lock.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lock {
    /// A single person pinned to a specific group.
    Pin { person: PersonId, group: GroupId },
    /// A named set of at least two people that must end in the same group
    /// as a unit, though not a specific one.
    Together { name: String, members: Vec<PersonId> },
}

impl Lock {
    /// Human-readable label for reports and warnings.
    pub fn label(&self) -> String {
        match self {
            Lock::Pin { person, group } => format!("pin:{person}->{group}"),
            Lock::Together { name, .. } => format!("together:{name}"),
        }
    }
}

/// A person's group in a prior period. Used only for progression scoring,
/// never for hard placement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoricalRecord {
    pub person: PersonId,
    pub prior_group_name: String,
    pub period: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_by_name_marker() {
        let g = Group::new("g1", "OPEN-8", 12, "s1").with_eligibility("F");
        assert!(g.is_wildcard("OPEN"));
        assert_eq!(g.concrete_eligibility("OPEN"), None);
        assert_eq!(g.concrete_eligibility("XYZ"), Some("F"));
    }

    #[test]
    fn wildcard_by_declared_eligibility() {
        let g = Group::new("g1", "L6A", 12, "s1");
        assert!(g.is_wildcard(""));
        assert!(g.is_wildcard("OPEN"));
    }

    #[test]
    fn pairwise_classification() {
        let p = PersonId::new("p1");
        assert!(Request::new("r1", p.clone(), RequestKind::MutualAffinity).is_pairwise());
        assert!(Request::new("r2", p.clone(), RequestKind::AntiAffinity).is_pairwise());
        assert!(
            !Request::new("r3", p, RequestKind::AttributePreference(AgeDirection::Older))
                .is_pairwise()
        );
    }
}
