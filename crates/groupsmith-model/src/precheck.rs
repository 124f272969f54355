//! Static feasibility pre-check.
//!
//! Purely advisory: it never blocks a solve, it only surfaces conditions
//! that will or may make the model infeasible, so operators see the cause
//! next to the eventual diagnosis.

use std::collections::BTreeMap;

use tracing::warn;

use groupsmith_config::CapacityMode;
use groupsmith_core::{Lock, PersonId, RequestId};

use crate::context::ModelContext;
use crate::scoring;

/// One advisory finding.
#[derive(Debug, Clone, PartialEq)]
pub enum PrecheckWarning {
    /// A partition's people outnumber its total hard capacity.
    CapacityShortfall {
        partition: String,
        population: i64,
        capacity: i64,
    },
    /// A partition × attribute bucket outnumbers its compatible capacity.
    BucketShortfall {
        bucket: String,
        population: i64,
        capacity: i64,
    },
    /// A together-lock fits in no single group.
    LockUnplaceable { lock: String, size: usize },
    /// No group is compatible with this person's attribute × partition.
    StrandedPerson { person: PersonId },
    /// The request's target is outside the requester's partition (or
    /// unknown). Excluded from satisfaction aggregation, kept in output.
    ImpossibleRequest {
        request: RequestId,
        requester: PersonId,
    },
    /// The person has no eligibility attribute; segregation leaves them
    /// unconstrained.
    MissingAttribute { person: PersonId },
}

impl std::fmt::Display for PrecheckWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrecheckWarning::CapacityShortfall {
                partition,
                population,
                capacity,
            } => write!(
                f,
                "partition {partition}: population {population} exceeds capacity {capacity}"
            ),
            PrecheckWarning::BucketShortfall {
                bucket,
                population,
                capacity,
            } => write!(
                f,
                "bucket {bucket}: population {population} exceeds compatible capacity {capacity}"
            ),
            PrecheckWarning::LockUnplaceable { lock, size } => {
                write!(f, "lock {lock} ({size} members) fits in no single group")
            }
            PrecheckWarning::StrandedPerson { person } => {
                write!(f, "person {person} has no compatible group")
            }
            PrecheckWarning::ImpossibleRequest { request, requester } => write!(
                f,
                "request {request} by {requester} targets outside their partition"
            ),
            PrecheckWarning::MissingAttribute { person } => {
                write!(f, "person {person} has no eligibility attribute")
            }
        }
    }
}

/// Effective hard ceiling of a group under the current capacity mode.
fn hard_ceiling(ctx: &ModelContext<'_>, g: usize) -> i64 {
    let standard = i64::from(ctx.groups[g].capacity).min(ctx.settings.capacity_max);
    match ctx.settings.capacity_mode {
        CapacityMode::Hard => standard,
        CapacityMode::Soft => ctx.settings.capacity_max,
    }
}

/// Runs every advisory check against the assembled context.
pub fn precheck(ctx: &ModelContext<'_>) -> Vec<PrecheckWarning> {
    let mut warnings = Vec::new();

    // Per-partition headcount vs. hard capacity.
    let mut partition_pop: BTreeMap<&str, i64> = BTreeMap::new();
    let mut partition_cap: BTreeMap<&str, i64> = BTreeMap::new();
    for person in &ctx.persons {
        *partition_pop.entry(person.partition.as_str()).or_default() += 1;
    }
    for g in 0..ctx.groups.len() {
        *partition_cap
            .entry(ctx.groups[g].partition.as_str())
            .or_default() += hard_ceiling(ctx, g);
    }
    for (partition, population) in &partition_pop {
        let capacity = partition_cap.get(partition).copied().unwrap_or(0);
        if *population > capacity {
            warnings.push(PrecheckWarning::CapacityShortfall {
                partition: (*partition).to_string(),
                population: *population,
                capacity,
            });
        }
    }

    // Per-bucket headcount vs. compatible capacity (concrete groups of the
    // bucket's attribute plus the partition's wildcard groups).
    let marker = &ctx.settings.wildcard_marker;
    let mut bucket_pop: BTreeMap<scoring::BucketKey, i64> = BTreeMap::new();
    for person in &ctx.persons {
        *bucket_pop.entry(scoring::person_bucket(person)).or_default() += 1;
    }
    for (key, population) in &bucket_pop {
        let capacity: i64 = (0..ctx.groups.len())
            .filter(|g| {
                let group = ctx.groups[*g];
                group.partition == key.partition
                    && match (group.concrete_eligibility(marker), &key.attribute) {
                        (Some(g_attr), Some(p_attr)) => g_attr == p_attr,
                        _ => true,
                    }
            })
            .map(|g| hard_ceiling(ctx, g))
            .sum();
        if *population > capacity {
            warnings.push(PrecheckWarning::BucketShortfall {
                bucket: key.label(),
                population: *population,
                capacity,
            });
        }
    }

    // Locks that fit nowhere.
    for lock in ctx.locks {
        if let Lock::Together { name, members } = lock {
            let indices: Vec<usize> = members
                .iter()
                .filter_map(|m| ctx.person_index(m))
                .collect();
            if indices.len() < 2 {
                continue;
            }
            let size = indices.len() as i64;
            let placeable = (0..ctx.groups.len()).any(|g| {
                hard_ceiling(ctx, g) >= size && indices.iter().all(|p| ctx.eligible(*p, g))
            });
            if !placeable {
                warnings.push(PrecheckWarning::LockUnplaceable {
                    lock: name.clone(),
                    size: indices.len(),
                });
            }
        }
    }

    // Stranded people and missing attributes.
    for p in 0..ctx.persons.len() {
        if !(0..ctx.groups.len()).any(|g| ctx.eligible(p, g)) {
            warnings.push(PrecheckWarning::StrandedPerson {
                person: ctx.persons[p].id.clone(),
            });
        }
        if ctx.persons[p].eligibility.is_none() {
            warnings.push(PrecheckWarning::MissingAttribute {
                person: ctx.persons[p].id.clone(),
            });
        }
    }

    // Impossible pairwise requests.
    for (idx, request) in ctx.requests.iter().enumerate() {
        if request.is_pairwise() && !ctx.request_classes[idx].possible {
            warnings.push(PrecheckWarning::ImpossibleRequest {
                request: request.id.clone(),
                requester: request.requester.clone(),
            });
        }
    }

    for warning in &warnings {
        warn!(%warning, "precheck");
    }
    warnings
}
