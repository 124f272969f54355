//! Request satisfaction, cohesion, and provenance breakdowns.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use groupsmith_config::Settings;
use groupsmith_core::{
    AgeDirection, Assignment, Group, GroupId, Person, PersonId, Request, RequestId, RequestKind,
};
use groupsmith_model::scoring::{self, RequestClass};
use groupsmith_model::ModelInputs;

use crate::objective::{recompute_objective, ObjectiveBreakdown};

/// Outcome of one request against a concrete assignment.
#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub id: RequestId,
    pub requester: PersonId,
    /// Satisfaction predicate result, reported even for impossible
    /// requests.
    pub satisfied: bool,
    /// Target outside the requester's partition (or unknown): excluded
    /// from scoring and aggregation, kept here for the report.
    pub impossible: bool,
    /// Diminished, provenance-scaled weight; what satisfaction earned (or
    /// would have earned).
    pub weight: i64,
    pub sources: Vec<String>,
}

/// Cohesion of one group: how densely its members are tied together by
/// mutual-affinity requests.
#[derive(Debug, Clone, Serialize)]
pub struct GroupCohesion {
    pub group: GroupId,
    pub occupancy: usize,
    /// Unordered member pairs connected by at least one mutual-affinity
    /// request.
    pub mutual_edges: usize,
    pub possible_edges: usize,
    /// Members with mutual-affinity ties, none of which landed in this
    /// group.
    pub isolated: Vec<PersonId>,
}

impl GroupCohesion {
    pub fn density(&self) -> f64 {
        if self.possible_edges == 0 {
            0.0
        } else {
            self.mutual_edges as f64 / self.possible_edges as f64
        }
    }
}

/// Satisfaction counts for one provenance source field.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SourceRate {
    pub satisfied: usize,
    pub total: usize,
}

impl SourceRate {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.satisfied as f64 / self.total as f64
        }
    }
}

/// The full post-solve analysis structure.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionAnalysis {
    pub outcomes: Vec<RequestOutcome>,
    /// Satisfied request ids per person, id-ordered.
    pub satisfied_by_person: BTreeMap<PersonId, Vec<RequestId>>,
    pub cohesion: Vec<GroupCohesion>,
    pub source_rates: BTreeMap<String, SourceRate>,
    pub objective: ObjectiveBreakdown,
}

/// Evaluates the satisfaction predicate of one request.
///
/// Same group for mutual affinity, different groups for anti-affinity, and
/// for attribute preferences no occupant of the requester's group on the
/// wrong side of their cohort level.
pub fn request_satisfied(
    request: &Request,
    assignment: &Assignment,
    persons_by_id: &HashMap<&PersonId, &Person>,
) -> bool {
    match request.kind {
        RequestKind::MutualAffinity => match &request.target {
            Some(target) => assignment.same_group(&request.requester, target),
            None => false,
        },
        RequestKind::AntiAffinity => match &request.target {
            Some(target) => {
                assignment.group_of(&request.requester).is_some()
                    && assignment.group_of(target).is_some()
                    && !assignment.same_group(&request.requester, target)
            }
            None => false,
        },
        RequestKind::AttributePreference(direction) => {
            let Some(group) = assignment.group_of(&request.requester) else {
                return false;
            };
            let Some(requester) = persons_by_id.get(&request.requester) else {
                return false;
            };
            let level = requester.cohort_level;
            assignment.occupants(group).all(|occupant| {
                let Some(person) = persons_by_id.get(occupant) else {
                    return true;
                };
                match direction {
                    AgeDirection::Older => person.cohort_level >= level,
                    AgeDirection::Younger => person.cohort_level <= level,
                }
            })
        }
    }
}

/// Recomputes the entire analysis from a concrete assignment, independent
/// of the solver.
pub fn analyze(
    inputs: ModelInputs<'_>,
    settings: &Settings,
    assignment: &Assignment,
) -> SolutionAnalysis {
    let persons = scoring::sorted_persons(inputs.persons);
    let groups = scoring::sorted_groups(inputs.groups);
    let persons_by_id: HashMap<&PersonId, &Person> =
        persons.iter().map(|p| (&p.id, *p)).collect();
    let classes = scoring::classify_requests(&persons, inputs.requests, settings);

    let outcomes = request_outcomes(inputs.requests, &classes, assignment, &persons_by_id);
    let satisfied_by_person = satisfied_map(inputs.requests, &outcomes);
    let cohesion = group_cohesion(&groups, inputs.requests, &classes, assignment);
    let source_rates = source_rates(inputs.requests, &outcomes);
    let objective = recompute_objective(inputs, settings, assignment);
    tracing::debug!(
        satisfied = outcomes.iter().filter(|o| o.satisfied && !o.impossible).count(),
        requests = outcomes.len(),
        objective = objective.total(),
        "analysis recomputed"
    );

    SolutionAnalysis {
        outcomes,
        satisfied_by_person,
        cohesion,
        source_rates,
        objective,
    }
}

fn request_outcomes(
    requests: &[Request],
    classes: &[RequestClass],
    assignment: &Assignment,
    persons_by_id: &HashMap<&PersonId, &Person>,
) -> Vec<RequestOutcome> {
    requests
        .iter()
        .zip(classes)
        .map(|(request, class)| RequestOutcome {
            id: request.id.clone(),
            requester: request.requester.clone(),
            satisfied: request_satisfied(request, assignment, persons_by_id),
            impossible: !class.possible,
            weight: class.weight,
            sources: request.sources.clone(),
        })
        .collect()
}

fn satisfied_map(
    requests: &[Request],
    outcomes: &[RequestOutcome],
) -> BTreeMap<PersonId, Vec<RequestId>> {
    let mut map: BTreeMap<PersonId, Vec<RequestId>> = BTreeMap::new();
    for (request, outcome) in requests.iter().zip(outcomes) {
        if outcome.satisfied && !outcome.impossible {
            map.entry(request.requester.clone())
                .or_default()
                .push(request.id.clone());
        }
    }
    map
}

fn group_cohesion(
    groups: &[&Group],
    requests: &[Request],
    classes: &[RequestClass],
    assignment: &Assignment,
) -> Vec<GroupCohesion> {
    // Undirected mutual-affinity adjacency over possible requests.
    let mut partners: HashMap<&PersonId, HashSet<&PersonId>> = HashMap::new();
    for (request, class) in requests.iter().zip(classes) {
        if !class.possible || request.kind != RequestKind::MutualAffinity {
            continue;
        }
        if let Some(target) = &request.target {
            partners.entry(&request.requester).or_default().insert(target);
            partners.entry(target).or_default().insert(&request.requester);
        }
    }

    groups
        .iter()
        .map(|group| {
            let members: Vec<&PersonId> = assignment.occupants(&group.id).collect();
            let occupancy = members.len();
            let member_set: HashSet<&PersonId> = members.iter().copied().collect();
            let mut mutual_edges = 0;
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if partners.get(*a).is_some_and(|p| p.contains(*b)) {
                        mutual_edges += 1;
                    }
                }
            }
            let isolated = members
                .iter()
                .filter(|member| {
                    partners.get(**member).is_some_and(|p| {
                        !p.iter().any(|partner| member_set.contains(*partner))
                    })
                })
                .map(|member| (**member).clone())
                .collect();
            GroupCohesion {
                group: group.id.clone(),
                occupancy,
                mutual_edges,
                possible_edges: occupancy * occupancy.saturating_sub(1) / 2,
                isolated,
            }
        })
        .collect()
}

fn source_rates(
    requests: &[Request],
    outcomes: &[RequestOutcome],
) -> BTreeMap<String, SourceRate> {
    let mut rates: BTreeMap<String, SourceRate> = BTreeMap::new();
    for (request, outcome) in requests.iter().zip(outcomes) {
        for source in &request.sources {
            let entry = rates.entry(source.clone()).or_default();
            entry.total += 1;
            if outcome.satisfied && !outcome.impossible {
                entry.satisfied += 1;
            }
        }
    }
    rates
}
