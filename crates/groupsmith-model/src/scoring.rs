//! Pure scoring arithmetic shared by the soft-constraint builders and the
//! post-solve analyzer.
//!
//! The builders use these functions to pick objective coefficients; the
//! analyzer uses the same functions to re-derive the score from a concrete
//! assignment. Keeping both on one code path is what makes the re-derived
//! score match the solver-reported objective exactly.

use std::collections::{BTreeMap, HashMap};

use groupsmith_config::Settings;
use groupsmith_core::{Group, HistoricalRecord, Person, PersonId, RankComparator, Request};

/// A partition × eligibility-attribute bucket. Capacity accounting and
/// cohort-flow slicing both work per bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub partition: String,
    /// `None` covers people with no attribute and wildcard groups.
    pub attribute: Option<String>,
}

impl BucketKey {
    pub fn label(&self) -> String {
        match &self.attribute {
            Some(attr) => format!("{}/{}", self.partition, attr),
            None => format!("{}/*", self.partition),
        }
    }
}

pub fn person_bucket(person: &Person) -> BucketKey {
    BucketKey {
        partition: person.partition.clone(),
        attribute: person.eligibility.clone(),
    }
}

pub fn group_bucket(group: &Group, marker: &str) -> BucketKey {
    BucketKey {
        partition: group.partition.clone(),
        attribute: group.concrete_eligibility(marker).map(str::to_string),
    }
}

/// Stable id-ordered view of the people. Determines variable order.
pub fn sorted_persons(persons: &[Person]) -> Vec<&Person> {
    let mut out: Vec<&Person> = persons.iter().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// Stable id-ordered view of the groups. Determines variable order.
pub fn sorted_groups(groups: &[Group]) -> Vec<&Group> {
    let mut out: Vec<&Group> = groups.iter().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// Attribute compatibility, partition aside. People or groups missing
/// attribute data are compatible with everything.
pub fn compatible(person: &Person, group: &Group, marker: &str) -> bool {
    match (group.concrete_eligibility(marker), &person.eligibility) {
        (Some(g_attr), Some(p_attr)) => g_attr == p_attr,
        _ => true,
    }
}

/// A person may occupy a group only in their own partition and with a
/// compatible attribute.
pub fn eligible(person: &Person, group: &Group, marker: &str) -> bool {
    person.partition == group.partition && compatible(person, group, marker)
}

/// Integer weight of a satisfied request. Never below 1 so satisfaction is
/// always worth claiming.
pub fn request_weight(priority: u8, provenance_multiplier: f64, diminishing_factor: f64) -> i64 {
    let raw = f64::from(priority) * 10.0 * provenance_multiplier * diminishing_factor;
    (raw.round() as i64).max(1)
}

/// Per-request classification, parallel to the request slice.
#[derive(Debug, Clone)]
pub struct RequestClass {
    /// False when the target is unknown, is the requester, or lies outside
    /// the requester's partition. Impossible requests are excluded from
    /// satisfaction aggregation but kept in output.
    pub possible: bool,
    /// Carries at least one non-inferred provenance source.
    pub explicit: bool,
    /// Satisfaction weight after provenance and diminishing multipliers;
    /// 0 for impossible requests.
    pub weight: i64,
}

/// Classifies every request and assigns diminishing-returns weights.
///
/// Each person's *possible* requests are sorted by priority descending (id
/// ascending as tie-break) and the positional factor applies: the 1st gets
/// the full multiplier, the 2nd the reduced one, the 3rd and later the
/// minimal one.
pub fn classify_requests(
    persons: &[&Person],
    requests: &[Request],
    settings: &Settings,
) -> Vec<RequestClass> {
    let by_id: HashMap<&PersonId, &Person> = persons.iter().map(|p| (&p.id, *p)).collect();

    let mut classes: Vec<RequestClass> = requests
        .iter()
        .map(|r| {
            let requester = by_id.get(&r.requester).copied();
            let possible = match (&r.target, requester) {
                (_, None) => false,
                (None, Some(_)) => !r.is_pairwise(),
                (Some(target), Some(requester_p)) => {
                    if !r.is_pairwise() || target == &r.requester {
                        !r.is_pairwise()
                    } else {
                        by_id
                            .get(target)
                            .is_some_and(|t| t.partition == requester_p.partition)
                    }
                }
            };
            RequestClass {
                possible,
                explicit: settings.is_explicit(&r.sources),
                weight: 0,
            }
        })
        .collect();

    let mut per_person: BTreeMap<&PersonId, Vec<usize>> = BTreeMap::new();
    for (idx, r) in requests.iter().enumerate() {
        if classes[idx].possible {
            per_person.entry(&r.requester).or_default().push(idx);
        }
    }
    for indices in per_person.values_mut() {
        indices.sort_by(|a, b| {
            requests[*b]
                .priority
                .cmp(&requests[*a].priority)
                .then_with(|| requests[*a].id.cmp(&requests[*b].id))
        });
        for (position, idx) in indices.iter().enumerate() {
            let r = &requests[*idx];
            let factor = settings.diminishing_factors[position.min(2)];
            let multiplier = settings.provenance_multiplier(&r.sources);
            classes[*idx].weight = request_weight(r.priority, multiplier, factor);
        }
    }
    classes
}

/// Which satisfaction indicators feed a person's
/// at-least-one-request-satisfied aggregation.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Indices into the request slice.
    pub members: Vec<usize>,
    /// True when the penalty applies unconditionally: the person's only
    /// explicit requests are impossible and configuration counts them.
    pub forced_penalty: bool,
}

impl Aggregation {
    pub fn is_active(&self) -> bool {
        !self.members.is_empty() || self.forced_penalty
    }
}

/// Aggregation policy: explicit possible pairwise requests; when a person
/// has none, explicit attribute preferences stand in if the fallback is
/// enabled. Impossible requests participate only via `count_impossible`.
pub fn aggregation_for(
    person: &PersonId,
    requests: &[Request],
    classes: &[RequestClass],
    settings: &Settings,
) -> Aggregation {
    let mine = || {
        requests
            .iter()
            .enumerate()
            .filter(move |(_, r)| &r.requester == person)
    };

    let pairwise: Vec<usize> = mine()
        .filter(|(idx, r)| r.is_pairwise() && classes[*idx].explicit && classes[*idx].possible)
        .map(|(idx, _)| idx)
        .collect();
    if !pairwise.is_empty() {
        return Aggregation {
            members: pairwise,
            forced_penalty: false,
        };
    }

    let has_impossible_pairwise = mine()
        .any(|(idx, r)| r.is_pairwise() && classes[idx].explicit && !classes[idx].possible);

    if settings.fallback_attribute_preference {
        let fallback: Vec<usize> = mine()
            .filter(|(idx, r)| {
                !r.is_pairwise() && classes[*idx].explicit && classes[*idx].possible
            })
            .map(|(idx, _)| idx)
            .collect();
        if !fallback.is_empty() {
            return Aggregation {
                members: fallback,
                forced_penalty: false,
            };
        }
    }

    Aggregation {
        members: Vec::new(),
        forced_penalty: settings.count_impossible && has_impossible_pairwise,
    }
}

/// Spread of cohort levels, floored at 1 so fit ratios stay defined.
pub fn level_range<I: IntoIterator<Item = i32>>(levels: I) -> i32 {
    let mut min = i32::MAX;
    let mut max = i32::MIN;
    for level in levels {
        min = min.min(level);
        max = max.max(level);
    }
    if min > max {
        return 1;
    }
    (max - min).max(1)
}

/// Splits level-sorted people into `n_slices` near-equal slices and returns
/// each slice's mean level. Leading slices absorb the remainder. An empty
/// slice falls back to the overall mean.
pub fn slice_targets(sorted_levels: &[i32], n_slices: usize) -> Vec<f64> {
    if n_slices == 0 {
        return Vec::new();
    }
    let len = sorted_levels.len();
    let overall = if len == 0 {
        0.0
    } else {
        sorted_levels.iter().map(|l| f64::from(*l)).sum::<f64>() / len as f64
    };
    let base = len / n_slices;
    let remainder = len % n_slices;
    let mut targets = Vec::with_capacity(n_slices);
    let mut start = 0;
    for slice_idx in 0..n_slices {
        let size = base + usize::from(slice_idx < remainder);
        if size == 0 {
            targets.push(overall);
            continue;
        }
        let slice = &sorted_levels[start..start + size];
        targets.push(slice.iter().map(|l| f64::from(*l)).sum::<f64>() / size as f64);
        start += size;
    }
    targets
}

/// Integer cohort-fit bonus: `scale · (1 − |level − target| / range)`,
/// rounded. Always in `0..=scale` because target lies inside the bucket's
/// level span.
pub fn cohort_fit_coef(level: i32, target: f64, range: i32, scale: i64) -> i64 {
    let fit = 1.0 - (f64::from(level) - target).abs() / f64::from(range);
    (fit * scale as f64).round() as i64
}

/// Cohort-flow plan of one bucket: rankable concrete groups in rank order,
/// the bucket's people, and each group's target level.
#[derive(Debug, Clone)]
pub struct CohortFlowBucket {
    pub key: BucketKey,
    /// Indices into the sorted group slice, rank-ordered.
    pub groups: Vec<usize>,
    /// Target level per group, parallel to `groups`.
    pub targets: Vec<f64>,
    /// Indices into the sorted person slice, level-ordered.
    pub persons: Vec<usize>,
    pub range: i32,
}

/// Builds the per-bucket cohort-flow plan. Wildcard groups and groups with
/// unrankable names take no part; a bucket without rankable groups or
/// without people is skipped.
pub fn cohort_flow(
    persons: &[&Person],
    groups: &[&Group],
    ranks: &RankComparator,
    settings: &Settings,
) -> Vec<CohortFlowBucket> {
    let marker = &settings.wildcard_marker;

    let mut group_buckets: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
    for (g_idx, group) in groups.iter().enumerate() {
        if group.is_wildcard(marker) || ranks.rank(&group.name).is_none() {
            continue;
        }
        group_buckets
            .entry(group_bucket(group, marker))
            .or_default()
            .push(g_idx);
    }

    let mut out = Vec::new();
    for (key, mut bucket_groups) in group_buckets {
        bucket_groups.sort_by(|a, b| {
            ranks
                .rank(&groups[*a].name)
                .cmp(&ranks.rank(&groups[*b].name))
                .then_with(|| groups[*a].id.cmp(&groups[*b].id))
        });

        let mut bucket_persons: Vec<usize> = persons
            .iter()
            .enumerate()
            .filter(|(_, p)| person_bucket(p) == key)
            .map(|(idx, _)| idx)
            .collect();
        if bucket_persons.is_empty() {
            continue;
        }
        bucket_persons.sort_by(|a, b| {
            persons[*a]
                .cohort_level
                .cmp(&persons[*b].cohort_level)
                .then_with(|| persons[*a].id.cmp(&persons[*b].id))
        });

        let levels: Vec<i32> = bucket_persons
            .iter()
            .map(|p| persons[*p].cohort_level)
            .collect();
        let targets = slice_targets(&levels, bucket_groups.len());
        let range = level_range(levels.iter().copied());
        out.push(CohortFlowBucket {
            key,
            groups: bucket_groups,
            targets,
            persons: bucket_persons,
            range,
        });
    }
    out
}

/// Capacity accounting of one bucket for the unavoidable-overflow
/// exemption.
#[derive(Debug, Clone)]
pub struct OverflowBucket {
    pub key: BucketKey,
    /// Indices into the sorted group slice.
    pub groups: Vec<usize>,
    pub population: i64,
    /// Sum of standard capacities, each capped at the absolute ceiling.
    pub std_capacity: i64,
    /// Overflow units that are mathematically forced and therefore exempt.
    pub exempt: i64,
}

/// Groups every group and person into partition × attribute buckets and
/// computes the exempt overflow `max(0, population − standard capacity)`.
pub fn overflow_buckets(
    persons: &[&Person],
    groups: &[&Group],
    settings: &Settings,
) -> Vec<OverflowBucket> {
    let marker = &settings.wildcard_marker;
    let mut by_key: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
    for (g_idx, group) in groups.iter().enumerate() {
        by_key
            .entry(group_bucket(group, marker))
            .or_default()
            .push(g_idx);
    }

    let mut out = Vec::new();
    for (key, bucket_groups) in by_key {
        let std_capacity: i64 = bucket_groups
            .iter()
            .map(|g| i64::from(groups[*g].capacity).min(settings.capacity_max))
            .sum();
        let population = persons
            .iter()
            .filter(|p| person_bucket(p) == key)
            .count() as i64;
        out.push(OverflowBucket {
            key,
            groups: bucket_groups,
            population,
            std_capacity,
            exempt: (population - std_capacity).max(0),
        });
    }
    out
}

/// Total penalty for `units` penalised overflow units: the 1st unit costs
/// `penalties[0]`, the 2nd `penalties[1]`, every further unit
/// `penalties[2]`.
pub fn overflow_penalty(units: i64, penalties: [i64; 3]) -> i64 {
    if units <= 0 {
        return 0;
    }
    let mut total = penalties[0];
    if units >= 2 {
        total += penalties[1];
    }
    if units >= 3 {
        total += (units - 2) * penalties[2];
    }
    total
}

/// Latest historical record per person, by period order; later input wins
/// a period tie.
pub fn latest_history(history: &[HistoricalRecord]) -> BTreeMap<&PersonId, &HistoricalRecord> {
    let mut latest: BTreeMap<&PersonId, &HistoricalRecord> = BTreeMap::new();
    for record in history {
        match latest.get(&record.person) {
            Some(existing) if existing.period > record.period => {}
            _ => {
                latest.insert(&record.person, record);
            }
        }
    }
    latest
}
