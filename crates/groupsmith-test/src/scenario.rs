//! Scenario builders.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use groupsmith_core::{
    AgeDirection, Group, HistoricalRecord, Lock, Person, PersonId, Request, RequestKind,
};
use groupsmith_model::ModelInputs;

/// An owned problem instance.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub persons: Vec<Person>,
    pub groups: Vec<Group>,
    pub requests: Vec<Request>,
    pub locks: Vec<Lock>,
    pub history: Vec<HistoricalRecord>,
}

impl Scenario {
    pub fn inputs(&self) -> ModelInputs<'_> {
        ModelInputs {
            persons: &self.persons,
            groups: &self.groups,
            requests: &self.requests,
            locks: &self.locks,
            history: &self.history,
        }
    }

    /// Twelve people across two cohort levels, one attribute, two groups of
    /// six. The canonical balanced end-to-end scenario.
    pub fn two_cohorts_two_groups() -> Self {
        let mut persons = Vec::new();
        for i in 0..6 {
            persons.push(
                Person::new(format!("pa{i}"), format!("A{i}"), 5, "june").with_eligibility("F"),
            );
        }
        for i in 0..6 {
            persons.push(
                Person::new(format!("pb{i}"), format!("B{i}"), 6, "june").with_eligibility("F"),
            );
        }
        let groups = vec![
            Group::new("g1", "L5A", 6, "june").with_eligibility("F"),
            Group::new("g2", "L6A", 6, "june").with_eligibility("F"),
        ];
        Self {
            persons,
            groups,
            ..Default::default()
        }
    }
}

/// Shape of a randomly generated instance.
#[derive(Debug, Clone, Copy)]
pub struct RandomSpec {
    pub persons: usize,
    pub groups: usize,
    pub requests: usize,
    /// Cohort levels drawn from `level_lo..=level_hi`.
    pub level_lo: i32,
    pub level_hi: i32,
}

impl Default for RandomSpec {
    fn default() -> Self {
        Self {
            persons: 8,
            groups: 3,
            requests: 6,
            level_lo: 4,
            level_hi: 7,
        }
    }
}

impl Scenario {
    /// Deterministic random instance: mixed attributes, one wildcard group,
    /// generous capacities so hard rules stay satisfiable, and mixed
    /// request kinds with varied priorities and provenance.
    pub fn random(seed: u64, spec: RandomSpec) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let attrs = ["F", "M"];
        let sources = ["form", "notes", "inferred"];

        let persons: Vec<Person> = (0..spec.persons)
            .map(|i| {
                let level = rng.random_range(spec.level_lo..=spec.level_hi);
                Person::new(format!("p{i:02}"), format!("P{i:02}"), level, "s1")
                    .with_eligibility(attrs[i % 2])
            })
            .collect();

        // Alternate concrete eligibility, and make the last group wildcard
        // so nobody is ever stranded.
        let capacity = spec.persons as u32;
        let groups: Vec<Group> = (0..spec.groups)
            .map(|i| {
                let name = format!("L{}{}", spec.level_lo + i as i32, (b'A' + (i % 3) as u8) as char);
                if i + 1 == spec.groups {
                    Group::new(format!("g{i}"), format!("OPEN-{i}"), capacity, "s1")
                } else {
                    Group::new(format!("g{i}"), name, capacity, "s1").with_eligibility(attrs[i % 2])
                }
            })
            .collect();

        let requests: Vec<Request> = (0..spec.requests)
            .map(|i| {
                let requester = rng.random_range(0..spec.persons);
                let kind = match rng.random_range(0..4u8) {
                    0 | 1 => RequestKind::MutualAffinity,
                    2 => RequestKind::AntiAffinity,
                    _ => RequestKind::AttributePreference(if rng.random_bool(0.5) {
                        AgeDirection::Older
                    } else {
                        AgeDirection::Younger
                    }),
                };
                let mut request = Request::new(
                    format!("r{i:02}"),
                    PersonId::new(format!("p{requester:02}")),
                    kind,
                )
                .with_priority(rng.random_range(1..=10))
                .with_source(sources[rng.random_range(0..sources.len())]);
                if matches!(
                    kind,
                    RequestKind::MutualAffinity | RequestKind::AntiAffinity
                ) {
                    let mut target = rng.random_range(0..spec.persons);
                    if target == requester {
                        target = (target + 1) % spec.persons;
                    }
                    request = request.with_target(PersonId::new(format!("p{target:02}")));
                }
                request
            })
            .collect();

        Self {
            persons,
            groups,
            requests,
            locks: Vec::new(),
            history: Vec::new(),
        }
    }
}
