//! Randomised properties: segregation safety and objective parity.

use groupsmith::prelude::*;
use groupsmith_test::{RandomSpec, Scenario};

#[test]
fn segregation_holds_on_random_instances() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let planner = AssignmentPlanner::new(Settings::default());
    for seed in 0..10u64 {
        let scenario = Scenario::random(seed, RandomSpec::default());
        let outcome = planner.plan(scenario.inputs()).unwrap();
        assert!(
            outcome.status.has_solution(),
            "seed {seed} unexpectedly unsolvable"
        );
        let report = outcome.report.unwrap();

        let marker = planner.settings().wildcard_marker.clone();
        for group in &scenario.groups {
            let Some(attr) = group.concrete_eligibility(&marker) else {
                continue;
            };
            for occupant in report.assignment.occupants(&group.id) {
                let person = scenario
                    .persons
                    .iter()
                    .find(|p| &p.id == occupant)
                    .unwrap();
                assert_eq!(
                    person.eligibility.as_deref(),
                    Some(attr),
                    "seed {seed}: {occupant} breaks segregation in {}",
                    group.id
                );
            }
        }
    }
}

#[test]
fn cohort_spread_cap_holds_on_random_instances() {
    let planner = AssignmentPlanner::new(Settings::default());
    let max_spread = planner.settings().max_cohort_spread;
    let marker = planner.settings().wildcard_marker.clone();
    for seed in 20..25u64 {
        let scenario = Scenario::random(seed, RandomSpec::default());
        let outcome = planner.plan(scenario.inputs()).unwrap();
        let report = outcome.report.unwrap();
        for group in &scenario.groups {
            if group.is_wildcard(&marker) {
                continue;
            }
            let mut levels: Vec<i32> = report
                .assignment
                .occupants(&group.id)
                .map(|p| {
                    scenario
                        .persons
                        .iter()
                        .find(|person| &person.id == p)
                        .unwrap()
                        .cohort_level
                })
                .collect();
            levels.sort_unstable();
            levels.dedup();
            assert!(
                levels.len() as i64 <= max_spread,
                "seed {seed}: {} spreads over {} levels",
                group.id,
                levels.len()
            );
        }
    }
}

#[test]
fn objective_parity_on_random_mixed_scenarios() {
    let planner = AssignmentPlanner::new(Settings::default());
    for seed in 100..106u64 {
        let scenario = Scenario::random(
            seed,
            RandomSpec {
                persons: 7,
                groups: 3,
                requests: 6,
                ..RandomSpec::default()
            },
        );
        let outcome = planner.plan(scenario.inputs()).unwrap();
        assert!(outcome.status.has_solution());
        let report = outcome.report.unwrap();
        assert!(
            report.objective_parity(),
            "seed {seed}: solver reported {} but re-derivation yields {}",
            report.stats.objective,
            report.analysis.objective.total()
        );
    }
}

#[test]
fn objective_parity_in_soft_capacity_mode() {
    let mut params = ParamMap::new();
    params
        .set("capacity.mode", ParamValue::Str("soft".into()))
        .unwrap();
    params.set("capacity.max", ParamValue::Int(12)).unwrap();
    let planner = AssignmentPlanner::new(Settings::from_params(&params).unwrap());
    for seed in 200..204u64 {
        let mut scenario = Scenario::random(
            seed,
            RandomSpec {
                persons: 7,
                groups: 3,
                requests: 5,
                ..RandomSpec::default()
            },
        );
        // Tighten standard capacities so overflow actually occurs.
        for group in &mut scenario.groups {
            group.capacity = 2;
        }
        let outcome = planner.plan(scenario.inputs()).unwrap();
        assert!(outcome.status.has_solution());
        let report = outcome.report.unwrap();
        assert!(
            report.objective_parity(),
            "seed {seed}: parity broken in soft mode"
        );
    }
}
