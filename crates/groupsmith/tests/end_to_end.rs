//! End-to-end planning scenarios against the reference engine.

use groupsmith::prelude::*;
use groupsmith::{Diagnosis, RuleCategory};
use groupsmith_test::Scenario;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn settings(pairs: &[(&str, ParamValue)]) -> Settings {
    let mut params = ParamMap::new();
    for (key, value) in pairs {
        params.set(key, value.clone()).unwrap();
    }
    Settings::from_params(&params).unwrap()
}

#[test]
fn balanced_two_group_scenario_is_optimal() {
    init_tracing();
    let scenario = Scenario::two_cohorts_two_groups();
    let planner = AssignmentPlanner::new(settings(&[
        ("capacity.max", ParamValue::Int(10)),
        ("cohort.max_spread", ParamValue::Int(2)),
    ]));
    let outcome = planner.plan(scenario.inputs()).unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);

    let report = outcome.report.unwrap();
    let g1 = GroupId::new("g1");
    let g2 = GroupId::new("g2");
    assert_eq!(report.assignment.occupancy(&g1), 6);
    assert_eq!(report.assignment.occupancy(&g2), 6);

    for group in [&g1, &g2] {
        let mut levels: Vec<i32> = report
            .assignment
            .occupants(group)
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
        assert!(levels.len() <= 2);
    }

    // The cohort-flow optimum: level 5 fills L5A, level 6 fills L6A.
    assert_eq!(report.stats.objective, 120);
    assert!(report.objective_parity());
}

#[test]
fn capacity_shortfall_is_infeasible_with_diagnosis() {
    let persons: Vec<Person> = (0..5)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![Group::new("g1", "L5", 4, "s1").with_eligibility("F")];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Infeasible);
    assert!(outcome.report.is_none());
    // No single rule category explains a raw capacity shortfall.
    assert_eq!(outcome.diagnosis, Some(Diagnosis::MultipleInteracting));
}

#[test]
fn together_lock_is_atomic() {
    let persons: Vec<Person> = (0..6)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 3, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 3, "s1").with_eligibility("F"),
    ];
    let locks = vec![Lock::Together {
        name: "trio".into(),
        members: vec![
            PersonId::new("p0"),
            PersonId::new("p1"),
            PersonId::new("p2"),
        ],
    }];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &locks,
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Optimal);
    let report = outcome.report.unwrap();
    let home = report.assignment.group_of(&PersonId::new("p0")).unwrap();
    assert_eq!(report.assignment.group_of(&PersonId::new("p1")), Some(home));
    assert_eq!(report.assignment.group_of(&PersonId::new("p2")), Some(home));
}

#[test]
fn oversized_lock_is_diagnosed_as_group_lock() {
    let persons: Vec<Person> = (0..4)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 3, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 3, "s1").with_eligibility("F"),
    ];
    let locks = vec![Lock::Together {
        name: "quartet".into(),
        members: persons.iter().map(|p| p.id.clone()).collect(),
    }];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &locks,
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Infeasible);
    assert_eq!(
        outcome.diagnosis,
        Some(Diagnosis::Blocking(RuleCategory::GroupLock))
    );
}

#[test]
fn stranded_attribute_is_diagnosed_as_eligibility() {
    let persons = vec![
        Person::new("p1", "P1", 5, "s1").with_eligibility("M"),
        Person::new("p2", "P2", 5, "s1").with_eligibility("F"),
    ];
    let groups = vec![Group::new("g1", "L5", 4, "s1").with_eligibility("F")];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Infeasible);
    assert_eq!(
        outcome.diagnosis,
        Some(Diagnosis::Blocking(RuleCategory::Eligibility))
    );
}

#[test]
fn unavoidable_overflow_costs_nothing() {
    // 7 people into 2 + 2 standard seats: 3 overflow units are forced.
    let persons: Vec<Person> = (0..7)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 2, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 2, "s1").with_eligibility("F"),
    ];
    let planner = AssignmentPlanner::new(settings(&[
        ("capacity.mode", ParamValue::Str("soft".into())),
        ("capacity.max", ParamValue::Int(10)),
    ]));
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Optimal);
    let report = outcome.report.unwrap();
    assert_eq!(report.analysis.objective.overflow_penalty, 0);
    assert!(report.objective_parity());
}

#[test]
fn overflow_beyond_unavoidable_pays_escalating_penalty() {
    // Same bucket, but strong affinities pull six people into one group:
    // one unit beyond the three unavoidable ones gets the first-tier rate.
    let persons: Vec<Person> = (0..7)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 2, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 2, "s1").with_eligibility("F"),
    ];
    let requests: Vec<Request> = (1..6)
        .map(|i| {
            Request::new(format!("r{i}"), PersonId::new(format!("p{i}")), RequestKind::MutualAffinity)
                .with_target(PersonId::new("p0"))
                .with_priority(10)
        })
        .collect();
    let planner = AssignmentPlanner::new(settings(&[
        ("capacity.mode", ParamValue::Str("soft".into())),
        ("capacity.max", ParamValue::Int(10)),
    ]));
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &requests,
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Optimal);
    let report = outcome.report.unwrap();
    // All five requesters share p0's group.
    let home = report.assignment.group_of(&PersonId::new("p0")).unwrap().clone();
    assert_eq!(report.assignment.occupancy(&home), 6);
    assert_eq!(report.analysis.objective.request_score, 500);
    // Overflow is 4 of which 3 are exempt: one penalised unit at tier 1.
    assert_eq!(report.analysis.objective.overflow_penalty, 50);
    assert!(report.objective_parity());
}

#[test]
fn anti_affinity_splits_the_pair() {
    let persons: Vec<Person> = (0..4)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 2, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 2, "s1").with_eligibility("F"),
    ];
    let requests = vec![
        Request::new("r1", PersonId::new("p0"), RequestKind::AntiAffinity)
            .with_target(PersonId::new("p1"))
            .with_priority(9),
    ];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &requests,
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Optimal);
    let report = outcome.report.unwrap();
    assert!(!report
        .assignment
        .same_group(&PersonId::new("p0"), &PersonId::new("p1")));
    assert_eq!(
        report.satisfied.get(&PersonId::new("p0")),
        Some(&vec![RequestId::new("r1")])
    );
    assert!(report.objective_parity());
}

#[test]
fn force_full_use_spreads_to_the_minimum() {
    let persons: Vec<Person> = (0..6)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}"), 5, "s1").with_eligibility("F"))
        .collect();
    let groups = vec![
        Group::new("g1", "L5A", 6, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 6, "s1").with_eligibility("F"),
    ];
    let planner = AssignmentPlanner::new(settings(&[
        ("capacity.min_occupancy", ParamValue::Int(3)),
        ("capacity.force_full_use", ParamValue::Bool(true)),
    ]));
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &[],
        })
        .unwrap();

    assert_eq!(outcome.status, SolveStatus::Optimal);
    let report = outcome.report.unwrap();
    // Population 6 covers 2 groups × minimum 3: both groups must be used
    // and therefore hold the minimum each.
    assert_eq!(report.assignment.occupancy(&GroupId::new("g1")), 3);
    assert_eq!(report.assignment.occupancy(&GroupId::new("g2")), 3);
}

#[test]
fn progression_prefers_the_higher_ranked_group() {
    let persons = vec![Person::new("p1", "P1", 5, "s1").with_eligibility("F")];
    let groups = vec![
        Group::new("g1", "L4A", 4, "s1").with_eligibility("F"),
        Group::new("g2", "L6A", 4, "s1").with_eligibility("F"),
    ];
    let history = vec![HistoricalRecord {
        person: PersonId::new("p1"),
        prior_group_name: "L5A".into(),
        period: "2025".into(),
    }];
    let planner = AssignmentPlanner::new(Settings::default());
    let outcome = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &history,
        })
        .unwrap();

    let report = outcome.report.unwrap();
    assert_eq!(
        report.assignment.group_of(&PersonId::new("p1")),
        Some(&GroupId::new("g2"))
    );
    assert_eq!(report.analysis.objective.progression_bonus, 5);
    assert_eq!(report.analysis.objective.regression_penalty, 0);
    assert!(report.objective_parity());
}

#[test]
fn partitioned_plan_matches_single_model() {
    let mut persons = Vec::new();
    let mut groups = Vec::new();
    let mut requests = Vec::new();
    for (session, offset) in [("june", 0), ("july", 10)] {
        for i in 0..4 {
            persons.push(
                Person::new(
                    format!("p{}", offset + i),
                    format!("P{}", offset + i),
                    5 + (i % 2),
                    session,
                )
                .with_eligibility("F"),
            );
        }
        groups.push(
            Group::new(format!("g{}a", session), "L5A", 4, session).with_eligibility("F"),
        );
        groups.push(
            Group::new(format!("g{}b", session), "L6A", 4, session).with_eligibility("F"),
        );
        requests.push(
            Request::new(
                format!("r{}", offset),
                PersonId::new(format!("p{}", offset)),
                RequestKind::MutualAffinity,
            )
            .with_target(PersonId::new(format!("p{}", offset + 1)))
            .with_priority(6),
        );
    }
    let inputs = ModelInputs {
        persons: &persons,
        groups: &groups,
        requests: &requests,
        locks: &[],
        history: &[],
    };
    let planner = AssignmentPlanner::new(Settings::default());

    let whole = planner.plan(inputs).unwrap();
    let split = planner.plan_partitioned(inputs).unwrap();

    assert_eq!(whole.status, SolveStatus::Optimal);
    assert_eq!(split.status, SolveStatus::Optimal);
    let whole_report = whole.report.unwrap();
    let split_report = split.report.unwrap();
    assert_eq!(
        whole_report.stats.objective,
        split_report.stats.objective
    );
    assert!(split_report.objective_parity());
}

#[test]
fn duplicate_ids_fail_validation() {
    let persons = vec![
        Person::new("p1", "P1", 5, "s1"),
        Person::new("p1", "P1 again", 5, "s1"),
    ];
    let groups = vec![Group::new("g1", "L5", 4, "s1")];
    let planner = AssignmentPlanner::new(Settings::default());
    let err = planner
        .plan(ModelInputs {
            persons: &persons,
            groups: &groups,
            requests: &[],
            locks: &[],
            history: &[],
        })
        .unwrap_err();
    assert!(matches!(
        err,
        groupsmith::GroupsmithError::Validation(_)
    ));
}
