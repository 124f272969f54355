use std::collections::HashSet;

use groupsmith_config::{ParamMap, ParamValue, Settings};
use groupsmith_core::{Group, Lock, Person, PersonId, Request, RequestKind};

use crate::context::{ModelContext, ModelInputs, RuleCategory};
use crate::ir::CmpOp;
use crate::precheck::{precheck, PrecheckWarning};
use crate::{hard, soft};

fn person(id: &str, level: i32, attr: &str, partition: &str) -> Person {
    Person::new(id, id.to_uppercase(), level, partition).with_eligibility(attr)
}

fn inputs_of<'a>(
    persons: &'a [Person],
    groups: &'a [Group],
    requests: &'a [Request],
    locks: &'a [Lock],
) -> ModelInputs<'a> {
    ModelInputs {
        persons,
        groups,
        requests,
        locks,
        history: &[],
    }
}

fn small_settings() -> Settings {
    Settings::from_params(&ParamMap::new().with("capacity.max", ParamValue::Int(10))).unwrap()
}

#[test]
fn assembly_is_deterministic() {
    let persons = vec![
        person("p2", 6, "F", "s1"),
        person("p1", 5, "F", "s1"),
        person("p3", 6, "F", "s1"),
    ];
    let groups = vec![
        Group::new("g2", "L6B", 4, "s1").with_eligibility("F"),
        Group::new("g1", "L6A", 4, "s1").with_eligibility("F"),
    ];
    let settings = small_settings();

    let build = || {
        let ctx = ModelContext::new(
            inputs_of(&persons, &groups, &[], &[]),
            &settings,
            HashSet::new(),
        );
        (0..ctx.model.var_count() as u32)
            .map(|i| ctx.model.var_name(crate::ir::VarId(i)).to_string())
            .collect::<Vec<_>>()
    };
    let first = build();
    let second = build();
    assert_eq!(first, second);
    // Sorted by id: p1's variables come first.
    assert_eq!(first[0], "placed[p1,g1]");
    assert_eq!(first[2], "group_of[p1]");
}

#[test]
fn exactly_one_adds_a_constraint_per_person() {
    let persons = vec![person("p1", 5, "F", "s1"), person("p2", 5, "F", "s1")];
    let groups = vec![Group::new("g1", "L5", 4, "s1").with_eligibility("F")];
    let settings = small_settings();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    let before = ctx.model.constraint_count();
    hard::exactly_one_group(&mut ctx);
    assert_eq!(ctx.model.constraint_count(), before + 2);
    let constraint = ctx.model.constraints().last().unwrap();
    assert_eq!(constraint.op, CmpOp::Eq);
    assert_eq!(constraint.rhs, 1);
}

#[test]
fn partition_boundary_pins_cross_partition_vars() {
    let persons = vec![person("p1", 5, "F", "s1")];
    let groups = vec![
        Group::new("g1", "L5", 4, "s1").with_eligibility("F"),
        Group::new("g2", "L5", 4, "s2").with_eligibility("F"),
    ];
    let settings = small_settings();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    hard::partition_boundary(&mut ctx);
    assert_eq!(ctx.model.bounds(ctx.placed[0][1]), (0, 0));
    assert_eq!(ctx.model.bounds(ctx.placed[0][0]), (0, 1));
}

#[test]
fn segregation_pins_mismatched_attributes_only() {
    let persons = vec![
        person("p1", 5, "F", "s1"),
        person("p2", 5, "M", "s1"),
        Person::new("p3", "P3", 5, "s1"), // missing attribute: unconstrained
    ];
    let groups = vec![
        Group::new("g1", "L5A", 4, "s1").with_eligibility("F"),
        Group::new("g2", "OPEN-1", 4, "s1").with_eligibility("F"),
    ];
    let settings = small_settings();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    hard::eligibility_segregation(&mut ctx);
    // p2 (M) shut out of the F group; the OPEN group takes anyone.
    assert_eq!(ctx.model.bounds(ctx.placed[1][0]), (0, 0));
    assert_eq!(ctx.model.bounds(ctx.placed[1][1]), (0, 1));
    // Missing attribute stays unconstrained.
    assert_eq!(ctx.model.bounds(ctx.placed[2][0]), (0, 1));
}

#[test]
fn segregation_respects_disable_flag() {
    let persons = vec![person("p1", 5, "M", "s1")];
    let groups = vec![Group::new("g1", "L5A", 4, "s1").with_eligibility("F")];
    let settings = small_settings();
    let mut disabled = HashSet::new();
    disabled.insert(RuleCategory::Eligibility);
    let mut ctx = ModelContext::new(inputs_of(&persons, &groups, &[], &[]), &settings, disabled);
    hard::eligibility_segregation(&mut ctx);
    assert_eq!(ctx.model.bounds(ctx.placed[0][0]), (0, 1));
}

#[test]
fn soft_mode_caps_at_ceiling_not_standard() {
    let params = ParamMap::new()
        .with("capacity.mode", ParamValue::Str("soft".into()))
        .with("capacity.max", ParamValue::Int(9));
    let settings = Settings::from_params(&params).unwrap();
    let persons = vec![person("p1", 5, "F", "s1")];
    let groups = vec![Group::new("g1", "L5", 6, "s1").with_eligibility("F")];
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    hard::capacity(&mut ctx);
    let capacity = ctx
        .model
        .constraints()
        .iter()
        .find(|c| c.name == "capacity[g1]")
        .unwrap();
    assert_eq!(capacity.rhs, 9);
}

#[test]
fn conflicting_pins_leave_a_contradiction() {
    let persons = vec![person("p1", 5, "M", "s1")];
    let groups = vec![Group::new("g1", "L5A", 4, "s1").with_eligibility("F")];
    let settings = small_settings();
    let locks = vec![Lock::Pin {
        person: PersonId::new("p1"),
        group: groupsmith_core::GroupId::new("g1"),
    }];
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &locks),
        &settings,
        HashSet::new(),
    );
    hard::build_hard_constraints(&mut ctx);
    assert!(ctx.model.contradiction().is_some());
}

#[test]
fn unplaceable_lock_becomes_empty_exactly_one() {
    let persons = vec![
        person("p1", 5, "F", "s1"),
        person("p2", 5, "F", "s1"),
        person("p3", 5, "F", "s1"),
    ];
    let groups = vec![Group::new("g1", "L5", 2, "s1").with_eligibility("F")];
    let settings = small_settings();
    let locks = vec![Lock::Together {
        name: "trio".into(),
        members: vec![
            PersonId::new("p1"),
            PersonId::new("p2"),
            PersonId::new("p3"),
        ],
    }];
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &locks),
        &settings,
        HashSet::new(),
    );
    hard::group_locks(&mut ctx);
    let lock_one = ctx
        .model
        .constraints()
        .iter()
        .find(|c| c.name == "lock_one[trio]")
        .unwrap();
    assert!(lock_one.expr.terms.is_empty());
    assert_eq!(lock_one.rhs, 1);

    let warnings = precheck(&ctx);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, PrecheckWarning::LockUnplaceable { size: 3, .. })));
}

#[test]
fn request_terms_land_in_the_accumulator() {
    let persons = vec![person("p1", 5, "F", "s1"), person("p2", 5, "F", "s1")];
    let groups = vec![
        Group::new("g1", "L5A", 4, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 4, "s1").with_eligibility("F"),
    ];
    let requests = vec![
        Request::new("r1", PersonId::new("p1"), RequestKind::MutualAffinity)
            .with_target(PersonId::new("p2"))
            .with_priority(7),
    ];
    let settings = small_settings();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &requests, &[]),
        &settings,
        HashSet::new(),
    );
    hard::build_hard_constraints(&mut ctx);
    soft::build_soft_terms(&mut ctx).unwrap();

    assert!(ctx.request_sat[0].is_some());
    let term = ctx
        .soft
        .terms()
        .iter()
        .find(|t| t.label == "req[r1]")
        .unwrap();
    assert_eq!(term.weight, 70);
    // The requester also gets an at-least-one penalty variable.
    assert!(ctx
        .soft
        .terms()
        .iter()
        .any(|t| t.label == "none_satisfied[p1]" && t.weight < 0));
}

#[test]
fn impossible_request_gets_no_sat_variable() {
    let persons = vec![person("p1", 5, "F", "s1"), person("p2", 5, "F", "s2")];
    let groups = vec![
        Group::new("g1", "L5A", 4, "s1").with_eligibility("F"),
        Group::new("g2", "L5B", 4, "s2").with_eligibility("F"),
    ];
    let requests = vec![
        Request::new("r1", PersonId::new("p1"), RequestKind::MutualAffinity)
            .with_target(PersonId::new("p2")),
    ];
    let settings = small_settings();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &requests, &[]),
        &settings,
        HashSet::new(),
    );
    hard::build_hard_constraints(&mut ctx);
    soft::build_soft_terms(&mut ctx).unwrap();

    assert!(ctx.request_sat[0].is_none());
    assert!(!ctx.soft.terms().iter().any(|t| t.label == "req[r1]"));
    // Excluded from aggregation by default: no penalty variable either.
    assert!(!ctx
        .soft
        .terms()
        .iter()
        .any(|t| t.label == "none_satisfied[p1]"));

    let warnings = precheck(&ctx);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, PrecheckWarning::ImpossibleRequest { .. })));
}

#[test]
fn stranded_person_is_reported() {
    let persons = vec![person("p1", 5, "M", "s1")];
    let groups = vec![Group::new("g1", "L5A", 4, "s1").with_eligibility("F")];
    let settings = small_settings();
    let ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    let warnings = precheck(&ctx);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, PrecheckWarning::StrandedPerson { .. })));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, PrecheckWarning::BucketShortfall { .. })));
}

#[test]
fn cohort_spread_counts_presence_literals() {
    let persons = vec![
        person("p1", 4, "F", "s1"),
        person("p2", 5, "F", "s1"),
        person("p3", 6, "F", "s1"),
        person("p4", 7, "F", "s1"),
    ];
    let groups = vec![Group::new("g1", "L5", 8, "s1").with_eligibility("F")];
    let params = ParamMap::new().with("cohort.max_spread", ParamValue::Int(2));
    let settings = Settings::from_params(&params).unwrap();
    let mut ctx = ModelContext::new(
        inputs_of(&persons, &groups, &[], &[]),
        &settings,
        HashSet::new(),
    );
    hard::cohort_spread_cap(&mut ctx);
    let spread = ctx
        .model
        .constraints()
        .iter()
        .find(|c| c.name == "cohort_spread[g1]")
        .unwrap();
    assert_eq!(spread.expr.terms.len(), 4);
    assert_eq!(spread.rhs, 2);
}
