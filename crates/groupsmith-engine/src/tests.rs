use std::time::Duration;

use groupsmith_model::ir::{CmpOp, CpModel, LinearExpr};
use groupsmith_model::{Engine, SolveParams, SolveStatus};

use crate::BranchBoundEngine;

fn params() -> SolveParams {
    SolveParams::new(Duration::from_secs(5))
}

#[test]
fn maximises_free_booleans() {
    let mut model = CpModel::new();
    let a = model.new_bool("a");
    let b = model.new_bool("b");
    model.add_objective_term("a", a.id(), 3);
    model.add_objective_term("b", b.id(), -2);

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    let values = solution.values.unwrap();
    assert!(values.bool_value(a));
    assert!(!values.bool_value(b));
    assert_eq!(solution.objective, 3);
}

#[test]
fn respects_exactly_one() {
    let mut model = CpModel::new();
    let vars: Vec<_> = (0..4).map(|i| model.new_bool(format!("x{i}"))).collect();
    model.add(
        "one",
        LinearExpr::sum(vars.iter().copied()),
        CmpOp::Eq,
        1,
    );
    for (i, v) in vars.iter().enumerate() {
        model.add_objective_term(format!("x{i}"), v.id(), (i as i64) + 1);
    }

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    // The most valuable variable wins.
    assert_eq!(solution.objective, 4);
    let values = solution.values.unwrap();
    assert!(values.bool_value(vars[3]));
    assert_eq!(
        vars.iter().filter(|v| values.bool_value(**v)).count(),
        1
    );
}

#[test]
fn detects_infeasible_sum() {
    let mut model = CpModel::new();
    let a = model.new_bool("a");
    let b = model.new_bool("b");
    model.add(
        "too_much",
        LinearExpr::sum([a, b]),
        CmpOp::Ge,
        3,
    );
    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Infeasible);
    assert!(solution.values.is_none());
}

#[test]
fn honours_enforcement_literals() {
    let mut model = CpModel::new();
    let guard = model.new_bool("guard");
    let x = model.new_int("x", 0, 10);
    // guard ⟹ x ≤ 2; reward both guard and x.
    model.add_enforced(
        "guarded_cap",
        LinearExpr::new().term(x, 1),
        CmpOp::Le,
        2,
        [guard.lit()],
    );
    model.add_objective_term("guard", guard.id(), 100);
    model.add_objective_term("x", x.id(), 1);

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    let values = solution.values.unwrap();
    // Claiming the guard is worth capping x.
    assert!(values.bool_value(guard));
    assert_eq!(values.int_value(x), 2);
    assert_eq!(solution.objective, 102);
}

#[test]
fn forces_guard_false_when_constraint_cannot_hold() {
    let mut model = CpModel::new();
    let guard = model.new_bool("guard");
    let x = model.new_int("x", 5, 10);
    model.add_enforced(
        "impossible_under_guard",
        LinearExpr::new().term(x, 1),
        CmpOp::Le,
        2,
        [guard.lit()],
    );
    model.add_objective_term("guard", guard.id(), 100);

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    assert!(!solution.values.unwrap().bool_value(guard));
    assert_eq!(solution.objective, 0);
}

#[test]
fn negated_literal_enforcement() {
    let mut model = CpModel::new();
    let used = model.new_bool("used");
    let occ = model.new_int("occ", 0, 6);
    // used = 0 ⟹ occ ≤ 0; used = 1 ⟹ occ ≥ 3.
    model.add_enforced(
        "empty_when_unused",
        LinearExpr::new().term(occ, 1),
        CmpOp::Le,
        0,
        [used.negated()],
    );
    model.add_enforced(
        "min_when_used",
        LinearExpr::new().term(occ, 1),
        CmpOp::Ge,
        3,
        [used.lit()],
    );
    model.add_objective_term("occ", occ.id(), 1);

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    let values = solution.values.unwrap();
    assert!(values.bool_value(used));
    assert_eq!(values.int_value(occ), 6);
}

#[test]
fn contradicted_model_is_infeasible_immediately() {
    let mut model = CpModel::new();
    let a = model.new_bool("a");
    model.fix_bool(a, true);
    model.fix_bool(a, false);
    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Infeasible);
}

#[test]
fn decision_order_is_respected_and_optimal_found() {
    let mut model = CpModel::new();
    // Two people, two groups, pairwise "same group" bonus.
    let gi_a = model.new_int("gi_a", 0, 1);
    let gi_b = model.new_int("gi_b", 0, 1);
    model.add_decision(gi_a);
    model.add_decision(gi_b);
    let sat = model.new_bool("sat");
    model.add_enforced(
        "same",
        LinearExpr::new().term(gi_a, 1).term(gi_b, -1),
        CmpOp::Eq,
        0,
        [sat.lit()],
    );
    model.add_objective_term("sat", sat.id(), 7);

    let solution = BranchBoundEngine::new().solve(&model, &params()).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);
    assert_eq!(solution.objective, 7);
    let values = solution.values.unwrap();
    assert_eq!(values.int_value(gi_a), values.int_value(gi_b));
    assert!(values.bool_value(sat));
}
