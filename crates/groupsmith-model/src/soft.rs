//! Soft-constraint and objective builders.
//!
//! Each builder appends labelled `(variable, weight)` terms to the shared
//! accumulator. The composed objective is
//! `Σ satisfied-request weights − Σ penalty·violation + Σ cohort-fit
//! bonuses`; all coefficients come from [`crate::scoring`], the same
//! arithmetic the post-solve analyzer replays.

use tracing::debug;

use groupsmith_config::CapacityMode;
use groupsmith_core::{AgeDirection, RequestKind, Result};

use crate::context::{ModelContext, RuleCategory};
use crate::ir::{CmpOp, LinearExpr};
use crate::scoring;

/// The soft builders, tagged and in their documented order.
/// Request satisfaction runs first because the at-least-one aggregation
/// reads its satisfaction literals.
pub const SOFT_BUILDERS: &[(&str, fn(&mut ModelContext<'_>) -> Result<()>)] = &[
    ("request-satisfaction", request_satisfaction),
    ("soft-capacity-overflow", soft_capacity_overflow),
    ("cohort-flow-bonus", cohort_flow_bonus),
    ("progression", progression),
    ("at-least-one-satisfied", at_least_one_satisfied),
];

/// Runs every soft builder in order, after the hard constraints.
pub fn build_soft_terms(ctx: &mut ModelContext<'_>) -> Result<()> {
    for (tag, builder) in SOFT_BUILDERS {
        let before = ctx.soft.len();
        builder(ctx)?;
        debug!(tag, added = ctx.soft.len() - before, "soft builder");
    }
    Ok(())
}

/// One half-reified satisfaction literal per possible request: the literal
/// may be 1 only while the satisfaction predicate holds, and earns the
/// request's diminished, provenance-scaled weight.
pub fn request_satisfaction(ctx: &mut ModelContext<'_>) -> Result<()> {
    for idx in 0..ctx.requests.len() {
        if !ctx.request_classes[idx].possible {
            continue;
        }
        let request = &ctx.requests[idx];
        let weight = ctx.request_classes[idx].weight;
        let p = ctx
            .person_index(&request.requester)
            .expect("possible request has a known requester");
        let sat = ctx.model.new_bool(format!("sat[{}]", request.id));

        match request.kind {
            RequestKind::MutualAffinity => {
                let t = ctx
                    .person_index(request.target.as_ref().expect("pairwise request has target"))
                    .expect("possible request has a known target");
                ctx.model.add_enforced(
                    format!("sat_same[{}]", request.id),
                    LinearExpr::new()
                        .term(ctx.group_of[p], 1)
                        .term(ctx.group_of[t], -1),
                    CmpOp::Eq,
                    0,
                    [sat.lit()],
                );
            }
            RequestKind::AntiAffinity => {
                let t = ctx
                    .person_index(request.target.as_ref().expect("pairwise request has target"))
                    .expect("possible request has a known target");
                let below = ctx.model.new_bool(format!("sat_below[{}]", request.id));
                let above = ctx.model.new_bool(format!("sat_above[{}]", request.id));
                ctx.model.add_enforced(
                    format!("sat_below_def[{}]", request.id),
                    LinearExpr::new()
                        .term(ctx.group_of[p], 1)
                        .term(ctx.group_of[t], -1),
                    CmpOp::Le,
                    -1,
                    [below.lit()],
                );
                ctx.model.add_enforced(
                    format!("sat_above_def[{}]", request.id),
                    LinearExpr::new()
                        .term(ctx.group_of[p], 1)
                        .term(ctx.group_of[t], -1),
                    CmpOp::Ge,
                    1,
                    [above.lit()],
                );
                ctx.model.add_enforced(
                    format!("sat_apart[{}]", request.id),
                    LinearExpr::new().term(below, 1).term(above, 1),
                    CmpOp::Ge,
                    1,
                    [sat.lit()],
                );
            }
            RequestKind::AttributePreference(direction) => {
                let level = ctx.persons[p].cohort_level;
                for g in 0..ctx.groups.len() {
                    if !ctx.eligible(p, g) {
                        continue;
                    }
                    let disallowed: Vec<i32> = ctx
                        .eligible_levels(g)
                        .into_iter()
                        .filter(|l| match direction {
                            AgeDirection::Older => *l < level,
                            AgeDirection::Younger => *l > level,
                        })
                        .collect();
                    for l in disallowed {
                        let present = ctx.level_presence(g, l);
                        ctx.model.add_enforced(
                            format!("sat_level[{},{},{}]", request.id, ctx.groups[g].id, l),
                            LinearExpr::new().term(present, 1),
                            CmpOp::Le,
                            0,
                            [sat.lit(), ctx.placed[p][g].lit()],
                        );
                    }
                }
            }
        }

        ctx.soft.add_reward(format!("req[{}]", request.id), sat, weight)?;
        ctx.request_sat[idx] = Some(sat);
    }
    Ok(())
}

/// Soft-mode overflow machinery with the unavoidable-overflow exemption.
///
/// Per bucket, the first `population − standard capacity` overflow units
/// are forced by arithmetic and cost nothing; the rest fill unit tiers at
/// escalating per-unit penalties.
pub fn soft_capacity_overflow(ctx: &mut ModelContext<'_>) -> Result<()> {
    if ctx.settings.capacity_mode != CapacityMode::Soft {
        return Ok(());
    }
    let penalties = ctx.settings.overflow_penalties;
    let buckets = scoring::overflow_buckets(&ctx.persons, &ctx.groups, ctx.settings);
    for bucket in buckets {
        let mut overflow_vars = Vec::with_capacity(bucket.groups.len());
        let mut overflow_max = 0;
        for g in bucket.groups {
            let standard = i64::from(ctx.groups[g].capacity).min(ctx.settings.capacity_max);
            let headroom = ctx.settings.capacity_max - standard;
            if headroom <= 0 {
                continue;
            }
            let over = ctx
                .model
                .new_int(format!("overflow[{}]", ctx.groups[g].id), 0, headroom);
            let occ = ctx.occupancy(g);
            ctx.model.add(
                format!("overflow_def[{}]", ctx.groups[g].id),
                occ.term(over, -1),
                CmpOp::Le,
                standard,
            );
            overflow_vars.push(over);
            overflow_max += headroom;
        }
        let penalised_max = (overflow_max - bucket.exempt).max(0);
        if penalised_max == 0 {
            continue;
        }
        let label = bucket.key.label();
        let penalised = ctx
            .model
            .new_int(format!("overflow_penalised[{label}]"), 0, penalised_max);
        let mut budget = LinearExpr::new();
        for over in &overflow_vars {
            budget = budget.term(*over, 1);
        }
        ctx.model.add(
            format!("overflow_budget[{label}]"),
            budget.term(penalised, -1),
            CmpOp::Le,
            bucket.exempt,
        );

        let tier1 = ctx.model.new_int(format!("overflow_tier1[{label}]"), 0, 1);
        let tier2 = ctx.model.new_int(format!("overflow_tier2[{label}]"), 0, 1);
        let tier3 = ctx
            .model
            .new_int(format!("overflow_tier3[{label}]"), 0, penalised_max);
        ctx.model.add(
            format!("overflow_tiers[{label}]"),
            LinearExpr::new()
                .term(tier1, 1)
                .term(tier2, 1)
                .term(tier3, 1)
                .term(penalised, -1),
            CmpOp::Eq,
            0,
        );
        ctx.soft
            .add_penalty(format!("overflow[{label}]/tier1"), tier1, penalties[0])?;
        ctx.soft
            .add_penalty(format!("overflow[{label}]/tier2"), tier2, penalties[1])?;
        ctx.soft
            .add_penalty(format!("overflow[{label}]/tier3"), tier3, penalties[2])?;
    }
    Ok(())
}

/// Slice-based cohort-flow incentives: each rankable group in a bucket gets
/// a target level from its population slice, and every person earns a bonus
/// for landing near their target.
pub fn cohort_flow_bonus(ctx: &mut ModelContext<'_>) -> Result<()> {
    let scale = ctx.settings.cohort_fit_scale;
    let plan = scoring::cohort_flow(&ctx.persons, &ctx.groups, &ctx.ranks, ctx.settings);
    for bucket in plan {
        for &p in &bucket.persons {
            let level = ctx.persons[p].cohort_level;
            for (slot, &g) in bucket.groups.iter().enumerate() {
                let coef = scoring::cohort_fit_coef(level, bucket.targets[slot], bucket.range, scale);
                if coef > 0 {
                    ctx.soft.add_reward(
                        format!("cohort_fit[{},{}]", ctx.persons[p].id, ctx.groups[g].id),
                        ctx.placed[p][g],
                        coef,
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Progression scoring against the prior period: regression to a lower
/// rank is penalised, progression lightly rewarded, ties neutral.
pub fn progression(ctx: &mut ModelContext<'_>) -> Result<()> {
    if ctx.is_disabled(RuleCategory::Progression) {
        return Ok(());
    }
    let latest = scoring::latest_history(ctx.history);
    for (person_id, record) in latest {
        let Some(p) = ctx.person_index(person_id) else {
            continue;
        };
        let Some(prior) = ctx.ranks.rank(&record.prior_group_name) else {
            continue;
        };
        for g in 0..ctx.groups.len() {
            if !ctx.eligible(p, g) {
                continue;
            }
            let Some(rank) = ctx.ranks.rank(&ctx.groups[g].name) else {
                continue;
            };
            let label_id = format!("{},{}", person_id, ctx.groups[g].id);
            if rank < prior && ctx.settings.regression_penalty > 0 {
                ctx.soft.add_penalty(
                    format!("regress[{label_id}]"),
                    ctx.placed[p][g],
                    ctx.settings.regression_penalty,
                )?;
            } else if rank > prior && ctx.settings.progression_bonus > 0 {
                ctx.soft.add_reward(
                    format!("progress[{label_id}]"),
                    ctx.placed[p][g],
                    ctx.settings.progression_bonus,
                )?;
            }
        }
    }
    Ok(())
}

/// Heavy penalty for a person with aggregatable requests none of which is
/// satisfied. The aggregation policy lives in
/// [`scoring::aggregation_for`].
pub fn at_least_one_satisfied(ctx: &mut ModelContext<'_>) -> Result<()> {
    if ctx.is_disabled(RuleCategory::AtLeastOneRequest) {
        return Ok(());
    }
    let penalty = ctx.settings.none_satisfied_penalty;
    for p in 0..ctx.persons.len() {
        let person_id = &ctx.persons[p].id;
        let agg =
            scoring::aggregation_for(person_id, ctx.requests, &ctx.request_classes, ctx.settings);
        if !agg.is_active() {
            continue;
        }
        let none = ctx
            .model
            .new_bool(format!("none_satisfied[{person_id}]"));
        let sats: Vec<_> = agg
            .members
            .iter()
            .filter_map(|idx| ctx.request_sat[*idx])
            .collect();
        if sats.is_empty() {
            // Only impossible requests counted: the penalty is unavoidable.
            ctx.model.fix_bool(none, true);
        } else {
            let mut expr = LinearExpr::new().term(none, 1);
            for sat in sats {
                expr = expr.term(sat, 1);
            }
            ctx.model.add(
                format!("some_satisfied[{person_id}]"),
                expr,
                CmpOp::Ge,
                1,
            );
        }
        ctx.soft
            .add_penalty(format!("none_satisfied[{person_id}]"), none, penalty)?;
    }
    Ok(())
}
