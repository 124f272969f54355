//! Hard-constraint builders.
//!
//! One function per non-negotiable rule, each a side-effecting transform of
//! the shared model. [`build_hard_constraints`] composes them in a fixed
//! order, always before any soft term is accumulated.

use tracing::{debug, warn};

use groupsmith_core::Lock;

use crate::context::{ModelContext, RuleCategory};
use crate::ir::{CmpOp, LinearExpr};
use crate::scoring::{self, BucketKey};

/// The hard builders, tagged and in their documented order. Hard rules
/// always run before any soft term is accumulated.
pub const HARD_BUILDERS: &[(&str, fn(&mut ModelContext<'_>))] = &[
    ("exactly-one-group", exactly_one_group),
    ("partition-boundary", partition_boundary),
    ("capacity", capacity),
    ("eligibility-segregation", eligibility_segregation),
    ("minimum-occupancy", minimum_occupancy),
    ("cohort-spread-cap", cohort_spread_cap),
    ("group-locks", group_locks),
];

/// Runs every hard builder in order.
pub fn build_hard_constraints(ctx: &mut ModelContext<'_>) {
    for (tag, builder) in HARD_BUILDERS {
        let before = ctx.model.constraint_count();
        builder(ctx);
        debug!(tag, added = ctx.model.constraint_count() - before, "hard builder");
    }
}

/// Every person occupies exactly one group.
pub fn exactly_one_group(ctx: &mut ModelContext<'_>) {
    for p in 0..ctx.persons.len() {
        let expr = LinearExpr::sum(ctx.placed[p].iter().copied());
        ctx.model
            .add(format!("one_group[{}]", ctx.persons[p].id), expr, CmpOp::Eq, 1);
    }
}

/// No person may occupy a group outside their partition.
pub fn partition_boundary(ctx: &mut ModelContext<'_>) {
    if ctx.is_disabled(RuleCategory::SessionBoundary) {
        return;
    }
    for p in 0..ctx.persons.len() {
        for g in 0..ctx.groups.len() {
            if ctx.persons[p].partition != ctx.groups[g].partition {
                ctx.model.fix_bool(ctx.placed[p][g], false);
            }
        }
    }
}

/// Hard occupancy ceilings. In hard mode the standard capacity binds; in
/// soft mode only the absolute ceiling does, and overflow above standard
/// capacity becomes a penalty in the soft builders.
pub fn capacity(ctx: &mut ModelContext<'_>) {
    use groupsmith_config::CapacityMode;

    for g in 0..ctx.groups.len() {
        let standard = i64::from(ctx.groups[g].capacity).min(ctx.settings.capacity_max);
        let ceiling = match ctx.settings.capacity_mode {
            CapacityMode::Hard => standard,
            CapacityMode::Soft => ctx.settings.capacity_max,
        };
        let expr = ctx.occupancy(g);
        ctx.model
            .add(format!("capacity[{}]", ctx.groups[g].id), expr, CmpOp::Le, ceiling);
    }
}

/// Safety-critical segregation: a concrete-eligibility group only takes
/// people with the matching attribute. People with no attribute data are
/// logged and left unconstrained, never silently dropped.
pub fn eligibility_segregation(ctx: &mut ModelContext<'_>) {
    if ctx.is_disabled(RuleCategory::Eligibility) {
        return;
    }
    let marker = ctx.settings.wildcard_marker.clone();
    for p in 0..ctx.persons.len() {
        if ctx.persons[p].eligibility.is_none() {
            warn!(person = %ctx.persons[p].id, "person has no eligibility attribute; segregation leaves them unconstrained");
            continue;
        }
        for g in 0..ctx.groups.len() {
            let group = ctx.groups[g];
            if let Some(attr) = group.concrete_eligibility(&marker) {
                if ctx.persons[p].eligibility.as_deref() != Some(attr) {
                    ctx.model.fix_bool(ctx.placed[p][g], false);
                }
            }
        }
    }
}

/// Groups are either unused or hold at least the configured minimum.
///
/// `used[g]` reifies "occupancy ≥ 1". In force-full-use mode, every group
/// of a bucket is pinned used whenever the bucket's eligible population can
/// fill all of its groups to the minimum.
pub fn minimum_occupancy(ctx: &mut ModelContext<'_>) {
    let min = ctx.settings.min_occupancy;
    if min <= 0 {
        return;
    }

    let mut used_vars = Vec::with_capacity(ctx.groups.len());
    for g in 0..ctx.groups.len() {
        let used = ctx.model.new_bool(format!("used[{}]", ctx.groups[g].id));
        let occ = ctx.occupancy(g);
        ctx.model.add_enforced(
            format!("min_occupancy[{}]", ctx.groups[g].id),
            occ.clone(),
            CmpOp::Ge,
            min,
            [used.lit()],
        );
        ctx.model.add_enforced(
            format!("unused_empty[{}]", ctx.groups[g].id),
            occ,
            CmpOp::Le,
            0,
            [used.negated()],
        );
        used_vars.push(used);
    }

    if !ctx.settings.force_full_use {
        return;
    }
    let marker = ctx.settings.wildcard_marker.clone();
    let mut buckets: std::collections::BTreeMap<BucketKey, Vec<usize>> = Default::default();
    for g in 0..ctx.groups.len() {
        buckets
            .entry(scoring::group_bucket(ctx.groups[g], &marker))
            .or_default()
            .push(g);
    }
    for (key, groups) in buckets {
        let population = (0..ctx.persons.len())
            .filter(|p| groups.iter().any(|g| ctx.eligible(*p, *g)))
            .count() as i64;
        if population >= min * groups.len() as i64 {
            debug!(bucket = %key.label(), groups = groups.len(), population, "forcing full use");
            for g in groups {
                ctx.model.fix_bool(used_vars[g], true);
            }
        }
    }
}

/// Caps the number of distinct cohort levels among a concrete group's
/// eligible occupants. Wildcard groups are exempt.
pub fn cohort_spread_cap(ctx: &mut ModelContext<'_>) {
    if ctx.is_disabled(RuleCategory::CohortSpread) {
        return;
    }
    let max_spread = ctx.settings.max_cohort_spread;
    let marker = ctx.settings.wildcard_marker.clone();
    for g in 0..ctx.groups.len() {
        if ctx.groups[g].is_wildcard(&marker) {
            continue;
        }
        let levels = ctx.eligible_levels(g);
        if (levels.len() as i64) <= max_spread {
            continue;
        }
        let presence: Vec<_> = levels
            .iter()
            .map(|level| ctx.level_presence(g, *level))
            .collect();
        ctx.model.add(
            format!("cohort_spread[{}]", ctx.groups[g].id),
            LinearExpr::sum(presence),
            CmpOp::Le,
            max_spread,
        );
    }
}

/// Pins and together-locks.
///
/// A pin fixes one placed variable. A together-lock gets one "lock-here"
/// indicator per candidate group with all-or-none membership; groups too
/// small for the whole lock are excluded outright. A lock without any
/// candidate leaves the model infeasible, which the pre-checker reports.
pub fn group_locks(ctx: &mut ModelContext<'_>) {
    use groupsmith_config::CapacityMode;

    if ctx.is_disabled(RuleCategory::GroupLock) {
        return;
    }
    for lock in ctx.locks {
        match lock {
            Lock::Pin { person, group } => {
                let (Some(p), Some(g)) = (ctx.person_index(person), ctx.group_index(group))
                else {
                    warn!(lock = %lock.label(), "pin references unknown person or group; skipped");
                    continue;
                };
                ctx.model.fix_bool(ctx.placed[p][g], true);
            }
            Lock::Together { name, members } => {
                let mut indices = Vec::with_capacity(members.len());
                for member in members {
                    match ctx.person_index(member) {
                        Some(p) => indices.push(p),
                        None => {
                            warn!(lock = name.as_str(), member = %member, "lock member unknown; skipped");
                        }
                    }
                }
                if indices.len() < 2 {
                    continue;
                }
                let size = indices.len() as i64;
                let mut candidates = Vec::new();
                for g in 0..ctx.groups.len() {
                    let standard = i64::from(ctx.groups[g].capacity).min(ctx.settings.capacity_max);
                    let ceiling = match ctx.settings.capacity_mode {
                        CapacityMode::Hard => standard,
                        CapacityMode::Soft => ctx.settings.capacity_max,
                    };
                    let fits = ceiling >= size && indices.iter().all(|p| ctx.eligible(*p, g));
                    if fits {
                        candidates.push(g);
                    } else {
                        for p in &indices {
                            ctx.model.fix_bool(ctx.placed[*p][g], false);
                        }
                    }
                }
                let mut here_vars = Vec::with_capacity(candidates.len());
                for g in candidates {
                    let here = ctx
                        .model
                        .new_bool(format!("lock_here[{},{}]", name, ctx.groups[g].id));
                    for p in &indices {
                        ctx.model.add(
                            format!("lock_member[{},{},{}]", name, ctx.persons[*p].id, ctx.groups[g].id),
                            LinearExpr::new().term(ctx.placed[*p][g], 1).term(here, -1),
                            CmpOp::Eq,
                            0,
                        );
                    }
                    here_vars.push(here);
                }
                // With zero candidates this is an empty sum pinned to 1:
                // correctly infeasible, reported by the pre-checker.
                ctx.model.add(
                    format!("lock_one[{name}]"),
                    LinearExpr::sum(here_vars),
                    CmpOp::Eq,
                    1,
                );
            }
        }
    }
}
