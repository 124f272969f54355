//! Depth-first branch-and-bound search.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use groupsmith_core::Result;
use groupsmith_model::ir::{CpModel, VarId};
use groupsmith_model::{Engine, EngineSolution, SolveParams, SolveStatus, VarValues};

use crate::propagate::{propagate, set_hi, set_lo, Domains, Trail};

/// Exhaustive branch-and-bound engine.
///
/// Deterministic: branching follows the declared decision order, then
/// variable creation order, trying objective-preferred values first. Do not
/// rely on that determinism across engines.
#[derive(Debug, Clone, Default)]
pub struct BranchBoundEngine;

impl BranchBoundEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for BranchBoundEngine {
    fn name(&self) -> &'static str {
        "branch-bound"
    }

    fn solve(&self, model: &CpModel, params: &SolveParams) -> Result<EngineSolution> {
        let start = Instant::now();
        if params.workers > 1 {
            debug!(
                workers = params.workers,
                "branch-bound is single-threaded; extra workers ignored"
            );
        }

        if let Some(reason) = model.contradiction() {
            debug!(reason, "model contradicted by pinning alone");
            return Ok(infeasible(start.elapsed()));
        }

        let mut domains = Domains::from_model(model);
        let mut trail = Trail::default();
        if propagate(model, &mut domains, &mut trail).is_err() {
            return Ok(infeasible(start.elapsed()));
        }

        let mut search = Search::new(model, start + params.time_limit);
        search.explore(&mut domains, &mut trail, 0);

        let wall_time = start.elapsed();
        let status = match (&search.best, search.timed_out) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Unknown,
        };
        debug!(%status, nodes = search.nodes, wall_time_ms = wall_time.as_millis() as u64, "search done");

        let (values, objective) = match search.best {
            Some((values, objective)) => (Some(VarValues::new(values)), objective),
            None => (None, 0),
        };
        Ok(EngineSolution {
            status,
            values,
            objective,
            wall_time,
        })
    }
}

fn infeasible(wall_time: Duration) -> EngineSolution {
    EngineSolution {
        status: SolveStatus::Infeasible,
        values: None,
        objective: 0,
        wall_time,
    }
}

struct Search<'a> {
    model: &'a CpModel,
    /// Decision variables first, then the rest in creation order.
    order: Vec<VarId>,
    /// Net objective coefficient per variable.
    coef: Vec<i64>,
    deadline: Instant,
    best: Option<(Vec<i64>, i64)>,
    nodes: u64,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(model: &'a CpModel, deadline: Instant) -> Self {
        let mut coef = vec![0i64; model.var_count()];
        for term in model.objective() {
            coef[term.var.index()] += term.coef;
        }
        let mut seen = vec![false; model.var_count()];
        let mut order = Vec::with_capacity(model.var_count());
        for var in model.decisions() {
            if !seen[var.index()] {
                seen[var.index()] = true;
                order.push(*var);
            }
        }
        for i in 0..model.var_count() {
            if !seen[i] {
                order.push(VarId(i as u32));
            }
        }
        Self {
            model,
            order,
            coef,
            deadline,
            best: None,
            nodes: 0,
            timed_out: false,
        }
    }

    /// Best objective still reachable given current bounds.
    fn optimistic_bound(&self, domains: &Domains) -> i64 {
        self.coef
            .iter()
            .enumerate()
            .map(|(idx, c)| (c * domains.lo[idx]).max(c * domains.hi[idx]))
            .sum()
    }

    fn explore(&mut self, domains: &mut Domains, trail: &mut Trail, pos: usize) {
        if self.timed_out {
            return;
        }
        self.nodes += 1;
        if self.nodes % 256 == 0 && Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }
        if let Some((_, best_objective)) = &self.best {
            // Only a strict improvement is worth exploring.
            if self.optimistic_bound(domains) <= *best_objective {
                return;
            }
        }

        let mut pos = pos;
        while pos < self.order.len() && domains.is_fixed(self.order[pos]) {
            pos += 1;
        }
        if pos == self.order.len() {
            let values = domains.lo.clone();
            let objective = self.model.objective_value(&values);
            trace!(objective, "leaf");
            match &self.best {
                Some((_, best)) if objective <= *best => {}
                _ => self.best = Some((values, objective)),
            }
            return;
        }

        let var = self.order[pos];
        let lo = domains.lo[var.index()];
        let hi = domains.hi[var.index()];
        let prefer_high = self.coef[var.index()] > 0;
        let mut value = if prefer_high { hi } else { lo };
        loop {
            let mark = trail.mark();
            let feasible = set_lo(domains, trail, var, value)
                .and_then(|_| set_hi(domains, trail, var, value))
                .and_then(|_| propagate(self.model, domains, trail));
            if feasible.is_ok() {
                self.explore(domains, trail, pos + 1);
            }
            trail.undo_to(mark, domains);
            if self.timed_out {
                return;
            }
            if prefer_high {
                if value == lo {
                    break;
                }
                value -= 1;
            } else {
                if value == hi {
                    break;
                }
                value += 1;
            }
        }
    }
}
