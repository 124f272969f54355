//! Bound propagation over linear constraints.

use groupsmith_model::ir::{CmpOp, CpModel, LinearConstraint, Lit, VarId};

/// Current lower/upper bounds per variable.
#[derive(Debug, Clone)]
pub struct Domains {
    pub lo: Vec<i64>,
    pub hi: Vec<i64>,
}

impl Domains {
    pub fn from_model(model: &CpModel) -> Self {
        let mut lo = Vec::with_capacity(model.var_count());
        let mut hi = Vec::with_capacity(model.var_count());
        for i in 0..model.var_count() {
            let (l, h) = model.bounds(VarId(i as u32));
            lo.push(l);
            hi.push(h);
        }
        Self { lo, hi }
    }

    pub fn is_fixed(&self, var: VarId) -> bool {
        self.lo[var.index()] == self.hi[var.index()]
    }

    /// Truth of a literal, `None` while its variable is unfixed.
    fn lit_value(&self, lit: Lit) -> Option<bool> {
        let idx = lit.var.index();
        if self.lo[idx] != self.hi[idx] {
            return None;
        }
        let truthy = self.lo[idx] != 0;
        Some(truthy != lit.negated)
    }
}

/// Undo log of bound changes for backtracking.
#[derive(Debug, Default)]
pub struct Trail {
    entries: Vec<(u32, i64, i64)>,
}

impl Trail {
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    pub fn undo_to(&mut self, mark: usize, domains: &mut Domains) {
        while self.entries.len() > mark {
            let (var, lo, hi) = self.entries.pop().expect("trail entry");
            domains.lo[var as usize] = lo;
            domains.hi[var as usize] = hi;
        }
    }

    fn record(&mut self, var: usize, domains: &Domains) {
        self.entries
            .push((var as u32, domains.lo[var], domains.hi[var]));
    }
}

/// Raises a lower bound. Returns `Err(())` on an emptied domain.
pub fn set_lo(domains: &mut Domains, trail: &mut Trail, var: VarId, value: i64) -> Result<bool, ()> {
    let idx = var.index();
    if value <= domains.lo[idx] {
        return Ok(false);
    }
    trail.record(idx, domains);
    domains.lo[idx] = value;
    if domains.lo[idx] > domains.hi[idx] {
        return Err(());
    }
    Ok(true)
}

/// Lowers an upper bound. Returns `Err(())` on an emptied domain.
pub fn set_hi(domains: &mut Domains, trail: &mut Trail, var: VarId, value: i64) -> Result<bool, ()> {
    let idx = var.index();
    if value >= domains.hi[idx] {
        return Ok(false);
    }
    trail.record(idx, domains);
    domains.hi[idx] = value;
    if domains.lo[idx] > domains.hi[idx] {
        return Err(());
    }
    Ok(true)
}

fn term_min(coef: i64, lo: i64, hi: i64) -> i64 {
    (coef * lo).min(coef * hi)
}

fn term_max(coef: i64, lo: i64, hi: i64) -> i64 {
    (coef * lo).max(coef * hi)
}

fn expr_range(c: &LinearConstraint, domains: &Domains) -> (i64, i64) {
    let mut min = c.expr.constant;
    let mut max = c.expr.constant;
    for (var, coef) in &c.expr.terms {
        let idx = var.index();
        min += term_min(*coef, domains.lo[idx], domains.hi[idx]);
        max += term_max(*coef, domains.lo[idx], domains.hi[idx]);
    }
    (min, max)
}

fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Runs the constraint set to fixpoint. Returns `Err(())` on conflict.
pub fn propagate(model: &CpModel, domains: &mut Domains, trail: &mut Trail) -> Result<(), ()> {
    loop {
        let mut changed = false;
        for c in model.constraints() {
            let mut any_false = false;
            let mut unfixed: Option<Lit> = None;
            let mut unfixed_count = 0;
            for lit in &c.enforcement {
                match domains.lit_value(*lit) {
                    Some(false) => {
                        any_false = true;
                        break;
                    }
                    Some(true) => {}
                    None => {
                        unfixed = Some(*lit);
                        unfixed_count += 1;
                    }
                }
            }
            if any_false {
                continue;
            }

            let (min, max) = expr_range(c, domains);
            let violated = match c.op {
                CmpOp::Le => min > c.rhs,
                CmpOp::Ge => max < c.rhs,
                CmpOp::Eq => min > c.rhs || max < c.rhs,
            };

            if unfixed_count > 0 {
                // Not yet enforced. If the constraint already cannot hold
                // and only one guard is open, that guard must be false.
                if violated && unfixed_count == 1 {
                    let lit = unfixed.expect("one unfixed literal");
                    let value = i64::from(lit.negated);
                    changed |= set_lo(domains, trail, lit.var, value)?;
                    changed |= set_hi(domains, trail, lit.var, value)?;
                }
                continue;
            }

            if violated {
                return Err(());
            }

            // Enforced: tighten every variable against the others' bounds.
            if matches!(c.op, CmpOp::Le | CmpOp::Eq) {
                for (var, coef) in &c.expr.terms {
                    let idx = var.index();
                    let without = min - term_min(*coef, domains.lo[idx], domains.hi[idx]);
                    let slack = c.rhs - without;
                    if *coef > 0 {
                        changed |= set_hi(domains, trail, *var, div_floor(slack, *coef))?;
                    } else if *coef < 0 {
                        changed |= set_lo(domains, trail, *var, div_ceil(slack, *coef))?;
                    }
                }
            }
            if matches!(c.op, CmpOp::Ge | CmpOp::Eq) {
                for (var, coef) in &c.expr.terms {
                    let idx = var.index();
                    let without = max - term_max(*coef, domains.lo[idx], domains.hi[idx]);
                    let need = c.rhs - without;
                    if *coef > 0 {
                        changed |= set_lo(domains, trail, *var, div_ceil(need, *coef))?;
                    } else if *coef < 0 {
                        changed |= set_hi(domains, trail, *var, div_floor(need, *coef))?;
                    }
                }
            }
        }
        if !changed {
            return Ok(());
        }
    }
}
