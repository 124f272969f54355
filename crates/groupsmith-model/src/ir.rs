//! Decision-variable model representation.
//!
//! A deliberately small intermediate form matching what CP/ILP engines
//! accept: integer variables with bounds (booleans are 0..=1), linear
//! comparisons optionally guarded by enforcement literals ("only if these
//! literals are true"), and a linear maximisation objective. Variable
//! creation order is the engine's search-order hint, so assembly must stay
//! deterministic.

use smallvec::SmallVec;

use groupsmith_core::{GroupsmithError, Result};

/// Index of a variable in its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A boolean (0..=1) variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoolVar(VarId);

impl BoolVar {
    pub fn id(self) -> VarId {
        self.0
    }

    /// Positive literal: true when the variable is 1.
    pub fn lit(self) -> Lit {
        Lit {
            var: self.0,
            negated: false,
        }
    }

    /// Negative literal: true when the variable is 0.
    pub fn negated(self) -> Lit {
        Lit {
            var: self.0,
            negated: true,
        }
    }
}

/// A bounded integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntVar(VarId);

impl IntVar {
    pub fn id(self) -> VarId {
        self.0
    }
}

/// A possibly negated reference to a boolean variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    pub var: VarId,
    pub negated: bool,
}

/// A linear expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: impl Into<VarId>, coef: i64) -> Self {
        self.terms.push((var.into(), coef));
        self
    }

    pub fn constant(mut self, constant: i64) -> Self {
        self.constant += constant;
        self
    }

    /// Sum of boolean variables, each with coefficient 1.
    pub fn sum<I: IntoIterator<Item = BoolVar>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v.id(), 1)).collect(),
            constant: 0,
        }
    }
}

impl From<BoolVar> for VarId {
    fn from(v: BoolVar) -> VarId {
        v.id()
    }
}

impl From<IntVar> for VarId {
    fn from(v: IntVar) -> VarId {
        v.id()
    }
}

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Le,
    Ge,
    Eq,
}

/// `expr <op> rhs`, active only while every enforcement literal is true.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub op: CmpOp,
    pub rhs: i64,
    pub enforcement: SmallVec<[Lit; 2]>,
}

/// One signed objective term: `coef · var`, labelled for auditability.
#[derive(Debug, Clone)]
pub struct ObjectiveTerm {
    pub label: String,
    pub var: VarId,
    pub coef: i64,
}

#[derive(Debug, Clone)]
struct VarData {
    name: String,
    lo: i64,
    hi: i64,
}

/// The assembled decision model handed to an [`Engine`](crate::Engine).
#[derive(Debug, Default)]
pub struct CpModel {
    vars: Vec<VarData>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<ObjectiveTerm>,
    decisions: Vec<VarId>,
    contradiction: Option<String>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> BoolVar {
        BoolVar(self.new_var(name.into(), 0, 1))
    }

    pub fn new_int(&mut self, name: impl Into<String>, lo: i64, hi: i64) -> IntVar {
        IntVar(self.new_var(name.into(), lo, hi))
    }

    fn new_var(&mut self, name: String, lo: i64, hi: i64) -> VarId {
        let id = VarId(self.vars.len() as u32);
        if lo > hi {
            self.record_contradiction(format!("variable {name} has empty domain"));
        }
        self.vars.push(VarData { name, lo, hi });
        id
    }

    /// Pins a boolean. Conflicting pins leave the model trivially
    /// infeasible rather than panicking: contradictory inputs are a data
    /// problem, not a programmer error.
    pub fn fix_bool(&mut self, var: BoolVar, value: bool) {
        let v = i64::from(value);
        let data = &mut self.vars[var.id().index()];
        let lo = data.lo.max(v);
        let hi = data.hi.min(v);
        data.lo = lo;
        data.hi = hi;
        if lo > hi {
            let name = data.name.clone();
            self.record_contradiction(format!("conflicting pins on {name}"));
        }
    }

    fn record_contradiction(&mut self, reason: String) {
        if self.contradiction.is_none() {
            self.contradiction = Some(reason);
        }
    }

    /// Set when bound pinning alone already rules out every solution.
    pub fn contradiction(&self) -> Option<&str> {
        self.contradiction.as_deref()
    }

    pub fn add(&mut self, name: impl Into<String>, expr: LinearExpr, op: CmpOp, rhs: i64) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            op,
            rhs,
            enforcement: SmallVec::new(),
        });
    }

    /// Adds `expr <op> rhs`, enforced only while all of `lits` are true.
    pub fn add_enforced(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        op: CmpOp,
        rhs: i64,
        lits: impl IntoIterator<Item = Lit>,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            op,
            rhs,
            enforcement: lits.into_iter().collect(),
        });
    }

    pub fn add_objective_term(&mut self, label: impl Into<String>, var: VarId, coef: i64) {
        self.objective.push(ObjectiveTerm {
            label: label.into(),
            var,
            coef,
        });
    }

    /// Declares a variable the engine should branch on first, in call
    /// order. The assembler registers every per-person group index here.
    pub fn add_decision(&mut self, var: impl Into<VarId>) {
        self.decisions.push(var.into());
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn bounds(&self, var: impl Into<VarId>) -> (i64, i64) {
        let data = &self.vars[var.into().index()];
        (data.lo, data.hi)
    }

    pub fn var_name(&self, var: impl Into<VarId>) -> &str {
        &self.vars[var.into().index()].name
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[ObjectiveTerm] {
        &self.objective
    }

    pub fn decisions(&self) -> &[VarId] {
        &self.decisions
    }

    /// Evaluates the objective for a full variable valuation.
    pub fn objective_value(&self, values: &[i64]) -> i64 {
        self.objective
            .iter()
            .map(|t| t.coef * values[t.var.index()])
            .sum()
    }

    /// Structural sanity check: every referenced variable exists and every
    /// enforcement literal is boolean. A failure here is a programmer
    /// error in a builder, surfaced as `ModelInvalid`.
    pub fn validate(&self) -> Result<()> {
        let n = self.vars.len() as u32;
        let check = |var: VarId, what: &str, name: &str| -> Result<()> {
            if var.0 >= n {
                return Err(GroupsmithError::ModelInvalid(format!(
                    "{what} in {name} references unknown variable #{}",
                    var.0
                )));
            }
            Ok(())
        };
        for c in &self.constraints {
            let mut seen = std::collections::HashSet::new();
            for (var, _) in &c.expr.terms {
                check(*var, "term", &c.name)?;
                if !seen.insert(*var) {
                    return Err(GroupsmithError::ModelInvalid(format!(
                        "variable {} appears twice in {}",
                        self.vars[var.index()].name, c.name
                    )));
                }
            }
            for lit in &c.enforcement {
                check(lit.var, "enforcement literal", &c.name)?;
                let data = &self.vars[lit.var.index()];
                if data.lo < 0 || data.hi > 1 {
                    return Err(GroupsmithError::ModelInvalid(format!(
                        "enforcement literal in {} is not boolean ({})",
                        c.name, data.name
                    )));
                }
            }
        }
        for t in &self.objective {
            check(t.var, "objective term", &t.label)?;
        }
        for var in &self.decisions {
            check(*var, "decision hint", "decision list")?;
        }
        Ok(())
    }
}
