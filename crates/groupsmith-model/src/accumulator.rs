//! The soft-term accumulator.
//!
//! Every soft-constraint builder appends `(variable, signed weight)` terms
//! under a stable label; the accumulator is consumed exactly once, at
//! objective-assembly time, as `objective = Σ reward terms − Σ penalty
//! terms`. It is scoped to a single solve attempt and never shared between
//! concurrent solves.

use std::collections::HashSet;

use groupsmith_core::{GroupsmithError, Result};

use crate::ir::{CpModel, VarId};

/// One labelled objective contribution.
#[derive(Debug, Clone)]
pub struct SoftTerm {
    pub label: String,
    pub var: VarId,
    /// Positive for rewards, negative for penalties.
    pub weight: i64,
}

/// Write-once accumulator of soft objective terms.
#[derive(Debug, Default)]
pub struct SoftTermAccumulator {
    terms: Vec<SoftTerm>,
    labels: HashSet<String>,
    consumed: bool,
}

impl SoftTermAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reward term. Weight must be positive and the label unused.
    pub fn add_reward(&mut self, label: impl Into<String>, var: impl Into<VarId>, weight: i64) -> Result<()> {
        self.add(label.into(), var.into(), weight, true)
    }

    /// Appends a penalty term. Weight must be positive and the label unused.
    pub fn add_penalty(&mut self, label: impl Into<String>, var: impl Into<VarId>, weight: i64) -> Result<()> {
        self.add(label.into(), var.into(), weight, false)
    }

    fn add(&mut self, label: String, var: VarId, weight: i64, reward: bool) -> Result<()> {
        if self.consumed {
            return Err(GroupsmithError::ModelInvalid(format!(
                "soft term {label} added after objective assembly"
            )));
        }
        if weight < 0 {
            return Err(GroupsmithError::ModelInvalid(format!(
                "soft term {label} has negative weight {weight}"
            )));
        }
        if !self.labels.insert(label.clone()) {
            return Err(GroupsmithError::ModelInvalid(format!(
                "duplicate soft term label {label}"
            )));
        }
        self.terms.push(SoftTerm {
            label,
            var,
            weight: if reward { weight } else { -weight },
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[SoftTerm] {
        &self.terms
    }

    /// Moves every term into the model objective. Callable once; a second
    /// consumption is a builder bug.
    pub fn install_into(&mut self, model: &mut CpModel) -> Result<()> {
        if self.consumed {
            return Err(GroupsmithError::ModelInvalid(
                "soft-term accumulator consumed twice".to_string(),
            ));
        }
        self.consumed = true;
        for term in self.terms.drain(..) {
            model.add_objective_term(term.label, term.var, term.weight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_label_is_a_model_bug() {
        let mut model = CpModel::new();
        let v = model.new_bool("v");
        let mut acc = SoftTermAccumulator::new();
        acc.add_reward("term", v, 3).unwrap();
        assert!(acc.add_penalty("term", v, 5).is_err());
    }

    #[test]
    fn consume_is_write_once() {
        let mut model = CpModel::new();
        let v = model.new_bool("v");
        let mut acc = SoftTermAccumulator::new();
        acc.add_penalty("p", v, 5).unwrap();
        acc.install_into(&mut model).unwrap();
        assert_eq!(model.objective().len(), 1);
        assert_eq!(model.objective()[0].coef, -5);
        assert!(acc.install_into(&mut model).is_err());
        assert!(acc.add_reward("late", v, 1).is_err());
    }
}
