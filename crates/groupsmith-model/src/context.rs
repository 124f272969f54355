//! The model context: the shared aggregate every builder works against.
//!
//! A context is assembled once per solve attempt and discarded after the
//! solution is extracted. Builders communicate only through the variable
//! matrix, the lazily shared presence literals, and the soft-term
//! accumulator; no builder reads another builder's private state. Contexts
//! are never reused across solves, concurrent or otherwise: the accumulator
//! is write-once per solve.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use groupsmith_config::Settings;
use groupsmith_core::{
    Group, GroupId, HistoricalRecord, Lock, Person, PersonId, RankComparator, Request,
};

use crate::accumulator::SoftTermAccumulator;
use crate::ir::{BoolVar, CmpOp, CpModel, IntVar, LinearExpr};
use crate::scoring::{self, RequestClass};

/// Rule categories the infeasibility diagnoser can disable one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    SessionBoundary,
    AtLeastOneRequest,
    CohortSpread,
    Eligibility,
    Progression,
    GroupLock,
}

impl RuleCategory {
    /// Diagnosis order, fixed for reproducible reports.
    pub const ALL: [RuleCategory; 6] = [
        RuleCategory::SessionBoundary,
        RuleCategory::AtLeastOneRequest,
        RuleCategory::CohortSpread,
        RuleCategory::Eligibility,
        RuleCategory::Progression,
        RuleCategory::GroupLock,
    ];
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleCategory::SessionBoundary => "session-boundary",
            RuleCategory::AtLeastOneRequest => "at-least-one-request",
            RuleCategory::CohortSpread => "cohort-spread",
            RuleCategory::Eligibility => "eligibility",
            RuleCategory::Progression => "progression",
            RuleCategory::GroupLock => "group-lock",
        };
        write!(f, "{s}")
    }
}

/// Borrowed input collections for one solve attempt.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    pub persons: &'a [Person],
    pub groups: &'a [Group],
    pub requests: &'a [Request],
    pub locks: &'a [Lock],
    pub history: &'a [HistoricalRecord],
}

/// The read-only entity views, index maps, decision-variable matrix, and
/// accumulator shared by every builder.
pub struct ModelContext<'a> {
    /// People in stable id order; positions are the model's person indices.
    pub persons: Vec<&'a Person>,
    /// Groups in stable id order; positions are the model's group indices.
    pub groups: Vec<&'a Group>,
    pub requests: &'a [Request],
    pub locks: &'a [Lock],
    pub history: &'a [HistoricalRecord],
    pub settings: &'a Settings,
    pub ranks: RankComparator,

    /// `placed[p][g]` is 1 exactly when person `p` ends in group `g`.
    pub placed: Vec<Vec<BoolVar>>,
    /// `group_of[p] == g  ⇔  placed[p][g] == 1`; lets pairwise same/
    /// different-group tests be single (in)equalities.
    pub group_of: Vec<IntVar>,

    pub model: CpModel,
    pub soft: SoftTermAccumulator,

    /// Classification of each request, parallel to `requests`.
    pub request_classes: Vec<RequestClass>,
    /// Satisfaction literal per request, filled by the soft builders.
    pub request_sat: Vec<Option<BoolVar>>,

    person_index: HashMap<&'a PersonId, usize>,
    group_index: HashMap<&'a GroupId, usize>,
    disabled: HashSet<RuleCategory>,
    level_present: HashMap<(usize, i32), BoolVar>,
}

impl<'a> ModelContext<'a> {
    /// Assembles the variable matrix. Sorting is a stable sort by id so
    /// variable naming, and therefore engine search order, is reproducible
    /// across runs with identical input.
    pub fn new(
        inputs: ModelInputs<'a>,
        settings: &'a Settings,
        disabled: HashSet<RuleCategory>,
    ) -> Self {
        let persons = scoring::sorted_persons(inputs.persons);
        let groups = scoring::sorted_groups(inputs.groups);

        let person_index: HashMap<&PersonId, usize> =
            persons.iter().enumerate().map(|(i, p)| (&p.id, i)).collect();
        let group_index: HashMap<&GroupId, usize> =
            groups.iter().enumerate().map(|(i, g)| (&g.id, i)).collect();

        let mut model = CpModel::new();
        let mut placed = Vec::with_capacity(persons.len());
        let mut group_of = Vec::with_capacity(persons.len());
        let group_count = groups.len() as i64;

        for person in &persons {
            let row: Vec<BoolVar> = groups
                .iter()
                .map(|group| model.new_bool(format!("placed[{},{}]", person.id, group.id)))
                .collect();
            let gi = model.new_int(
                format!("group_of[{}]", person.id),
                0,
                (group_count - 1).max(0),
            );
            model.add_decision(gi);

            // placed[p,g] = 1 forces group_of[p] = g; together with the
            // exactly-one constraint this links the two encodings both ways.
            for (g_idx, var) in row.iter().enumerate() {
                model.add_enforced(
                    format!("link[{},{}]", person.id, groups[g_idx].id),
                    LinearExpr::new().term(gi, 1),
                    CmpOp::Eq,
                    g_idx as i64,
                    [var.lit()],
                );
            }
            placed.push(row);
            group_of.push(gi);
        }

        let request_classes = scoring::classify_requests(&persons, inputs.requests, settings);
        let request_sat = vec![None; inputs.requests.len()];

        debug!(
            persons = persons.len(),
            groups = groups.len(),
            requests = inputs.requests.len(),
            variables = model.var_count(),
            "assembled model context"
        );

        Self {
            persons,
            groups,
            requests: inputs.requests,
            locks: inputs.locks,
            history: inputs.history,
            settings,
            ranks: RankComparator::new(
                settings.named_levels.clone(),
                settings.wildcard_marker.clone(),
            ),
            placed,
            group_of,
            model,
            soft: SoftTermAccumulator::new(),
            request_classes,
            request_sat,
            person_index,
            group_index,
            disabled,
            level_present: HashMap::new(),
        }
    }

    pub fn person_index(&self, id: &PersonId) -> Option<usize> {
        self.person_index.get(id).copied()
    }

    pub fn group_index(&self, id: &GroupId) -> Option<usize> {
        self.group_index.get(id).copied()
    }

    pub fn is_disabled(&self, category: RuleCategory) -> bool {
        self.disabled.contains(&category)
    }

    /// Partition and attribute eligibility of person `p` for group `g`.
    pub fn eligible(&self, p: usize, g: usize) -> bool {
        scoring::eligible(
            self.persons[p],
            self.groups[g],
            &self.settings.wildcard_marker,
        )
    }

    /// Occupancy expression of a group: the sum of its placed column.
    pub fn occupancy(&self, g: usize) -> LinearExpr {
        LinearExpr::sum(self.placed.iter().map(|row| row[g]))
    }

    /// Shared presence literal: 1 when at least one person of the given
    /// cohort level occupies the group. Created on first use together with
    /// its forward implications from the placed matrix.
    pub fn level_presence(&mut self, g: usize, level: i32) -> BoolVar {
        if let Some(var) = self.level_present.get(&(g, level)) {
            return *var;
        }
        let var = self
            .model
            .new_bool(format!("level_present[{},{}]", self.groups[g].id, level));
        for p in 0..self.persons.len() {
            if self.persons[p].cohort_level == level && self.eligible(p, g) {
                self.model.add(
                    format!(
                        "level_present_follows[{},{}]",
                        self.persons[p].id, self.groups[g].id
                    ),
                    LinearExpr::new().term(var, 1).term(self.placed[p][g], -1),
                    CmpOp::Ge,
                    0,
                );
            }
        }
        self.level_present.insert((g, level), var);
        var
    }

    /// Distinct cohort levels among people eligible for the group, sorted.
    pub fn eligible_levels(&self, g: usize) -> Vec<i32> {
        let mut levels: Vec<i32> = (0..self.persons.len())
            .filter(|p| self.eligible(*p, g))
            .map(|p| self.persons[p].cohort_level)
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}
