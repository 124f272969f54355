//! Validated settings bundle.
//!
//! [`Settings::from_params`] is the single place where absent parameters get
//! their fallback values and where ranges are validated. Anything malformed
//! fails here, before model assembly ever starts.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::{ConfigError, ParamMap};

/// Capacity enforcement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityMode {
    /// Occupancy above the standard capacity is forbidden outright.
    #[default]
    Hard,
    /// Only the absolute ceiling is hard; overflow above the standard
    /// capacity is penalised, with unavoidable overflow exempted.
    Soft,
}

/// All numeric and string knobs the planner consumes, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub capacity_mode: CapacityMode,
    /// Absolute per-group ceiling, hard in both modes.
    pub capacity_max: i64,
    /// Minimum occupancy of any group that is used at all. 0 disables.
    pub min_occupancy: i64,
    pub force_full_use: bool,
    /// Per-unit penalties for the 1st, 2nd, and 3rd+ penalised overflow
    /// unit in a bucket, non-decreasing.
    pub overflow_penalties: [i64; 3],
    /// Maximum distinct cohort levels in a concrete-eligibility group.
    pub max_cohort_spread: i64,
    /// Integer scale of the cohort-flow fit bonus.
    pub cohort_fit_scale: i64,
    /// Ordinal level names ranking before any numeric level.
    pub named_levels: Vec<String>,
    /// Marker in a group name that makes it an any-eligibility group.
    pub wildcard_marker: String,
    /// Positional multipliers for a person's 1st, 2nd, and 3rd+ request,
    /// by descending priority; each in (0, 1], non-increasing.
    pub diminishing_factors: [f64; 3],
    pub source_multipliers: BTreeMap<String, f64>,
    pub default_multiplier: f64,
    /// Provenance tags considered inferred rather than explicit.
    pub inferred_sources: Vec<String>,
    pub none_satisfied_penalty: i64,
    /// Count impossible requests in the at-least-one-satisfied aggregation.
    pub count_impossible: bool,
    /// Let attribute preferences stand in when a person has no pairwise
    /// request.
    pub fallback_attribute_preference: bool,
    pub regression_penalty: i64,
    pub progression_bonus: i64,
    pub time_limit: Duration,
    pub diagnosis_time_limit: Duration,
    pub workers: i64,
}

impl Settings {
    /// Builds settings from the parameter map, filling in fallbacks and
    /// rejecting out-of-range values.
    pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
        let capacity_mode = match params.str("capacity.mode")?.unwrap_or("hard") {
            "hard" => CapacityMode::Hard,
            "soft" => CapacityMode::Soft,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "capacity.mode must be \"hard\" or \"soft\", got \"{other}\""
                )))
            }
        };

        let settings = Self {
            capacity_mode,
            capacity_max: params.int("capacity.max")?.unwrap_or(30),
            min_occupancy: params.int("capacity.min_occupancy")?.unwrap_or(0),
            force_full_use: params.bool("capacity.force_full_use")?.unwrap_or(false),
            overflow_penalties: fixed3_int(
                params.int_list("capacity.overflow_penalties")?,
                [50, 100, 200],
                "capacity.overflow_penalties",
            )?,
            max_cohort_spread: params.int("cohort.max_spread")?.unwrap_or(3),
            cohort_fit_scale: params.int("cohort.fit_scale")?.unwrap_or(10),
            named_levels: params
                .str_list("cohort.named_levels")?
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            wildcard_marker: params
                .str("group.wildcard_marker")?
                .unwrap_or("OPEN")
                .to_string(),
            diminishing_factors: fixed3_float(
                params.float_list("requests.diminishing_factors")?,
                [1.0, 0.5, 0.25],
                "requests.diminishing_factors",
            )?,
            source_multipliers: params
                .table("requests.source_multipliers")?
                .cloned()
                .unwrap_or_default(),
            default_multiplier: params.float("requests.default_multiplier")?.unwrap_or(1.0),
            inferred_sources: params
                .str_list("requests.inferred_sources")?
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            none_satisfied_penalty: params
                .int("requests.none_satisfied_penalty")?
                .unwrap_or(500),
            count_impossible: params.bool("requests.count_impossible")?.unwrap_or(false),
            fallback_attribute_preference: params
                .bool("requests.fallback_attribute_preference")?
                .unwrap_or(true),
            regression_penalty: params.int("progression.regression_penalty")?.unwrap_or(40),
            progression_bonus: params.int("progression.bonus")?.unwrap_or(5),
            time_limit: Duration::from_secs_f64(
                params.float("solver.time_limit_seconds")?.unwrap_or(30.0),
            ),
            diagnosis_time_limit: Duration::from_secs_f64(
                params
                    .float("solver.diagnosis_time_limit_seconds")?
                    .unwrap_or(5.0),
            ),
            workers: params.int("solver.workers")?.unwrap_or(1),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_max < 1 {
            return Err(invalid("capacity.max must be at least 1"));
        }
        if self.min_occupancy < 0 {
            return Err(invalid("capacity.min_occupancy must not be negative"));
        }
        if self.min_occupancy > self.capacity_max {
            return Err(invalid(
                "capacity.min_occupancy must not exceed capacity.max",
            ));
        }
        if self.overflow_penalties.iter().any(|p| *p < 0) {
            return Err(invalid("capacity.overflow_penalties must not be negative"));
        }
        if self.overflow_penalties.windows(2).any(|w| w[0] > w[1]) {
            return Err(invalid(
                "capacity.overflow_penalties must be non-decreasing",
            ));
        }
        if self.max_cohort_spread < 1 {
            return Err(invalid("cohort.max_spread must be at least 1"));
        }
        if self.cohort_fit_scale < 1 {
            return Err(invalid("cohort.fit_scale must be at least 1"));
        }
        if self
            .diminishing_factors
            .iter()
            .any(|f| !(*f > 0.0 && *f <= 1.0))
        {
            return Err(invalid(
                "requests.diminishing_factors must lie in (0, 1]",
            ));
        }
        if self.diminishing_factors.windows(2).any(|w| w[0] < w[1]) {
            return Err(invalid(
                "requests.diminishing_factors must be non-increasing",
            ));
        }
        if !(self.default_multiplier > 0.0) {
            return Err(invalid("requests.default_multiplier must be positive"));
        }
        if self.source_multipliers.values().any(|m| !(*m > 0.0)) {
            return Err(invalid("requests.source_multipliers must be positive"));
        }
        if self.none_satisfied_penalty < 0 {
            return Err(invalid(
                "requests.none_satisfied_penalty must not be negative",
            ));
        }
        if self.regression_penalty < 0 || self.progression_bonus < 0 {
            return Err(invalid("progression weights must not be negative"));
        }
        if self.time_limit.is_zero() || self.diagnosis_time_limit.is_zero() {
            return Err(invalid("solver time limits must be positive"));
        }
        if self.workers < 1 {
            return Err(invalid("solver.workers must be at least 1"));
        }
        Ok(())
    }

    /// Provenance multiplier of a request: the highest multiplier among its
    /// source fields, or the default when none is configured.
    pub fn provenance_multiplier(&self, sources: &[String]) -> f64 {
        sources
            .iter()
            .filter_map(|s| self.source_multipliers.get(s).copied())
            .fold(None::<f64>, |acc, m| Some(acc.map_or(m, |a| a.max(m))))
            .unwrap_or(self.default_multiplier)
    }

    /// True if the request carries at least one non-inferred source, or no
    /// sources at all.
    pub fn is_explicit(&self, sources: &[String]) -> bool {
        sources.is_empty() || sources.iter().any(|s| !self.inferred_sources.contains(s))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_params(&ParamMap::new()).expect("default settings are valid")
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

fn fixed3_int(
    values: Option<&[i64]>,
    fallback: [i64; 3],
    key: &str,
) -> Result<[i64; 3], ConfigError> {
    match values {
        None => Ok(fallback),
        Some([a, b, c]) => Ok([*a, *b, *c]),
        Some(_) => Err(ConfigError::Invalid(format!(
            "{key} must have exactly 3 entries"
        ))),
    }
}

fn fixed3_float(
    values: Option<Vec<f64>>,
    fallback: [f64; 3],
    key: &str,
) -> Result<[f64; 3], ConfigError> {
    match values.as_deref() {
        None => Ok(fallback),
        Some([a, b, c]) => Ok([*a, *b, *c]),
        Some(_) => Err(ConfigError::Invalid(format!(
            "{key} must have exactly 3 entries"
        ))),
    }
}
