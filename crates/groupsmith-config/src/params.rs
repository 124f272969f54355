//! The flat parameter map and its typed accessors.

use std::collections::BTreeMap;
use std::path::Path;

use crate::ConfigError;

/// Value of a single named parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    StrList(Vec<String>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    /// String-keyed multiplier table, e.g. per-source weight multipliers.
    Table(BTreeMap<String, f64>),
}

/// Declared type of a registered parameter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    StrList,
    IntList,
    FloatList,
    Table,
}

/// Every key the planner consumes. A key outside this registry is a
/// configuration error, both when loading a file and when accessing.
pub const KNOWN_PARAMS: &[(&str, ParamKind)] = &[
    ("capacity.mode", ParamKind::Str),
    ("capacity.max", ParamKind::Int),
    ("capacity.min_occupancy", ParamKind::Int),
    ("capacity.force_full_use", ParamKind::Bool),
    ("capacity.overflow_penalties", ParamKind::IntList),
    ("cohort.max_spread", ParamKind::Int),
    ("cohort.fit_scale", ParamKind::Int),
    ("cohort.named_levels", ParamKind::StrList),
    ("group.wildcard_marker", ParamKind::Str),
    ("requests.diminishing_factors", ParamKind::FloatList),
    ("requests.source_multipliers", ParamKind::Table),
    ("requests.default_multiplier", ParamKind::Float),
    ("requests.inferred_sources", ParamKind::StrList),
    ("requests.none_satisfied_penalty", ParamKind::Int),
    ("requests.count_impossible", ParamKind::Bool),
    ("requests.fallback_attribute_preference", ParamKind::Bool),
    ("progression.regression_penalty", ParamKind::Int),
    ("progression.bonus", ParamKind::Int),
    ("solver.time_limit_seconds", ParamKind::Float),
    ("solver.diagnosis_time_limit_seconds", ParamKind::Float),
    ("solver.workers", ParamKind::Int),
];

fn registered_kind(key: &str) -> Option<ParamKind> {
    KNOWN_PARAMS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
}

/// Flat map of dotted parameter keys to typed values.
///
/// Built from TOML or YAML (nested tables flatten to dotted keys) or
/// programmatically via [`ParamMap::set`].
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    values: BTreeMap<String, ParamValue>,
}

impl ParamMap {
    /// Creates an empty map. Accessors return `Ok(None)` for every
    /// registered key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads parameters from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses parameters from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let value: toml::Value = toml::from_str(s)?;
        let mut map = Self::new();
        flatten_toml(&mut map, "", &value)?;
        Ok(map)
    }

    /// Loads parameters from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses parameters from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(s)?;
        let mut map = Self::new();
        flatten_yaml(&mut map, "", &value)?;
        Ok(map)
    }

    /// Sets a parameter, rejecting unknown keys and type mismatches.
    pub fn set(&mut self, key: &str, value: ParamValue) -> Result<(), ConfigError> {
        let kind = registered_kind(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let matches = matches!(
            (&value, kind),
            (ParamValue::Bool(_), ParamKind::Bool)
                | (ParamValue::Int(_), ParamKind::Int)
                | (ParamValue::Float(_), ParamKind::Float)
                | (ParamValue::Int(_), ParamKind::Float)
                | (ParamValue::Str(_), ParamKind::Str)
                | (ParamValue::StrList(_), ParamKind::StrList)
                | (ParamValue::IntList(_), ParamKind::IntList)
                | (ParamValue::FloatList(_), ParamKind::FloatList)
                | (ParamValue::IntList(_), ParamKind::FloatList)
                | (ParamValue::Table(_), ParamKind::Table)
        );
        if !matches {
            return Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: kind_name(kind),
            });
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Builder form of [`set`](Self::set) for tests and embedding; panics on
    /// schema violations, which are programmer errors there.
    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.set(key, value)
            .unwrap_or_else(|e| panic!("invalid parameter {key}: {e}"));
        self
    }

    fn lookup(&self, key: &str) -> Result<Option<&ParamValue>, ConfigError> {
        if registered_kind(key).is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }
        Ok(self.values.get(key))
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(mismatch(key, "bool")),
        }
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::Int(i)) => Ok(Some(*i)),
            Some(_) => Err(mismatch(key, "integer")),
        }
    }

    pub fn float(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::Float(f)) => Ok(Some(*f)),
            Some(ParamValue::Int(i)) => Ok(Some(*i as f64)),
            Some(_) => Err(mismatch(key, "float")),
        }
    }

    pub fn str(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(mismatch(key, "string")),
        }
    }

    pub fn str_list(&self, key: &str) -> Result<Option<&[String]>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::StrList(v)) => Ok(Some(v)),
            Some(_) => Err(mismatch(key, "string list")),
        }
    }

    pub fn int_list(&self, key: &str) -> Result<Option<&[i64]>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::IntList(v)) => Ok(Some(v)),
            Some(_) => Err(mismatch(key, "integer list")),
        }
    }

    pub fn float_list(&self, key: &str) -> Result<Option<Vec<f64>>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::FloatList(v)) => Ok(Some(v.clone())),
            Some(ParamValue::IntList(v)) => Ok(Some(v.iter().map(|i| *i as f64).collect())),
            Some(_) => Err(mismatch(key, "float list")),
        }
    }

    pub fn table(&self, key: &str) -> Result<Option<&BTreeMap<String, f64>>, ConfigError> {
        match self.lookup(key)? {
            None => Ok(None),
            Some(ParamValue::Table(t)) => Ok(Some(t)),
            Some(_) => Err(mismatch(key, "table")),
        }
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

fn kind_name(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Bool => "bool",
        ParamKind::Int => "integer",
        ParamKind::Float => "float",
        ParamKind::Str => "string",
        ParamKind::StrList => "string list",
        ParamKind::IntList => "integer list",
        ParamKind::FloatList => "float list",
        ParamKind::Table => "table",
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn flatten_toml(map: &mut ParamMap, prefix: &str, value: &toml::Value) -> Result<(), ConfigError> {
    match value {
        toml::Value::Table(table) => {
            // A registered table-typed key keeps its nested form instead of
            // flattening further.
            if registered_kind(prefix) == Some(ParamKind::Table) {
                let mut t = BTreeMap::new();
                for (k, v) in table {
                    let f = v.as_float().or_else(|| v.as_integer().map(|i| i as f64));
                    let f = f.ok_or_else(|| mismatch(&join(prefix, k), "float"))?;
                    t.insert(k.clone(), f);
                }
                return map.set(prefix, ParamValue::Table(t));
            }
            for (k, v) in table {
                flatten_toml(map, &join(prefix, k), v)?;
            }
            Ok(())
        }
        toml::Value::Boolean(b) => map.set(prefix, ParamValue::Bool(*b)),
        toml::Value::Integer(i) => map.set(prefix, ParamValue::Int(*i)),
        toml::Value::Float(f) => map.set(prefix, ParamValue::Float(*f)),
        toml::Value::String(s) => map.set(prefix, ParamValue::Str(s.clone())),
        toml::Value::Array(items) => flatten_list(
            map,
            prefix,
            items.iter().map(toml_scalar).collect::<Result<_, _>>()?,
        ),
        toml::Value::Datetime(_) => Err(mismatch(prefix, "scalar or list")),
    }
}

fn flatten_yaml(
    map: &mut ParamMap,
    prefix: &str,
    value: &serde_yaml::Value,
) -> Result<(), ConfigError> {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            if registered_kind(prefix) == Some(ParamKind::Table) {
                let mut t = BTreeMap::new();
                for (k, v) in mapping {
                    let key = k
                        .as_str()
                        .ok_or_else(|| mismatch(prefix, "string-keyed table"))?;
                    let f = v.as_f64().ok_or_else(|| mismatch(&join(prefix, key), "float"))?;
                    t.insert(key.to_string(), f);
                }
                return map.set(prefix, ParamValue::Table(t));
            }
            for (k, v) in mapping {
                let key = k
                    .as_str()
                    .ok_or_else(|| mismatch(prefix, "string-keyed table"))?;
                flatten_yaml(map, &join(prefix, key), v)?;
            }
            Ok(())
        }
        serde_yaml::Value::Bool(b) => map.set(prefix, ParamValue::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                map.set(prefix, ParamValue::Int(i))
            } else {
                map.set(
                    prefix,
                    ParamValue::Float(n.as_f64().ok_or_else(|| mismatch(prefix, "number"))?),
                )
            }
        }
        serde_yaml::Value::String(s) => map.set(prefix, ParamValue::Str(s.clone())),
        serde_yaml::Value::Sequence(items) => flatten_list(
            map,
            prefix,
            items.iter().map(yaml_scalar).collect::<Result<_, _>>()?,
        ),
        serde_yaml::Value::Null | serde_yaml::Value::Tagged(_) => {
            Err(mismatch(prefix, "scalar or list"))
        }
    }
}

/// A scalar pulled out of a config list, before list typing.
enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

fn toml_scalar(value: &toml::Value) -> Result<Scalar, ConfigError> {
    match value {
        toml::Value::Integer(i) => Ok(Scalar::Int(*i)),
        toml::Value::Float(f) => Ok(Scalar::Float(*f)),
        toml::Value::String(s) => Ok(Scalar::Str(s.clone())),
        _ => Err(ConfigError::Invalid(
            "lists may only contain numbers or strings".to_string(),
        )),
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> Result<Scalar, ConfigError> {
    match value {
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Scalar::Int(i))
            } else {
                Ok(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_yaml::Value::String(s) => Ok(Scalar::Str(s.clone())),
        _ => Err(ConfigError::Invalid(
            "lists may only contain numbers or strings".to_string(),
        )),
    }
}

fn flatten_list(map: &mut ParamMap, key: &str, items: Vec<Scalar>) -> Result<(), ConfigError> {
    if items.iter().all(|s| matches!(s, Scalar::Str(_))) && !items.is_empty() {
        let list = items
            .into_iter()
            .map(|s| match s {
                Scalar::Str(s) => s,
                _ => unreachable!(),
            })
            .collect();
        return map.set(key, ParamValue::StrList(list));
    }
    if items.iter().all(|s| matches!(s, Scalar::Int(_))) {
        let list = items
            .into_iter()
            .map(|s| match s {
                Scalar::Int(i) => i,
                _ => unreachable!(),
            })
            .collect();
        return map.set(key, ParamValue::IntList(list));
    }
    if items
        .iter()
        .all(|s| matches!(s, Scalar::Int(_) | Scalar::Float(_)))
    {
        let list = items
            .into_iter()
            .map(|s| match s {
                Scalar::Int(i) => i as f64,
                Scalar::Float(f) => f,
                _ => unreachable!(),
            })
            .collect();
        return map.set(key, ParamValue::FloatList(list));
    }
    Err(ConfigError::Invalid(format!(
        "list parameter {key} mixes strings and numbers"
    )))
}
