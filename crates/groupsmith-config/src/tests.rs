use std::collections::BTreeMap;

use crate::{CapacityMode, ConfigError, ParamMap, ParamValue, Settings};

#[test]
fn toml_parsing_flattens_nested_tables() {
    let toml = r#"
        [capacity]
        mode = "soft"
        max = 16
        overflow_penalties = [10, 20, 40]

        [cohort]
        max_spread = 2
        named_levels = ["JK", "SK"]

        [requests]
        default_multiplier = 1.5

        [requests.source_multipliers]
        written = 2.0
        inferred = 0.5
    "#;

    let params = ParamMap::from_toml_str(toml).unwrap();
    assert_eq!(params.str("capacity.mode").unwrap(), Some("soft"));
    assert_eq!(params.int("capacity.max").unwrap(), Some(16));
    assert_eq!(
        params.int_list("capacity.overflow_penalties").unwrap(),
        Some(&[10, 20, 40][..])
    );
    let table = params.table("requests.source_multipliers").unwrap().unwrap();
    assert_eq!(table.get("written"), Some(&2.0));
}

#[test]
fn yaml_parsing_matches_toml() {
    let yaml = r#"
        capacity:
          mode: soft
          max: 16
        cohort:
          max_spread: 2
    "#;
    let params = ParamMap::from_yaml_str(yaml).unwrap();
    assert_eq!(params.str("capacity.mode").unwrap(), Some("soft"));
    assert_eq!(params.int("cohort.max_spread").unwrap(), Some(2));
}

#[test]
fn unknown_key_fails_loudly() {
    let err = ParamMap::from_toml_str("[capacity]\nmaximum = 3").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(_)));

    let err = ParamMap::new().int("capacity.maximum").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(_)));
}

#[test]
fn absent_key_is_none_not_error() {
    let params = ParamMap::new();
    assert_eq!(params.int("capacity.max").unwrap(), None);
    assert_eq!(params.int("capacity.max").unwrap().unwrap_or(30), 30);
}

#[test]
fn type_mismatch_is_rejected() {
    let err = ParamMap::from_toml_str("[capacity]\nmax = \"lots\"").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch { .. }));
}

#[test]
fn settings_defaults_are_valid() {
    let settings = Settings::default();
    assert_eq!(settings.capacity_mode, CapacityMode::Hard);
    assert_eq!(settings.diminishing_factors, [1.0, 0.5, 0.25]);
    assert!(settings.overflow_penalties.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn settings_reject_bad_mode() {
    let params = ParamMap::new().with("capacity.mode", ParamValue::Str("mushy".into()));
    assert!(Settings::from_params(&params).is_err());
}

#[test]
fn settings_reject_descending_penalties() {
    let params = ParamMap::new().with(
        "capacity.overflow_penalties",
        ParamValue::IntList(vec![100, 50, 25]),
    );
    assert!(Settings::from_params(&params).is_err());
}

#[test]
fn settings_reject_increasing_diminishing_factors() {
    let params = ParamMap::new().with(
        "requests.diminishing_factors",
        ParamValue::FloatList(vec![0.25, 0.5, 1.0]),
    );
    assert!(Settings::from_params(&params).is_err());
}

#[test]
fn provenance_multiplier_takes_the_highest_source() {
    let mut table = BTreeMap::new();
    table.insert("written".to_string(), 2.0);
    table.insert("inferred".to_string(), 0.5);
    let params = ParamMap::new().with("requests.source_multipliers", ParamValue::Table(table));
    let settings = Settings::from_params(&params).unwrap();

    let both = vec!["inferred".to_string(), "written".to_string()];
    assert_eq!(settings.provenance_multiplier(&both), 2.0);
    assert_eq!(settings.provenance_multiplier(&["unheard".to_string()]), 1.0);
    assert_eq!(settings.provenance_multiplier(&[]), 1.0);
}

#[test]
fn explicitness_filters_inferred_only_requests() {
    let params = ParamMap::new().with(
        "requests.inferred_sources",
        ParamValue::StrList(vec!["inferred".into()]),
    );
    let settings = Settings::from_params(&params).unwrap();

    assert!(settings.is_explicit(&["written".to_string()]));
    assert!(settings.is_explicit(&["written".to_string(), "inferred".to_string()]));
    assert!(!settings.is_explicit(&["inferred".to_string()]));
    assert!(settings.is_explicit(&[]));
}
