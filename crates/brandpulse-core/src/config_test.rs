use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn expect_invalid(map: &HashMap<&str, &str>, expected_var: &str) {
    let result = build_app_config(lookup_from_map(map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == expected_var),
        "expected InvalidEnvVar({expected_var}), got: {result:?}"
    );
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("unknown").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "BRANDPULSE_ENV"));
}

#[test]
fn build_app_config_uses_defaults_for_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.brands_path, PathBuf::from("./config/brands.yaml"));
    assert_eq!(cfg.model_path, PathBuf::from("./models/sentiment.json"));
    assert_eq!(cfg.target_language, "en");
    assert_eq!(cfg.bucket, BucketWidth::Day);
    assert!((cfg.crisis_threshold - 0.6).abs() < f64::EPSILON);
    assert_eq!(cfg.crisis_window_minutes, 60);
    assert_eq!(cfg.crisis_min_posts, 10);
    assert!((cfg.confidence_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(cfg.near_duplicate_distance, 3);
    assert!((cfg.holdout_ratio - 0.2).abs() < f64::EPSILON);
    assert_eq!(cfg.workers, 4);
}

#[test]
fn build_app_config_applies_overrides() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_ENV", "production");
    map.insert("BRANDPULSE_BUCKET", "week");
    map.insert("BRANDPULSE_TARGET_LANGUAGE", " EN ");
    map.insert("BRANDPULSE_CRISIS_THRESHOLD", "0.75");
    map.insert("BRANDPULSE_CRISIS_WINDOW_MINUTES", "15");
    map.insert("BRANDPULSE_CRISIS_MIN_POSTS", "3");
    map.insert("BRANDPULSE_WORKERS", "8");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.bucket, BucketWidth::Week);
    assert_eq!(cfg.target_language, "en");
    assert!((cfg.crisis_threshold - 0.75).abs() < f64::EPSILON);
    assert_eq!(cfg.crisis_window_minutes, 15);
    assert_eq!(cfg.crisis_min_posts, 3);
    assert_eq!(cfg.workers, 8);
}

#[test]
fn build_app_config_rejects_unknown_environment() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_ENV", "staging");
    expect_invalid(&map, "BRANDPULSE_ENV");
}

#[test]
fn build_app_config_rejects_unknown_bucket() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_BUCKET", "fortnight");
    expect_invalid(&map, "BRANDPULSE_BUCKET");
}

#[test]
fn crisis_threshold_must_be_a_number() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_CRISIS_THRESHOLD", "not-a-number");
    expect_invalid(&map, "BRANDPULSE_CRISIS_THRESHOLD");
}

#[test]
fn crisis_threshold_must_be_inside_unit_interval() {
    for value in ["0", "1", "1.5", "-0.1"] {
        let mut map = HashMap::new();
        map.insert("BRANDPULSE_CRISIS_THRESHOLD", value);
        expect_invalid(&map, "BRANDPULSE_CRISIS_THRESHOLD");
    }
}

#[test]
fn crisis_window_must_be_positive() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_CRISIS_WINDOW_MINUTES", "0");
    expect_invalid(&map, "BRANDPULSE_CRISIS_WINDOW_MINUTES");
}

#[test]
fn crisis_window_is_capped_at_one_year() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_CRISIS_WINDOW_MINUTES", "150000000000");
    expect_invalid(&map, "BRANDPULSE_CRISIS_WINDOW_MINUTES");

    let cap = MAX_CRISIS_WINDOW_MINUTES.to_string();
    map.insert("BRANDPULSE_CRISIS_WINDOW_MINUTES", cap.as_str());
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.crisis_window_minutes, MAX_CRISIS_WINDOW_MINUTES);
}

#[test]
fn crisis_min_posts_must_be_positive() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_CRISIS_MIN_POSTS", "0");
    expect_invalid(&map, "BRANDPULSE_CRISIS_MIN_POSTS");
}

#[test]
fn confidence_threshold_accepts_bounds() {
    for value in ["0", "1"] {
        let mut map = HashMap::new();
        map.insert("BRANDPULSE_CONFIDENCE_THRESHOLD", value);
        assert!(build_app_config(lookup_from_map(&map)).is_ok());
    }
}

#[test]
fn confidence_threshold_rejects_out_of_range() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_CONFIDENCE_THRESHOLD", "1.01");
    expect_invalid(&map, "BRANDPULSE_CONFIDENCE_THRESHOLD");
}

#[test]
fn near_duplicate_distance_is_capped() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_NEAR_DUPLICATE_DISTANCE", "4");
    expect_invalid(&map, "BRANDPULSE_NEAR_DUPLICATE_DISTANCE");

    map.insert("BRANDPULSE_NEAR_DUPLICATE_DISTANCE", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.near_duplicate_distance, 0);
}

#[test]
fn holdout_ratio_must_be_inside_unit_interval() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_HOLDOUT_RATIO", "1.0");
    expect_invalid(&map, "BRANDPULSE_HOLDOUT_RATIO");
}

#[test]
fn workers_must_be_positive() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_WORKERS", "0");
    expect_invalid(&map, "BRANDPULSE_WORKERS");
}

#[test]
fn empty_model_path_is_rejected() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_MODEL_PATH", "  ");
    expect_invalid(&map, "BRANDPULSE_MODEL_PATH");
}

#[test]
fn debug_output_lists_bucket_as_text() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(debug.contains("bucket: day"), "unexpected debug output: {debug}");
}
