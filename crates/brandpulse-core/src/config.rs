use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::{BucketWidth, ConfigError};

/// Largest near-duplicate distance the banded SimHash index can answer exactly.
pub const MAX_NEAR_DUPLICATE_DISTANCE: u32 = 3;

/// Longest crisis window accepted from the environment: one year.
pub const MAX_CRISIS_WINDOW_MINUTES: i64 = 366 * 24 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default; only malformed or out-of-range values fail.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(invalid(var, "value must be non-empty".to_string()));
        }
        Ok(raw)
    };

    let env = parse_environment(&or_default("BRANDPULSE_ENV", "development"))?;
    let log_level = or_default("BRANDPULSE_LOG_LEVEL", "info");
    let brands_path = PathBuf::from(parse("BRANDPULSE_BRANDS_PATH", "./config/brands.yaml")?);
    let model_path = PathBuf::from(parse("BRANDPULSE_MODEL_PATH", "./models/sentiment.json")?);
    let target_language = parse("BRANDPULSE_TARGET_LANGUAGE", "en")?
        .trim()
        .to_ascii_lowercase();

    let bucket = BucketWidth::from_str(&or_default("BRANDPULSE_BUCKET", "day"))
        .map_err(|e| invalid("BRANDPULSE_BUCKET", e))?;

    let crisis_threshold = parse_number::<f64>(&lookup, "BRANDPULSE_CRISIS_THRESHOLD", "0.6")?;
    if !(crisis_threshold > 0.0 && crisis_threshold < 1.0) {
        return Err(invalid(
            "BRANDPULSE_CRISIS_THRESHOLD",
            format!("{crisis_threshold} is outside (0, 1)"),
        ));
    }

    let crisis_window_minutes =
        parse_number::<i64>(&lookup, "BRANDPULSE_CRISIS_WINDOW_MINUTES", "60")?;
    if crisis_window_minutes <= 0 {
        return Err(invalid(
            "BRANDPULSE_CRISIS_WINDOW_MINUTES",
            "window must be at least one minute".to_string(),
        ));
    }
    if crisis_window_minutes > MAX_CRISIS_WINDOW_MINUTES {
        return Err(invalid(
            "BRANDPULSE_CRISIS_WINDOW_MINUTES",
            format!("window must be at most {MAX_CRISIS_WINDOW_MINUTES} minutes"),
        ));
    }

    let crisis_min_posts = parse_number::<usize>(&lookup, "BRANDPULSE_CRISIS_MIN_POSTS", "10")?;
    if crisis_min_posts == 0 {
        return Err(invalid(
            "BRANDPULSE_CRISIS_MIN_POSTS",
            "must be at least 1".to_string(),
        ));
    }

    let confidence_threshold =
        parse_number::<f32>(&lookup, "BRANDPULSE_CONFIDENCE_THRESHOLD", "0.5")?;
    if !(0.0..=1.0).contains(&confidence_threshold) {
        return Err(invalid(
            "BRANDPULSE_CONFIDENCE_THRESHOLD",
            format!("{confidence_threshold} is outside [0, 1]"),
        ));
    }

    let near_duplicate_distance =
        parse_number::<u32>(&lookup, "BRANDPULSE_NEAR_DUPLICATE_DISTANCE", "3")?;
    if near_duplicate_distance > MAX_NEAR_DUPLICATE_DISTANCE {
        return Err(invalid(
            "BRANDPULSE_NEAR_DUPLICATE_DISTANCE",
            format!("must be at most {MAX_NEAR_DUPLICATE_DISTANCE}"),
        ));
    }

    let holdout_ratio = parse_number::<f64>(&lookup, "BRANDPULSE_HOLDOUT_RATIO", "0.2")?;
    if !(holdout_ratio > 0.0 && holdout_ratio < 1.0) {
        return Err(invalid(
            "BRANDPULSE_HOLDOUT_RATIO",
            format!("{holdout_ratio} is outside (0, 1)"),
        ));
    }

    let workers = parse_number::<usize>(&lookup, "BRANDPULSE_WORKERS", "4")?;
    if workers == 0 {
        return Err(invalid("BRANDPULSE_WORKERS", "must be at least 1".to_string()));
    }

    Ok(AppConfig {
        env,
        log_level,
        brands_path,
        model_path,
        target_language,
        bucket,
        crisis_threshold,
        crisis_window_minutes,
        crisis_min_posts,
        confidence_threshold,
        near_duplicate_distance,
        holdout_ratio,
        workers,
    })
}

fn parse_number<T>(
    lookup: &impl Fn(&str) -> Result<String, std::env::VarError>,
    var: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDPULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
