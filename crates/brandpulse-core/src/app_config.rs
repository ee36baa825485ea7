use std::path::PathBuf;

use crate::BucketWidth;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub brands_path: PathBuf,
    pub model_path: PathBuf,
    pub target_language: String,
    pub bucket: BucketWidth,
    pub crisis_threshold: f64,
    pub crisis_window_minutes: i64,
    pub crisis_min_posts: usize,
    pub confidence_threshold: f32,
    pub near_duplicate_distance: u32,
    pub holdout_ratio: f64,
    pub workers: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("brands_path", &self.brands_path)
            .field("model_path", &self.model_path)
            .field("target_language", &self.target_language)
            .field("bucket", &format_args!("{}", self.bucket))
            .field("crisis_threshold", &self.crisis_threshold)
            .field("crisis_window_minutes", &self.crisis_window_minutes)
            .field("crisis_min_posts", &self.crisis_min_posts)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("near_duplicate_distance", &self.near_duplicate_distance)
            .field("holdout_ratio", &self.holdout_ratio)
            .field("workers", &self.workers)
            .finish()
    }
}
