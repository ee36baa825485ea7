//! Shared domain types and configuration for brandpulse.

pub mod app_config;
pub mod brands;
pub mod bucket;
pub mod config;
pub mod post;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use brands::{load_brands, BrandCategory, BrandConfig, BrandsFile};
pub use bucket::BucketWidth;
pub use config::{load_app_config, load_app_config_from_env};
pub use post::{Engagement, LabeledPost, Post, Sentiment, SentimentLabel, UnknownSentiment};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read brands file {path}: {source}")]
    BrandsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brands file: {0}")]
    BrandsFileParse(#[from] serde_yaml::Error),

    #[error("brands config validation failed: {0}")]
    Validation(String),
}
