//! Brand sentiment pipeline.
//!
//! Reads social posts as JSON Lines, cleans and de-duplicates them, labels
//! each with a trained naive Bayes model, and folds the labels into
//! per-brand, per-bucket health metrics with rolling-window crisis signals.

pub mod aggregate;
pub mod classifier;
pub mod clean;
pub mod crisis;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod ingest;
pub mod pipeline;
pub mod scorer;
pub mod types;

pub use aggregate::{
    aggregate, audit, summarize_brands, summarize_categories, BrandMetricWindow, BrandSummary,
    CategorySummary, Discrepancy, HealthBand, MetricAccumulator, SentimentCounts,
};
pub use classifier::{Classifier, NaiveBayesModel, TrainOptions};
pub use clean::{clean_post, clean_text, Cleaner, CleaningConfig};
pub use crisis::{detect_crises, CrisisConfig, CrisisDetector};
pub use error::SentimentError;
pub use evaluate::{evaluate, split_holdout, Evaluation, TARGET_ACCURACY};
pub use features::{FeatureConfig, FeatureVector};
pub use ingest::{
    read_corpus, read_corpus_as, read_corpus_csv, read_posts, write_jsonl, CorpusFormat, Ingested,
};
pub use pipeline::{load_classifier, run_pipeline, PipelineConfig, PipelineOutput};
pub use scorer::lexicon_score;
pub use types::{CrisisSignal, LabeledText, PipelineReport, SkipCounts, SkipReason};
