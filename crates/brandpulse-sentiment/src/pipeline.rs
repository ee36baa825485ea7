//! Batch pipeline orchestration.

use std::path::Path;
use std::sync::Arc;

use brandpulse_core::{AppConfig, BrandsFile, BucketWidth, LabeledPost, Post};
use uuid::Uuid;

use crate::aggregate::{audit, BrandMetricWindow, MetricAccumulator};
use crate::classifier::{Classifier, NaiveBayesModel};
use crate::clean::{Cleaner, CleaningConfig};
use crate::crisis::{detect_crises, CrisisConfig};
use crate::error::SentimentError;
use crate::types::{CrisisSignal, PipelineReport};

/// Settings for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bucket_width: BucketWidth,
    pub cleaning: CleaningConfig,
    pub crisis: CrisisConfig,
    /// Number of classification chunks run on the blocking pool.
    pub workers: usize,
    /// Tracked brands. When set, posts are renamed to the canonical brand
    /// name and posts for other brands are skipped.
    pub brands: Option<BrandsFile>,
    /// Emit empty windows for gaps in each brand's timeline.
    pub dense: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket_width: BucketWidth::Day,
            cleaning: CleaningConfig::default(),
            crisis: CrisisConfig::default(),
            workers: 4,
            brands: None,
            dense: false,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, brands: Option<BrandsFile>) -> Self {
        Self {
            bucket_width: config.bucket,
            cleaning: CleaningConfig {
                target_language: config.target_language.clone(),
                near_duplicate_distance: config.near_duplicate_distance,
            },
            crisis: CrisisConfig::from_app_config(config),
            workers: config.workers,
            brands,
            dense: false,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub model_version: String,
    pub windows: Vec<BrandMetricWindow>,
    pub crises: Vec<CrisisSignal>,
    /// Classified posts in `(timestamp, id)` order.
    pub labeled: Vec<LabeledPost>,
    pub report: PipelineReport,
}

/// Load the trained model from disk.
///
/// # Errors
///
/// Propagates [`NaiveBayesModel::load`] failures. A missing model is fatal
/// for a run, so callers should do this before reading any input.
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, SentimentError> {
    let model = NaiveBayesModel::load(path)?;
    Ok(Arc::new(model))
}

/// Clean, classify, aggregate and scan a batch of posts.
///
/// Dropped posts never fail the run; they are counted in
/// [`PipelineReport::skipped`].
///
/// # Errors
///
/// Returns [`SentimentError::Worker`] if a classification task panics.
pub async fn run_pipeline(
    classifier: Arc<dyn Classifier>,
    mut posts: Vec<Post>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, SentimentError> {
    let run_id = Uuid::new_v4();
    let model_version = classifier.version().to_string();
    tracing::info!(
        %run_id,
        posts = posts.len(),
        model_version = %model_version,
        bucket = %config.bucket_width,
        "starting sentiment pipeline"
    );

    let mut report = PipelineReport {
        ingested: posts.len(),
        ..PipelineReport::default()
    };

    posts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut cleaner = Cleaner::new(config.cleaning.clone());
    let mut untracked = 0;
    let mut kept = Vec::with_capacity(posts.len());
    for mut post in posts {
        if let Some(brands) = &config.brands {
            match brands.resolve(&post.brand) {
                Some(tracked) => post.brand.clone_from(&tracked.name),
                None => {
                    tracing::debug!(id = %post.id, brand = %post.brand, "skipping untracked brand");
                    untracked += 1;
                    continue;
                }
            }
        }
        match cleaner.clean(post) {
            Ok(cleaned) => kept.push(cleaned),
            Err(reason) => tracing::trace!(%reason, "post dropped during cleaning"),
        }
    }
    report.skipped = cleaner.skipped();
    report.skipped.untracked_brand = untracked;
    report.kept = kept.len();

    let chunks = split_chunks(kept, config.workers);
    let mut handles = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let classifier = Arc::clone(&classifier);
        let width = config.bucket_width;
        handles.push(tokio::task::spawn_blocking(move || {
            classify_chunk(classifier.as_ref(), chunk, width)
        }));
    }

    let mut accumulator = MetricAccumulator::new(config.bucket_width);
    let mut labeled = Vec::with_capacity(report.kept);
    for handle in handles {
        let (part, partial) = handle.await?;
        labeled.extend(part);
        accumulator.merge(partial);
    }
    report.classified = labeled.len();

    let windows = if config.dense {
        accumulator.finish_dense()
    } else {
        accumulator.finish()
    };
    report.discrepancies = audit(&windows, &labeled).len();

    let crises = detect_crises(&labeled, &config.crisis);

    tracing::info!(
        %run_id,
        kept = report.kept,
        classified = report.classified,
        skipped = report.skipped.total(),
        windows = windows.len(),
        crises = crises.len(),
        "sentiment pipeline complete"
    );

    Ok(PipelineOutput {
        run_id,
        model_version,
        windows,
        crises,
        labeled,
        report,
    })
}

/// Split `posts` into at most `workers` contiguous chunks, preserving order.
fn split_chunks(mut posts: Vec<Post>, workers: usize) -> Vec<Vec<Post>> {
    if posts.is_empty() {
        return Vec::new();
    }
    let size = posts.len().div_ceil(workers.max(1));
    let mut chunks = Vec::new();
    while posts.len() > size {
        let tail = posts.split_off(size);
        chunks.push(std::mem::replace(&mut posts, tail));
    }
    chunks.push(posts);
    chunks
}

fn classify_chunk(
    classifier: &dyn Classifier,
    posts: Vec<Post>,
    width: BucketWidth,
) -> (Vec<LabeledPost>, MetricAccumulator) {
    let mut accumulator = MetricAccumulator::new(width);
    let labeled: Vec<LabeledPost> = posts
        .into_iter()
        .map(|post| {
            let label = classifier.classify(&post.text);
            let labeled = LabeledPost { post, label };
            accumulator.add(&labeled);
            labeled
        })
        .collect();
    (labeled, accumulator)
}
