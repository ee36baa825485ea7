//! Sentiment classifiers.
//!
//! [`Classifier`] is the seam the pipeline depends on. [`NaiveBayesModel`] is
//! the trained implementation shipped with the CLI: a multinomial naive Bayes
//! over the sparse features from [`crate::features`], persisted as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use brandpulse_core::{Sentiment, SentimentLabel};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clean::clean_text;
use crate::error::SentimentError;
use crate::features::{FeatureConfig, FeatureVector};
use crate::types::LabeledText;

/// On-disk model layout understood by [`NaiveBayesModel::load`].
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Hex characters kept from the parameter digest.
const VERSION_LEN: usize = 12;

/// Maps text to a sentiment label.
///
/// Implementations must be deterministic: the same text under the same
/// [`Classifier::version`] always yields the same label.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> SentimentLabel;

    /// Identifier of the trained parameters.
    fn version(&self) -> &str;
}

/// Training knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    /// Additive (Lidstone) smoothing; `1.0` is Laplace.
    pub alpha: f64,
    pub features: FeatureConfig,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            features: FeatureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ClassStats {
    doc_count: u64,
    token_total: u64,
    term_counts: BTreeMap<String, u64>,
}

/// Multinomial naive Bayes sentiment model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    format_version: u32,
    alpha: f64,
    features: FeatureConfig,
    vocabulary_size: u64,
    classes: BTreeMap<Sentiment, ClassStats>,
    #[serde(skip)]
    version: String,
}

impl NaiveBayesModel {
    /// Fit a model on labeled examples. Texts are cleaned before feature
    /// extraction, the same way the pipeline cleans posts.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::EmptyCorpus`] when `examples` is empty and
    /// [`SentimentError::ModelInvalid`] when `alpha` is not a positive number.
    pub fn train(examples: &[LabeledText], options: TrainOptions) -> Result<Self, SentimentError> {
        if examples.is_empty() {
            return Err(SentimentError::EmptyCorpus);
        }
        if !(options.alpha.is_finite() && options.alpha > 0.0) {
            return Err(SentimentError::ModelInvalid(format!(
                "smoothing alpha must be positive, got {}",
                options.alpha
            )));
        }

        let mut classes: BTreeMap<Sentiment, ClassStats> =
            Sentiment::ALL.iter().map(|&s| (s, ClassStats::default())).collect();
        let mut vocabulary = BTreeSet::new();

        for example in examples {
            let features = options.features.extract(&clean_text(&example.text));
            let stats = classes.entry(example.sentiment).or_default();
            stats.doc_count += 1;
            for (term, count) in features.iter() {
                let count = u64::from(count);
                *stats.term_counts.entry(term.to_string()).or_insert(0) += count;
                stats.token_total += count;
                vocabulary.insert(term.to_string());
            }
        }

        let mut model = Self {
            format_version: MODEL_FORMAT_VERSION,
            alpha: options.alpha,
            features: options.features,
            vocabulary_size: vocabulary.len() as u64,
            classes,
            version: String::new(),
        };
        model.version = model.compute_version()?;

        tracing::info!(
            examples = examples.len(),
            vocabulary = model.vocabulary_size,
            version = %model.version,
            "trained naive bayes model"
        );
        Ok(model)
    }

    /// Read a model written by [`NaiveBayesModel::save`].
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::ModelMissing`] when no file exists at `path`,
    /// [`SentimentError::ModelInvalid`] when the content is not a usable model,
    /// and [`SentimentError::Io`] on other read failures.
    pub fn load(path: &Path) -> Result<Self, SentimentError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SentimentError::ModelMissing(path.to_path_buf()));
            }
            Err(e) => return Err(SentimentError::io(path, e)),
        };

        let mut model: Self = serde_json::from_str(&raw)
            .map_err(|e| SentimentError::ModelInvalid(format!("{}: {e}", path.display())))?;
        model.validate()?;
        model.version = model.compute_version()?;

        tracing::debug!(path = %path.display(), version = %model.version, "loaded sentiment model");
        Ok(model)
    }

    /// Write the model as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self, path: &Path) -> Result<(), SentimentError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SentimentError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| SentimentError::io(path, e))?;
        tracing::info!(path = %path.display(), version = %self.version, "saved sentiment model");
        Ok(())
    }

    #[must_use]
    pub fn feature_config(&self) -> FeatureConfig {
        self.features
    }

    /// Number of distinct terms seen during training.
    #[must_use]
    pub fn vocabulary_size(&self) -> u64 {
        self.vocabulary_size
    }

    /// Training examples seen for `sentiment`.
    #[must_use]
    pub fn doc_count(&self, sentiment: Sentiment) -> u64 {
        self.classes.get(&sentiment).map_or(0, |s| s.doc_count)
    }

    fn validate(&self) -> Result<(), SentimentError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(SentimentError::ModelInvalid(format!(
                "unsupported format_version {} (expected {MODEL_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(SentimentError::ModelInvalid(format!(
                "smoothing alpha must be positive, got {}",
                self.alpha
            )));
        }
        if self.classes.values().all(|s| s.doc_count == 0) {
            return Err(SentimentError::ModelInvalid(
                "model has no training examples".to_string(),
            ));
        }
        Ok(())
    }

    fn compute_version(&self) -> Result<String, SentimentError> {
        let canonical = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&canonical);
        let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        hex.truncate(VERSION_LEN);
        Ok(hex)
    }

    fn is_known_term(&self, term: &str) -> bool {
        self.classes.values().any(|s| s.term_counts.contains_key(term))
    }

    /// Unnormalized log posterior per class, in tie-breaking order. Classes
    /// without training examples get `None`.
    #[allow(clippy::cast_precision_loss)]
    fn log_scores(&self, features: &FeatureVector) -> [(Sentiment, Option<f64>); 3] {
        let total_docs: u64 = self.classes.values().map(|s| s.doc_count).sum();
        let vocabulary = self.vocabulary_size as f64;

        Sentiment::ALL.map(|sentiment| {
            let score = self
                .classes
                .get(&sentiment)
                .filter(|s| s.doc_count > 0)
                .map(|stats| {
                    let denominator = stats.token_total as f64 + self.alpha * vocabulary;
                    let mut log_p = (stats.doc_count as f64 / total_docs as f64).ln();
                    for (term, count) in features.iter() {
                        if !self.is_known_term(term) {
                            continue;
                        }
                        let term_count =
                            stats.term_counts.get(term).copied().unwrap_or(0) as f64;
                        log_p += f64::from(count) * ((term_count + self.alpha) / denominator).ln();
                    }
                    log_p
                });
            (sentiment, score)
        })
    }
}

impl Classifier for NaiveBayesModel {
    #[allow(clippy::cast_possible_truncation)]
    fn classify(&self, text: &str) -> SentimentLabel {
        let features = self.features.extract(&clean_text(text));
        let scores = self.log_scores(&features);

        let mut best: Option<(Sentiment, f64)> = None;
        for &(sentiment, score) in &scores {
            if let Some(score) = score {
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((sentiment, score));
                }
            }
        }
        let Some((sentiment, max)) = best else {
            return SentimentLabel::new(Sentiment::Neutral, 0.0);
        };

        let normalizer: f64 = scores
            .iter()
            .filter_map(|&(_, s)| s)
            .map(|s| (s - max).exp())
            .sum();
        SentimentLabel::new(sentiment, (1.0 / normalizer) as f32)
    }

    fn version(&self) -> &str {
        &self.version
    }
}
