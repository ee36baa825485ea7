use brandpulse_core::Sentiment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One human-labeled example from a training or evaluation corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub id: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub text: String,
    pub sentiment: Sentiment,
}

/// Why a post was dropped before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Line could not be parsed into a post.
    Malformed,
    /// Post id was already seen in this batch.
    DuplicateId,
    /// No alphabetic content left after cleaning.
    Empty,
    NonTargetLanguage,
    /// Mostly links, mentions and hashtags.
    BotLike,
    ExactDuplicate,
    NearDuplicate,
    /// Brand is not listed in the tracked brands file.
    UntrackedBrand,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::Malformed => "malformed",
            SkipReason::DuplicateId => "duplicate_id",
            SkipReason::Empty => "empty",
            SkipReason::NonTargetLanguage => "non_target_language",
            SkipReason::BotLike => "bot_like",
            SkipReason::ExactDuplicate => "exact_duplicate",
            SkipReason::NearDuplicate => "near_duplicate",
            SkipReason::UntrackedBrand => "untracked_brand",
        };
        f.write_str(s)
    }
}

/// Per-reason counts of dropped records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub malformed: usize,
    pub duplicate_id: usize,
    pub empty: usize,
    pub non_target_language: usize,
    pub bot_like: usize,
    pub exact_duplicate: usize,
    pub near_duplicate: usize,
    pub untracked_brand: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::Malformed => &mut self.malformed,
            SkipReason::DuplicateId => &mut self.duplicate_id,
            SkipReason::Empty => &mut self.empty,
            SkipReason::NonTargetLanguage => &mut self.non_target_language,
            SkipReason::BotLike => &mut self.bot_like,
            SkipReason::ExactDuplicate => &mut self.exact_duplicate,
            SkipReason::NearDuplicate => &mut self.near_duplicate,
            SkipReason::UntrackedBrand => &mut self.untracked_brand,
        };
        *slot += 1;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.malformed
            + self.duplicate_id
            + self.empty
            + self.non_target_language
            + self.bot_like
            + self.exact_duplicate
            + self.near_duplicate
            + self.untracked_brand
    }
}

/// Emitted when a brand's negative ratio crosses the crisis threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisSignal {
    pub brand: String,
    /// Timestamp of the post that pushed the ratio over the threshold.
    pub triggered_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub negative_ratio: f64,
    pub window_posts: usize,
    pub threshold: f64,
}

/// Bookkeeping for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Posts handed to the pipeline (after parsing).
    pub ingested: usize,
    /// Posts that survived cleaning.
    pub kept: usize,
    pub classified: usize,
    pub skipped: SkipCounts,
    /// Windows that failed reconciliation against their posts.
    #[serde(default)]
    pub discrepancies: usize,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ingested {}, kept {}, classified {}, skipped {}",
            self.ingested,
            self.kept,
            self.classified,
            self.skipped.total()
        )?;
        let reasons = [
            (SkipReason::Malformed, self.skipped.malformed),
            (SkipReason::DuplicateId, self.skipped.duplicate_id),
            (SkipReason::Empty, self.skipped.empty),
            (SkipReason::NonTargetLanguage, self.skipped.non_target_language),
            (SkipReason::BotLike, self.skipped.bot_like),
            (SkipReason::ExactDuplicate, self.skipped.exact_duplicate),
            (SkipReason::NearDuplicate, self.skipped.near_duplicate),
            (SkipReason::UntrackedBrand, self.skipped.untracked_brand),
        ];
        let detail: Vec<String> = reasons
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(reason, n)| format!("{reason}: {n}"))
            .collect();
        if !detail.is_empty() {
            write!(f, " ({})", detail.join(", "))?;
        }
        Ok(())
    }
}
