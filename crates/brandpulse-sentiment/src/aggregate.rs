//! Brand health aggregation over time buckets.
//!
//! [`MetricAccumulator`] only keeps integer sums keyed by (brand, bucket), so
//! accumulators built from any partition of the same posts merge into the
//! same state. Ratios and scores are derived once, in [`MetricAccumulator::finish`].

use std::collections::BTreeMap;

use brandpulse_core::{BrandCategory, BrandsFile, BucketWidth, LabeledPost, Sentiment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-sentiment integer totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    pub fn add(&mut self, sentiment: Sentiment, amount: u64) {
        let slot = match sentiment {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Negative => &mut self.negative,
            Sentiment::Neutral => &mut self.neutral,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn merge(&mut self, other: &SentimentCounts) {
        self.positive = self.positive.saturating_add(other.positive);
        self.negative = self.negative.saturating_add(other.negative);
        self.neutral = self.neutral.saturating_add(other.neutral);
    }

    #[must_use]
    pub fn get(&self, sentiment: Sentiment) -> u64 {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.positive
            .saturating_add(self.negative)
            .saturating_add(self.neutral)
    }
}

/// Qualitative reading of a health index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    #[must_use]
    pub fn from_index(health_index: f64) -> Self {
        if health_index > 20.0 {
            HealthBand::Excellent
        } else if health_index > 0.0 {
            HealthBand::Good
        } else if health_index < -20.0 {
            HealthBand::Poor
        } else {
            HealthBand::Fair
        }
    }
}

impl std::fmt::Display for HealthBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthBand::Excellent => write!(f, "excellent"),
            HealthBand::Good => write!(f, "good"),
            HealthBand::Fair => write!(f, "fair"),
            HealthBand::Poor => write!(f, "poor"),
        }
    }
}

/// Aggregated sentiment and engagement for one brand in one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandMetricWindow {
    pub brand: String,
    pub bucket_start: DateTime<Utc>,
    pub bucket_width: BucketWidth,
    /// Posts per sentiment.
    pub counts: SentimentCounts,
    /// Raw engagement (likes + retweets + replies) per sentiment.
    pub engagement: SentimentCounts,
    /// Engagement weight per sentiment; every post weighs at least 1.
    pub weights: SentimentCounts,
    pub total_posts: u64,
    pub total_engagement: u64,
    /// Fraction of all posts in this bucket that mention this brand.
    pub share_of_voice: f64,
    /// `100 * (positive - negative) / total_posts`.
    pub sentiment_score: f64,
    /// Engagement-weighted net sentiment in `[-100, 100]`.
    pub health_index: f64,
    pub health: HealthBand,
}

impl BrandMetricWindow {
    /// A window with no posts: all zeros, [`HealthBand::Fair`].
    #[must_use]
    pub fn empty(brand: &str, bucket_start: DateTime<Utc>, bucket_width: BucketWidth) -> Self {
        Self::from_sums(brand, bucket_start, bucket_width, &Sums::default(), 0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_sums(
        brand: &str,
        bucket_start: DateTime<Utc>,
        bucket_width: BucketWidth,
        sums: &Sums,
        bucket_posts: u64,
    ) -> Self {
        let total_posts = sums.counts.total();
        let share_of_voice = if bucket_posts == 0 {
            0.0
        } else {
            total_posts as f64 / bucket_posts as f64
        };
        let scores = Scores::from_sums(sums);
        Self {
            brand: brand.to_string(),
            bucket_start,
            bucket_width,
            counts: sums.counts,
            engagement: sums.engagement,
            weights: sums.weights,
            total_posts,
            total_engagement: sums.engagement.total(),
            share_of_voice,
            sentiment_score: scores.sentiment_score,
            health_index: scores.health_index,
            health: HealthBand::from_index(scores.health_index),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sums {
    counts: SentimentCounts,
    engagement: SentimentCounts,
    weights: SentimentCounts,
}

impl Sums {
    fn merge(&mut self, other: &Sums) {
        self.counts.merge(&other.counts);
        self.engagement.merge(&other.engagement);
        self.weights.merge(&other.weights);
    }
}

struct Scores {
    sentiment_score: f64,
    health_index: f64,
}

impl Scores {
    #[allow(clippy::cast_precision_loss)]
    fn from_sums(sums: &Sums) -> Self {
        let net = |c: &SentimentCounts| {
            let total = c.total();
            if total == 0 {
                0.0
            } else {
                100.0 * (c.positive as f64 - c.negative as f64) / total as f64
            }
        };
        Self {
            sentiment_score: net(&sums.counts),
            health_index: net(&sums.weights),
        }
    }
}

/// Sum-only aggregation state keyed by (brand, bucket start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricAccumulator {
    bucket_width: BucketWidth,
    cells: BTreeMap<(String, DateTime<Utc>), Sums>,
}

impl MetricAccumulator {
    #[must_use]
    pub fn new(bucket_width: BucketWidth) -> Self {
        Self {
            bucket_width,
            cells: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn bucket_width(&self) -> BucketWidth {
        self.bucket_width
    }

    /// Number of (brand, bucket) cells with at least one post.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn add(&mut self, labeled: &LabeledPost) {
        let key = (
            labeled.post.brand.clone(),
            self.bucket_width.bucket_start(labeled.post.timestamp),
        );
        let sentiment = labeled.label.sentiment;
        let sums = self.cells.entry(key).or_default();
        sums.counts.add(sentiment, 1);
        sums.engagement.add(sentiment, labeled.post.engagement.total());
        sums.weights.add(sentiment, labeled.weight());
    }

    /// Fold `other` into `self`. Both must use the same bucket width.
    pub fn merge(&mut self, other: MetricAccumulator) {
        debug_assert_eq!(self.bucket_width, other.bucket_width);
        for (key, sums) in other.cells {
            self.cells.entry(key).or_default().merge(&sums);
        }
    }

    /// One window per (brand, bucket) that received posts, sorted by brand
    /// then bucket start.
    #[must_use]
    pub fn finish(&self) -> Vec<BrandMetricWindow> {
        let bucket_posts = self.bucket_posts();
        self.cells
            .iter()
            .map(|((brand, start), sums)| {
                let in_bucket = bucket_posts.get(start).copied().unwrap_or(0);
                BrandMetricWindow::from_sums(brand, *start, self.bucket_width, sums, in_bucket)
            })
            .collect()
    }

    /// Like [`MetricAccumulator::finish`], plus empty windows for buckets
    /// between a brand's first and last active bucket.
    #[must_use]
    pub fn finish_dense(&self) -> Vec<BrandMetricWindow> {
        let windows = self.finish();
        let mut out = Vec::with_capacity(windows.len());
        let mut previous: Option<&BrandMetricWindow> = None;
        for window in &windows {
            if let Some(prev) = previous.filter(|p| p.brand == window.brand) {
                let mut gap = prev.bucket_start + self.bucket_width.step();
                while gap < window.bucket_start {
                    out.push(BrandMetricWindow::empty(&window.brand, gap, self.bucket_width));
                    gap += self.bucket_width.step();
                }
            }
            out.push(window.clone());
            previous = Some(window);
        }
        out
    }

    fn bucket_posts(&self) -> BTreeMap<DateTime<Utc>, u64> {
        let mut totals = BTreeMap::new();
        for ((_, start), sums) in &self.cells {
            let entry: &mut u64 = totals.entry(*start).or_insert(0);
            *entry = entry.saturating_add(sums.counts.total());
        }
        totals
    }
}

/// Aggregate labeled posts in one pass.
#[must_use]
pub fn aggregate(posts: &[LabeledPost], bucket_width: BucketWidth) -> Vec<BrandMetricWindow> {
    let mut acc = MetricAccumulator::new(bucket_width);
    for post in posts {
        acc.add(post);
    }
    acc.finish()
}

/// Whole-period totals for one brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSummary {
    pub brand: String,
    pub mentions: u64,
    pub counts: SentimentCounts,
    pub engagement: SentimentCounts,
    pub weights: SentimentCounts,
    /// Fraction of all posts in the period.
    pub share_of_voice: f64,
    pub sentiment_score: f64,
    pub health_index: f64,
    pub health: HealthBand,
}

/// Totals for one brand category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: BrandCategory,
    pub brands: usize,
    pub mentions: u64,
    pub counts: SentimentCounts,
    pub engagement: SentimentCounts,
    pub sentiment_score: f64,
    pub health_index: f64,
    pub health: HealthBand,
}

/// Roll windows up into one summary per brand, most mentioned first.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize_brands(windows: &[BrandMetricWindow]) -> Vec<BrandSummary> {
    let mut per_brand: BTreeMap<&str, Sums> = BTreeMap::new();
    for window in windows {
        per_brand.entry(&window.brand).or_default().merge(&Sums {
            counts: window.counts,
            engagement: window.engagement,
            weights: window.weights,
        });
    }
    let all_posts: u64 = per_brand.values().map(|s| s.counts.total()).sum();

    let mut summaries: Vec<BrandSummary> = per_brand
        .into_iter()
        .map(|(brand, sums)| {
            let mentions = sums.counts.total();
            let scores = Scores::from_sums(&sums);
            BrandSummary {
                brand: brand.to_string(),
                mentions,
                counts: sums.counts,
                engagement: sums.engagement,
                weights: sums.weights,
                share_of_voice: if all_posts == 0 {
                    0.0
                } else {
                    mentions as f64 / all_posts as f64
                },
                sentiment_score: scores.sentiment_score,
                health_index: scores.health_index,
                health: HealthBand::from_index(scores.health_index),
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.brand.cmp(&b.brand)));
    summaries
}

/// Group brand summaries by the category assigned in the brands file.
/// Brands missing from the file fall under [`BrandCategory::Other`].
#[must_use]
pub fn summarize_categories(summaries: &[BrandSummary], brands: &BrandsFile) -> Vec<CategorySummary> {
    let mut per_category: BTreeMap<BrandCategory, (usize, Sums)> = BTreeMap::new();
    for summary in summaries {
        let (count, sums) = per_category
            .entry(brands.category_of(&summary.brand))
            .or_default();
        *count += 1;
        sums.merge(&Sums {
            counts: summary.counts,
            engagement: summary.engagement,
            weights: summary.weights,
        });
    }

    per_category
        .into_iter()
        .map(|(category, (brand_count, sums))| {
            let scores = Scores::from_sums(&sums);
            CategorySummary {
                category,
                brands: brand_count,
                mentions: sums.counts.total(),
                counts: sums.counts,
                engagement: sums.engagement,
                sentiment_score: scores.sentiment_score,
                health_index: scores.health_index,
                health: HealthBand::from_index(scores.health_index),
            }
        })
        .collect()
}

/// A window that does not reconcile with the posts it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub brand: String,
    pub bucket_start: DateTime<Utc>,
    /// Which quantity disagrees, e.g. `counts.negative`.
    pub field: String,
    /// Value recomputed from the posts.
    pub expected: u64,
    /// Value found in the window.
    pub actual: u64,
}

/// Recompute every window from `posts` and report mismatches.
///
/// Windows with no posts are only expected where the posts leave a gap, so
/// an all-zero window never counts as a discrepancy.
#[must_use]
pub fn audit(windows: &[BrandMetricWindow], posts: &[LabeledPost]) -> Vec<Discrepancy> {
    let width = windows.first().map_or(BucketWidth::Day, |w| w.bucket_width);
    let mut expected = MetricAccumulator::new(width);
    for post in posts {
        expected.add(post);
    }

    let mut found: BTreeMap<(String, DateTime<Utc>), Sums> = BTreeMap::new();
    let mut out = Vec::new();
    for window in windows {
        let mismatch = |field: &str, expected: u64, actual: u64| Discrepancy {
            brand: window.brand.clone(),
            bucket_start: window.bucket_start,
            field: field.to_string(),
            expected,
            actual,
        };
        if window.total_posts != window.counts.total() {
            out.push(mismatch("total_posts", window.counts.total(), window.total_posts));
        }
        if window.total_engagement != window.engagement.total() {
            out.push(mismatch(
                "total_engagement",
                window.engagement.total(),
                window.total_engagement,
            ));
        }
        found
            .entry((window.brand.clone(), window.bucket_start))
            .or_default()
            .merge(&Sums {
                counts: window.counts,
                engagement: window.engagement,
                weights: window.weights,
            });
    }

    let mut keys: Vec<&(String, DateTime<Utc>)> =
        expected.cells.keys().chain(found.keys()).collect();
    keys.sort();
    keys.dedup();

    let zero = Sums::default();
    for key in keys {
        let want = expected.cells.get(key).unwrap_or(&zero);
        let have = found.get(key).unwrap_or(&zero);
        for (group, w, h) in [
            ("counts", &want.counts, &have.counts),
            ("engagement", &want.engagement, &have.engagement),
            ("weights", &want.weights, &have.weights),
        ] {
            for sentiment in Sentiment::ALL {
                if w.get(sentiment) != h.get(sentiment) {
                    out.push(Discrepancy {
                        brand: key.0.clone(),
                        bucket_start: key.1,
                        field: format!("{group}.{sentiment}"),
                        expected: w.get(sentiment),
                        actual: h.get(sentiment),
                    });
                }
            }
        }
    }

    if !out.is_empty() {
        tracing::warn!(discrepancies = out.len(), "aggregation audit found mismatches");
    }
    out
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
