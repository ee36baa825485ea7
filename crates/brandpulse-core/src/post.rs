use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engagement counters captured with a post at ingestion time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
}

impl Engagement {
    /// Sum of all counters, saturating at `u64::MAX`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.likes
            .saturating_add(self.retweets)
            .saturating_add(self.replies)
    }
}

/// A social post mentioning a brand.
///
/// Posts are never mutated after ingestion; cleaning produces a new `Post`
/// with normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Source-assigned identifier, unique within a batch.
    pub id: String,
    /// Brand the post was collected for, as named by the source.
    pub brand: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub author_id: String,
    #[serde(default)]
    pub engagement: Engagement,
    /// Language tag reported by the source (e.g. `"en"`), if any.
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// All variants, in tie-breaking order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown sentiment label: {0}")]
pub struct UnknownSentiment(pub String);

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    /// Parses labels case-insensitively. The `irrelevant` label used by
    /// public Twitter brand datasets is folded into `Neutral`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" | "irrelevant" => Ok(Sentiment::Neutral),
            _ => Err(UnknownSentiment(s.to_string())),
        }
    }
}

/// Classifier output for one post.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentLabel {
    pub sentiment: Sentiment,
    /// Posterior confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl SentimentLabel {
    /// Build a label, clamping `confidence` into `[0.0, 1.0]`. `NaN` becomes `0.0`.
    #[must_use]
    pub fn new(sentiment: Sentiment, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            sentiment,
            confidence,
        }
    }
}

/// A post together with its single sentiment label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPost {
    pub post: Post,
    pub label: SentimentLabel,
}

impl LabeledPost {
    /// Engagement weight used by aggregation: total engagement, at least 1.
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.post.engagement.total().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_post(likes: u64, retweets: u64, replies: u64) -> Post {
        Post {
            id: "1".to_string(),
            brand: "Nvidia".to_string(),
            text: "new gpu looks great".to_string(),
            timestamp: "2024-03-01T12:00:00Z".parse().unwrap(),
            author_id: "u1".to_string(),
            engagement: Engagement {
                likes,
                retweets,
                replies,
            },
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn engagement_total_sums_counters() {
        let e = Engagement {
            likes: 3,
            retweets: 2,
            replies: 1,
        };
        assert_eq!(e.total(), 6);
    }

    #[test]
    fn engagement_total_saturates() {
        let e = Engagement {
            likes: u64::MAX,
            retweets: 1,
            replies: 0,
        };
        assert_eq!(e.total(), u64::MAX);
    }

    #[test]
    fn sentiment_parses_case_insensitively() {
        assert_eq!("Positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!("NEGATIVE".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert_eq!(" neutral ".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
    }

    #[test]
    fn irrelevant_folds_into_neutral() {
        assert_eq!("Irrelevant".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
    }

    #[test]
    fn unknown_sentiment_is_rejected() {
        let err = "mixed".parse::<Sentiment>().unwrap_err();
        assert!(err.to_string().contains("mixed"));
    }

    #[test]
    fn sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Negative).unwrap();
        assert_eq!(json, "\"negative\"");
    }

    #[test]
    fn label_confidence_is_clamped() {
        assert_eq!(SentimentLabel::new(Sentiment::Positive, 1.7).confidence, 1.0);
        assert_eq!(SentimentLabel::new(Sentiment::Positive, -0.2).confidence, 0.0);
        assert_eq!(SentimentLabel::new(Sentiment::Positive, f32::NAN).confidence, 0.0);
    }

    #[test]
    fn post_deserializes_with_defaults() {
        let json = r#"{
            "id": "42",
            "brand": "Verizon",
            "text": "signal dropped again",
            "timestamp": "2024-03-01T08:30:00Z",
            "author_id": "a9"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.engagement, Engagement::default());
        assert!(post.language.is_none());
    }

    #[test]
    fn labeled_post_weight_is_at_least_one() {
        let labeled = LabeledPost {
            post: make_post(0, 0, 0),
            label: SentimentLabel::new(Sentiment::Neutral, 0.5),
        };
        assert_eq!(labeled.weight(), 1);

        let labeled = LabeledPost {
            post: make_post(7, 2, 1),
            label: SentimentLabel::new(Sentiment::Neutral, 0.5),
        };
        assert_eq!(labeled.weight(), 10);
    }
}
