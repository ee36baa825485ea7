//! Rolling-window crisis detection on negative sentiment.

use std::collections::{HashMap, VecDeque};

use brandpulse_core::{AppConfig, LabeledPost, Sentiment};
use chrono::{DateTime, TimeDelta, Utc};

use crate::types::CrisisSignal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrisisConfig {
    /// Negative ratio that must be strictly exceeded, in `(0, 1)`.
    pub threshold: f64,
    /// Length of the rolling window ending at the newest post.
    pub window: TimeDelta,
    /// Posts the window must hold before a signal can fire.
    pub min_posts: usize,
    /// Labels below this confidence are not counted.
    pub min_confidence: f32,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            window: TimeDelta::minutes(60),
            min_posts: 10,
            min_confidence: 0.5,
        }
    }
}

impl CrisisConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            threshold: config.crisis_threshold,
            window: TimeDelta::try_minutes(config.crisis_window_minutes)
                .unwrap_or(TimeDelta::MAX),
            min_posts: config.crisis_min_posts,
            min_confidence: config.confidence_threshold,
        }
    }
}

#[derive(Debug, Default)]
struct BrandWindow {
    events: VecDeque<(DateTime<Utc>, bool)>,
    negatives: usize,
    in_crisis: bool,
}

impl BrandWindow {
    fn push(&mut self, at: DateTime<Utc>, negative: bool, window: TimeDelta) {
        self.events.push_back((at, negative));
        if negative {
            self.negatives += 1;
        }
        // A window reaching past the earliest representable time expires nothing.
        let Some(cutoff) = at.checked_sub_signed(window) else {
            return;
        };
        while let Some(&(oldest, was_negative)) = self.events.front() {
            if oldest > cutoff {
                break;
            }
            self.events.pop_front();
            if was_negative {
                self.negatives -= 1;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn negative_ratio(&self) -> f64 {
        if self.events.is_empty() {
            0.0
        } else {
            self.negatives as f64 / self.events.len() as f64
        }
    }
}

/// Streaming detector. Feed posts in timestamp order.
///
/// Each brand fires at most once per crossing: after a signal the brand stays
/// in crisis until its negative ratio falls back to the threshold or below.
#[derive(Debug)]
pub struct CrisisDetector {
    config: CrisisConfig,
    brands: HashMap<String, BrandWindow>,
}

impl CrisisDetector {
    #[must_use]
    pub fn new(config: CrisisConfig) -> Self {
        Self {
            config,
            brands: HashMap::new(),
        }
    }

    pub fn observe(&mut self, labeled: &LabeledPost) -> Option<CrisisSignal> {
        if labeled.label.confidence < self.config.min_confidence {
            return None;
        }

        let at = labeled.post.timestamp;
        let state = self.brands.entry(labeled.post.brand.clone()).or_default();
        state.push(
            at,
            labeled.label.sentiment == Sentiment::Negative,
            self.config.window,
        );
        let ratio = state.negative_ratio();

        if state.in_crisis {
            if ratio <= self.config.threshold {
                state.in_crisis = false;
                tracing::info!(brand = %labeled.post.brand, ratio, "crisis cleared");
            }
            return None;
        }

        if state.events.len() < self.config.min_posts || ratio <= self.config.threshold {
            return None;
        }

        state.in_crisis = true;
        let window_start = state.events.front().map_or(at, |&(ts, _)| ts);
        tracing::warn!(
            brand = %labeled.post.brand,
            ratio,
            window_posts = state.events.len(),
            "crisis threshold crossed"
        );
        Some(CrisisSignal {
            brand: labeled.post.brand.clone(),
            triggered_at: at,
            window_start,
            negative_ratio: ratio,
            window_posts: state.events.len(),
            threshold: self.config.threshold,
        })
    }

    /// Whether `brand` is currently above the threshold.
    #[must_use]
    pub fn in_crisis(&self, brand: &str) -> bool {
        self.brands.get(brand).is_some_and(|s| s.in_crisis)
    }
}

/// Run a fresh detector over `posts` sorted by `(timestamp, id)`.
#[must_use]
pub fn detect_crises(posts: &[LabeledPost], config: &CrisisConfig) -> Vec<CrisisSignal> {
    let mut ordered: Vec<&LabeledPost> = posts.iter().collect();
    ordered.sort_by(|a, b| {
        a.post
            .timestamp
            .cmp(&b.post.timestamp)
            .then_with(|| a.post.id.cmp(&b.post.id))
    });

    let mut detector = CrisisDetector::new(*config);
    ordered
        .into_iter()
        .filter_map(|post| detector.observe(post))
        .collect()
}

#[cfg(test)]
mod tests {
    use brandpulse_core::{Engagement, Post, SentimentLabel};

    use super::*;

    fn post_at(minute: i64, brand: &str, sentiment: Sentiment, confidence: f32) -> LabeledPost {
        let base: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        LabeledPost {
            post: Post {
                id: format!("{brand}-{minute}"),
                brand: brand.to_string(),
                text: "text".to_string(),
                timestamp: base + TimeDelta::minutes(minute),
                author_id: "a".to_string(),
                engagement: Engagement::default(),
                language: None,
            },
            label: SentimentLabel::new(sentiment, confidence),
        }
    }

    fn config(min_posts: usize) -> CrisisConfig {
        CrisisConfig {
            threshold: 0.6,
            window: TimeDelta::minutes(60),
            min_posts,
            min_confidence: 0.5,
        }
    }

    #[test]
    fn fires_once_per_crossing() {
        let posts: Vec<LabeledPost> = (0..10)
            .map(|m| post_at(m, "Verizon", Sentiment::Negative, 0.9))
            .collect();
        let signals = detect_crises(&posts, &config(3));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].window_posts, 3);
        assert_eq!(signals[0].triggered_at, posts[2].post.timestamp);
        assert_eq!(signals[0].window_start, posts[0].post.timestamp);
        assert_eq!(signals[0].negative_ratio, 1.0);
    }

    #[test]
    fn rearms_after_ratio_recovers() {
        let mut posts = Vec::new();
        for m in 0..3 {
            posts.push(post_at(m, "Comcast", Sentiment::Negative, 0.9));
        }
        // 3 negative of 5: exactly at the threshold, which clears the crisis.
        for m in 3..5 {
            posts.push(post_at(m, "Comcast", Sentiment::Positive, 0.9));
        }
        for m in 5..10 {
            posts.push(post_at(m, "Comcast", Sentiment::Negative, 0.9));
        }
        let signals = detect_crises(&posts, &config(3));
        assert_eq!(signals.len(), 2);
        // 4 negative of 6 is the first ratio above 0.6 after recovery.
        assert_eq!(signals[1].triggered_at, posts[5].post.timestamp);
    }

    #[test]
    fn ratio_equal_to_threshold_does_not_fire() {
        let posts = vec![
            post_at(0, "FIFA", Sentiment::Negative, 0.9),
            post_at(1, "FIFA", Sentiment::Negative, 0.9),
            post_at(2, "FIFA", Sentiment::Negative, 0.9),
            post_at(3, "FIFA", Sentiment::Positive, 0.9),
            post_at(4, "FIFA", Sentiment::Positive, 0.9),
        ];
        assert!(detect_crises(&posts, &config(5)).is_empty());
    }

    #[test]
    fn low_confidence_labels_are_ignored() {
        let posts: Vec<LabeledPost> = (0..10)
            .map(|m| post_at(m, "Apple", Sentiment::Negative, 0.3))
            .collect();
        assert!(detect_crises(&posts, &config(3)).is_empty());
    }

    #[test]
    fn old_posts_leave_the_window() {
        // One negative post every 40 minutes: never three inside an hour.
        let posts: Vec<LabeledPost> = (0..6)
            .map(|i| post_at(i * 40, "Xbox", Sentiment::Negative, 0.9))
            .collect();
        assert!(detect_crises(&posts, &config(3)).is_empty());
    }

    #[test]
    fn brands_are_tracked_independently() {
        let mut detector = CrisisDetector::new(config(2));
        assert!(detector.observe(&post_at(0, "A", Sentiment::Negative, 0.9)).is_none());
        assert!(detector.observe(&post_at(1, "B", Sentiment::Positive, 0.9)).is_none());
        assert!(detector.observe(&post_at(2, "A", Sentiment::Negative, 0.9)).is_some());
        assert!(detector.in_crisis("A"));
        assert!(!detector.in_crisis("B"));
    }

    #[test]
    fn unbounded_window_keeps_every_post() {
        let wide = CrisisConfig {
            window: TimeDelta::MAX,
            ..config(3)
        };
        let mut detector = CrisisDetector::new(wide);
        assert!(detector.observe(&post_at(0, "Verizon", Sentiment::Negative, 0.9)).is_none());
        assert!(detector.observe(&post_at(600, "Verizon", Sentiment::Negative, 0.9)).is_none());
        let signal = detector
            .observe(&post_at(6000, "Verizon", Sentiment::Negative, 0.9))
            .expect("three negatives inside an unbounded window");
        assert_eq!(signal.window_posts, 3);
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let mut posts: Vec<LabeledPost> = (0..12)
            .map(|m| {
                let s = if m % 5 == 0 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                };
                post_at(m, "Nvidia", s, 0.9)
            })
            .collect();
        let forward = detect_crises(&posts, &config(4));
        posts.reverse();
        assert_eq!(detect_crises(&posts, &config(4)), forward);
        assert_eq!(forward.len(), 1);
    }
}
