//! Post cleaning: text normalization, noise filtering and de-duplication.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use brandpulse_core::Post;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::types::{SkipCounts, SkipReason};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url regex"));
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\B@\w+:?").expect("valid mention regex"));
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));
static RETWEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:rt\b[\s:]*)+").expect("valid retweet regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// Targets for which untagged posts are checked for Latin script.
const LATIN_SCRIPT_LANGUAGES: &[&str] = &["en", "es", "fr", "de", "it", "pt", "nl", "sv", "da", "no"];

/// Minimum share of noise tokens (links, mentions, hashtags) for a post to
/// look automated, in tenths.
const BOT_NOISE_TENTHS: usize = 6;
const BOT_MIN_TOKENS: usize = 4;

const SIMHASH_BANDS: u32 = 4;

/// Settings for a [`Cleaner`].
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    /// Primary language subtag to keep, e.g. `"en"`.
    pub target_language: String,
    /// Maximum SimHash Hamming distance treated as a near-duplicate (0..=3).
    pub near_duplicate_distance: u32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            near_duplicate_distance: 3,
        }
    }
}

/// Normalize post text for classification.
///
/// Removes URLs, `@mentions` and leading retweet markers, unwraps hashtags,
/// decodes common HTML entities and collapses whitespace. Words, emoticons and
/// punctuation are kept. The transformation is applied until it reaches a
/// fixed point, so `clean_text(&clean_text(s)) == clean_text(s)`.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(text: &str) -> String {
    let mut s = text.to_string();
    for (entity, replacement) in ENTITIES {
        if s.contains(entity) {
            s = s.replace(entity, replacement);
        }
    }
    let s = URL_RE.replace_all(&s, " ");
    let s = MENTION_RE.replace_all(&s, " ");
    let s = HASHTAG_RE.replace_all(&s, "$1");
    let s = WHITESPACE_RE.replace_all(&s, " ");
    let s = RETWEET_RE.replace(s.trim(), "");
    s.trim().to_string()
}

/// Return a copy of `post` with cleaned text.
#[must_use]
pub fn clean_post(post: &Post) -> Post {
    Post {
        text: clean_text(&post.text),
        ..post.clone()
    }
}

/// Stateful per-batch cleaner. Remembers ids and fingerprints of kept posts
/// so later duplicates in the same batch are dropped.
#[derive(Debug)]
pub struct Cleaner {
    config: CleaningConfig,
    seen_ids: HashSet<String>,
    seen_exact: HashSet<[u8; 32]>,
    near_index: HashMap<String, SimHashIndex>,
    skipped: SkipCounts,
}

impl Cleaner {
    #[must_use]
    pub fn new(config: CleaningConfig) -> Self {
        Self {
            config,
            seen_ids: HashSet::new(),
            seen_exact: HashSet::new(),
            near_index: HashMap::new(),
            skipped: SkipCounts::default(),
        }
    }

    /// Clean one post, or report why it was dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] for dropped posts; the reason is also
    /// counted in [`Cleaner::skipped`].
    pub fn clean(&mut self, post: Post) -> Result<Post, SkipReason> {
        let result = self.check(post);
        if let Err(reason) = result {
            self.skipped.record(reason);
        }
        result
    }

    fn check(&mut self, post: Post) -> Result<Post, SkipReason> {
        // Ids are claimed by kept posts only, so a rejected copy does not
        // shadow a later valid one.
        if self.seen_ids.contains(&post.id) {
            return Err(SkipReason::DuplicateId);
        }

        if looks_automated(&post.text) {
            return Err(SkipReason::BotLike);
        }

        let text = clean_text(&post.text);
        if !text.chars().any(char::is_alphabetic) {
            return Err(SkipReason::Empty);
        }

        if !language_matches(post.language.as_deref(), &text, &self.config.target_language) {
            return Err(SkipReason::NonTargetLanguage);
        }

        let brand_key = post.brand.trim().to_lowercase();

        let digest = exact_fingerprint(&brand_key, &text);
        if self.seen_exact.contains(&digest) {
            return Err(SkipReason::ExactDuplicate);
        }

        let fingerprint = simhash(&text);
        let index = self.near_index.entry(brand_key).or_default();
        if index.contains_within(fingerprint, self.config.near_duplicate_distance) {
            return Err(SkipReason::NearDuplicate);
        }

        index.insert(fingerprint);
        self.seen_exact.insert(digest);
        self.seen_ids.insert(post.id.clone());

        Ok(Post { text, ..post })
    }

    /// Counts of posts dropped so far.
    #[must_use]
    pub fn skipped(&self) -> SkipCounts {
        self.skipped
    }
}

/// Raw text dominated by links, mentions and hashtags.
fn looks_automated(raw: &str) -> bool {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < BOT_MIN_TOKENS {
        return false;
    }
    let noise = tokens
        .iter()
        .filter(|t| {
            let lower = t.to_ascii_lowercase();
            lower.starts_with("http://")
                || lower.starts_with("https://")
                || lower.starts_with("www.")
                || t.starts_with('@')
                || t.starts_with('#')
        })
        .count();
    noise * 10 >= tokens.len() * BOT_NOISE_TENTHS
}

fn language_matches(tag: Option<&str>, cleaned: &str, target: &str) -> bool {
    let tag = tag
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("und"));
    match tag {
        Some(tag) => {
            let primary = tag.split(['-', '_']).next().unwrap_or(tag);
            primary.eq_ignore_ascii_case(target)
        }
        None => !LATIN_SCRIPT_LANGUAGES.contains(&target) || mostly_latin(cleaned),
    }
}

fn mostly_latin(text: &str) -> bool {
    let mut letters = 0_usize;
    let mut latin = 0_usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c) {
            latin += 1;
        }
    }
    letters > 0 && latin * 2 >= letters
}

fn exact_fingerprint(brand_key: &str, cleaned: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(brand_key.as_bytes());
    hasher.update([0_u8]);
    hasher.update(cleaned.to_lowercase().as_bytes());
    hasher.finalize().into()
}

fn stable_hash64(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// 64-bit SimHash over lowercased word unigrams and bigrams.
pub(crate) fn simhash(text: &str) -> u64 {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut weights = [0_i32; 64];
    let mut add = |feature: &str| {
        let h = stable_hash64(feature);
        for (bit, weight) in weights.iter_mut().enumerate() {
            if (h >> bit) & 1 == 1 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    };

    for word in &words {
        add(word);
    }
    for pair in words.windows(2) {
        add(&format!("{} {}", pair[0], pair[1]));
    }

    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > 0)
        .fold(0_u64, |acc, (bit, _)| acc | (1 << bit))
}

/// Fingerprints split into four 16-bit bands. Two fingerprints within
/// Hamming distance 3 share at least one band exactly.
#[derive(Debug, Default)]
struct SimHashIndex {
    bands: [HashMap<u16, Vec<u64>>; SIMHASH_BANDS as usize],
}

impl SimHashIndex {
    fn band_key(fingerprint: u64, band: u32) -> u16 {
        // Truncation keeps exactly the 16 bits of this band.
        #[allow(clippy::cast_possible_truncation)]
        let key = (fingerprint >> (16 * band)) as u16;
        key
    }

    fn contains_within(&self, fingerprint: u64, max_distance: u32) -> bool {
        (0..SIMHASH_BANDS).any(|band| {
            self.bands[band as usize]
                .get(&Self::band_key(fingerprint, band))
                .is_some_and(|candidates| {
                    candidates
                        .iter()
                        .any(|c| (c ^ fingerprint).count_ones() <= max_distance)
                })
        })
    }

    fn insert(&mut self, fingerprint: u64) {
        for band in 0..SIMHASH_BANDS {
            self.bands[band as usize]
                .entry(Self::band_key(fingerprint, band))
                .or_default()
                .push(fingerprint);
        }
    }
}

#[cfg(test)]
#[path = "clean_test.rs"]
mod tests;
