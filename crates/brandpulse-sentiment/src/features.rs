//! Text to sparse term-count features.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scorer::{is_negator, lexicon_score};

/// Pseudo-terms emitted when the lexicon score is strongly signed.
pub const LEXICON_POSITIVE: &str = "__lex_pos__";
pub const LEXICON_NEGATIVE: &str = "__lex_neg__";

const LEXICON_HINT_THRESHOLD: f32 = 0.3;

/// Prefix applied to words inside a negation scope.
const NEGATED_PREFIX: &str = "not_";

/// Emoticons kept as tokens, mapped to a canonical spelling.
const EMOTICONS: &[(&str, &str)] = &[
    (":)", ":)"),
    (":-)", ":)"),
    ("(:", ":)"),
    (";)", ";)"),
    (":d", ":d"),
    (":(", ":("),
    (":-(", ":("),
    ("):", ":("),
    (":/", ":/"),
    (":'(", ":'("),
    ("<3", "<3"),
];

/// Characters that close a negation scope.
const CLAUSE_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Feature extraction settings. Persisted with the model so training and
/// inference always extract the same features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub bigrams: bool,
    pub negation: bool,
    pub lexicon_hints: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            bigrams: true,
            negation: true,
            lexicon_hints: true,
        }
    }
}

/// Sparse term counts for one text, in sorted term order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub terms: BTreeMap<String, u32>,
}

impl FeatureVector {
    fn add(&mut self, term: String) {
        *self.terms.entry(term).or_insert(0) += 1;
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of all term counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.terms.values().map(|&c| u64::from(c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.terms.iter().map(|(t, &c)| (t.as_str(), c))
    }
}

impl FeatureConfig {
    /// Turn cleaned text into a [`FeatureVector`].
    #[must_use]
    pub fn extract(&self, text: &str) -> FeatureVector {
        let words = tokenize(text, self.negation);
        let mut features = FeatureVector::default();

        if self.bigrams {
            for pair in words.windows(2) {
                features.add(format!("{} {}", pair[0], pair[1]));
            }
        }
        for word in words {
            features.add(word);
        }

        if self.lexicon_hints {
            let score = lexicon_score(text);
            if score >= LEXICON_HINT_THRESHOLD {
                features.add(LEXICON_POSITIVE.to_string());
            } else if score <= -LEXICON_HINT_THRESHOLD {
                features.add(LEXICON_NEGATIVE.to_string());
            }
        }

        features
    }
}

/// Lowercase word tokens with emoticons kept. When `negation` is set, words
/// after a negator get a `not_` prefix until the next clause punctuation.
#[must_use]
pub fn tokenize(text: &str, negation: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut negating = false;

    for chunk in text.split_whitespace() {
        let lower = chunk.to_lowercase();
        if let Some(&(_, canonical)) = EMOTICONS.iter().find(|(e, _)| *e == lower) {
            tokens.push(canonical.to_string());
            continue;
        }

        let mut word = String::new();
        for c in lower.chars() {
            if c.is_alphanumeric() || c == '\'' {
                word.push(c);
                continue;
            }
            push_word(&mut tokens, &mut word, &mut negating, negation);
            if CLAUSE_PUNCTUATION.contains(&c) {
                negating = false;
            }
        }
        push_word(&mut tokens, &mut word, &mut negating, negation);
    }

    tokens
}

fn push_word(tokens: &mut Vec<String>, word: &mut String, negating: &mut bool, negation: bool) {
    let trimmed = word.trim_matches('\'');
    if !trimmed.is_empty() {
        if negation && is_negator(trimmed) {
            tokens.push(trimmed.to_string());
            *negating = true;
        } else if negation && *negating {
            tokens.push(format!("{NEGATED_PREFIX}{trimmed}"));
        } else {
            tokens.push(trimmed.to_string());
        }
    }
    word.clear();
}
