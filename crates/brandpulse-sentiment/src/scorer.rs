//! Lexicon scorer for brand mentions on social media.

/// Word weights for consumer-brand chatter.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("love", 0.5),
    ("loved", 0.5),
    ("loving", 0.5),
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("best", 0.5),
    ("fantastic", 0.5),
    ("perfect", 0.5),
    ("happy", 0.4),
    ("nice", 0.3),
    ("fun", 0.3),
    ("enjoy", 0.4),
    ("enjoying", 0.4),
    ("recommend", 0.4),
    ("thanks", 0.3),
    ("thank", 0.3),
    ("beautiful", 0.4),
    ("fast", 0.2),
    ("fixed", 0.3),
    ("win", 0.4),
    ("wow", 0.3),
    ("brilliant", 0.5),
    ("incredible", 0.5),
    // Negative signals
    ("hate", -0.6),
    ("hated", -0.6),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("worst", -0.6),
    ("bad", -0.4),
    ("poor", -0.4),
    ("broken", -0.5),
    ("bug", -0.3),
    ("bugs", -0.3),
    ("buggy", -0.4),
    ("crash", -0.5),
    ("crashes", -0.5),
    ("crashing", -0.5),
    ("slow", -0.3),
    ("lag", -0.4),
    ("laggy", -0.4),
    ("outage", -0.5),
    ("down", -0.2),
    ("refund", -0.4),
    ("scam", -0.7),
    ("disappointed", -0.5),
    ("disappointing", -0.5),
    ("annoying", -0.4),
    ("useless", -0.5),
    ("trash", -0.5),
    ("garbage", -0.5),
    ("failed", -0.4),
    ("fail", -0.4),
    ("problem", -0.3),
    ("issue", -0.2),
    ("issues", -0.2),
    ("sucks", -0.5),
    ("angry", -0.5),
];

/// Words that flip the polarity of the next sentiment word.
const NEGATORS: &[&str] = &["not", "no", "never", "cannot", "cant", "dont", "isnt", "wasnt"];

/// How many following words a negator reaches.
const NEGATION_REACH: usize = 3;

fn weight_of(word: &str) -> Option<f32> {
    LEXICON
        .iter()
        .find(|&&(lex_word, _)| lex_word == word)
        .map(|&(_, weight)| weight)
}

pub(crate) fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. A negator (`not`, `never`, `*n't`, ...)
/// flips the next sentiment word within three words. Returns `0.0` for
/// empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    let mut negation_left = 0_usize;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic() && c != '\'')
            .trim_matches('\'')
            .to_lowercase();
        if w.is_empty() {
            continue;
        }
        if is_negator(&w) {
            negation_left = NEGATION_REACH;
            continue;
        }
        if let Some(weight) = weight_of(&w) {
            if negation_left > 0 {
                score -= weight;
                negation_left = 0;
            } else {
                score += weight;
            }
        } else {
            negation_left = negation_left.saturating_sub(1);
        }
    }
    score.clamp(-1.0, 1.0)
}
