// 🔤 Text Similarity - Pure scoring functions for fuzzy linking
// Independent of the matching cascade so each score can be checked in isolation.

use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Words that carry no identity in element names or budget descriptions.
const STOPWORDS: &[&str] = &[
    // Spanish
    "de", "del", "la", "las", "el", "los", "y", "en", "con", "para", "por", "a", "al", "un",
    "una", "unos", "unas", "sin", "sobre",
    // English
    "the", "of", "and", "with", "for", "in", "on", "to", "an",
];

/// Normalize free text for matching.
///
/// - Unicode NFKC fold
/// - lowercase (accented letters kept: "Jácena" → "jácena")
/// - punctuation → space
/// - whitespace collapsed
///
/// ```
/// use bim_budget_recon::similarity::normalize_text;
///
/// assert_eq!(normalize_text("Pilar - 600 x 600 mm"), "pilar 600 x 600 mm");
/// ```
pub fn normalize_text(text: &str) -> String {
    let folded: String = text.nfkc().collect();

    let stripped: String = folded
        .chars()
        .flat_map(|c| {
            let mapped: Vec<char> = if c.is_alphanumeric() {
                c.to_lowercase().collect()
            } else {
                vec![' ']
            };
            mapped
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized words with stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// |A ∩ B| / |A ∪ B|; 0.0 when either side is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    intersection as f64 / union as f64
}

/// Jaccard similarity over stopword-free word sets.
pub fn description_similarity(a: &str, b: &str) -> f64 {
    PreparedText::new(a).description_score(&PreparedText::new(b))
}

/// Name similarity: 1.0 for equal normalized text, partial credit when every
/// token of the shorter name appears in the longer one, 0.0 otherwise.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    PreparedText::new(a).name_score(&PreparedText::new(b))
}

/// Attribute-value form: trimmed, whitespace collapsed, lowercased.
///
/// Punctuation survives, so "600 mm" and "600mm" stay different.
pub fn normalize_for_comparison(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// PREPARED TEXT
// ============================================================================

/// Text normalized once and scored many times (n·m loops in the matcher).
#[derive(Debug, Clone)]
pub struct PreparedText {
    normalized: String,
    /// All tokens, stopwords included
    tokens: BTreeSet<String>,
    /// Tokens without stopwords
    words: BTreeSet<String>,
}

impl PreparedText {
    pub fn new(text: &str) -> Self {
        let normalized = normalize_text(text);
        let tokens: BTreeSet<String> = normalized.split_whitespace().map(str::to_string).collect();
        let words = tokens
            .iter()
            .filter(|t| !STOPWORDS.contains(&t.as_str()))
            .cloned()
            .collect();

        PreparedText {
            normalized,
            tokens,
            words,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn name_score(&self, other: &PreparedText) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }

        if self.normalized == other.normalized {
            return 1.0;
        }

        let (shorter, longer) = if self.tokens.len() <= other.tokens.len() {
            (&self.tokens, &other.tokens)
        } else {
            (&other.tokens, &self.tokens)
        };

        if shorter.is_subset(longer) {
            0.5 + 0.5 * (shorter.len() as f64 / longer.len() as f64)
        } else {
            0.0
        }
    }

    pub fn description_score(&self, other: &PreparedText) -> f64 {
        jaccard(&self.words, &other.words)
    }
}

// ============================================================================
// TESTS
// ============================================================================
