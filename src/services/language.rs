//! Heuristic language detector.
//!
//! Counts Italian and English indicator words plus Italian diacritics over a
//! bounded prefix of the text. Pure and deterministic; no external calls.
//! Ties resolve toward English.

use phf::{phf_set, Set};
use serde::{Deserialize, Serialize};

/// Detected language of a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    En,
    It,
    /// Only ever produced by deserializing foreign data, never by `detect`.
    Unknown,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Unknown => "unknown",
        }
    }
}

/// Common indicator words for each language.
static ITALIAN_INDICATORS: Set<&'static str> = phf_set! {
    "il", "la", "di", "che", "è", "sono", "della", "del", "una", "un",
};

static ENGLISH_INDICATORS: Set<&'static str> = phf_set! {
    "the", "is", "are", "was", "were", "of", "and", "to", "in", "a",
};

/// How much of the text the detector looks at.
const DETECT_PREFIX_CHARS: usize = 4000;

/// Italian-only diacritics; a weak but cheap signal on short texts.
const ITALIAN_DIACRITICS: [char; 7] = ['à', 'è', 'é', 'ì', 'ò', 'ù', 'í'];

/// Detect the predominant language of `text`.
pub fn detect(text: &str) -> Language {
    let prefix: String = text.chars().take(DETECT_PREFIX_CHARS).collect();
    let lower = prefix.to_lowercase();

    let mut italian_score = 0usize;
    let mut english_score = 0usize;
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if ITALIAN_INDICATORS.contains(word) {
            italian_score += 1;
        }
        if ENGLISH_INDICATORS.contains(word) {
            english_score += 1;
        }
    }

    italian_score += lower.chars().filter(|c| is_italian_diacritic(*c)).count();

    if italian_score > english_score {
        Language::It
    } else {
        Language::En
    }
}

fn is_italian_diacritic(c: char) -> bool {
    ITALIAN_DIACRITICS.contains(&c)
}
