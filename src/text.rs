//! Text normalization and tokenization.
//!
//! The correction engine works on pre-tokenized, lowercase sentences. These
//! helpers turn raw text (a training corpus, a line typed on the command line)
//! into that shape:
//!
//! ```
//! use noisy_speller::text::{normalize_text, split_sentences, tokenize};
//!
//! assert_eq!(normalize_text("Hello, World!"), "hello world");
//! assert_eq!(tokenize("The dog -- it's fast."), vec!["the", "dog", "its", "fast"]);
//!
//! let sentences = split_sentences("First one. Second one!");
//! assert_eq!(sentences, vec![vec!["first", "one"], vec!["second", "one"]]);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static QUOTE_FOLDING: [(char, char); 4] = [
    ('\u{201c}', '"'),
    ('\u{201d}', '"'),
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
];

static DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\u{2013}\u{2014}_]+").expect("valid dash pattern"));

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid non-word pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("valid sentence pattern"));

/// Lowercase the text and strip everything but letters, digits and single spaces.
///
/// Hyphens and dashes become spaces, so "well-known" yields two words.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| {
            QUOTE_FOLDING
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect::<String>()
        .to_lowercase();

    let spaced = DASHES.replace_all(&folded, " ");
    let cleaned = NON_WORD.replace_all(&spaced, "");
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Normalize the text and split it into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .unicode_words()
        .map(str::to_string)
        .collect()
}

/// Split raw text into tokenized sentences, dropping empty ones.
pub fn split_sentences(text: &str) -> Vec<Vec<String>> {
    SENTENCE_END
        .split(text)
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  The   QUICK brown\tfox "), "the quick brown fox");
        assert_eq!(normalize_text("well-known — fact"), "well known fact");
        assert_eq!(normalize_text("it\u{2019}s \u{201c}quoted\u{201d}"), "its quoted");
        assert_eq!(normalize_text("snake_case"), "snake case");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_normalize_keeps_non_ascii_letters() {
        assert_eq!(normalize_text("Café Résumé!"), "café résumé");
        assert_eq!(normalize_text("route 66"), "route 66");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("This is the first sentence."),
            vec!["this", "is", "the", "first", "sentence"]
        );
        assert!(tokenize("?!...").is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("This is the first sentence. Here is the second.\n\nThird");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], vec!["this", "is", "the", "first", "sentence"]);
        assert_eq!(sentences[1], vec!["here", "is", "the", "second"]);
        assert_eq!(sentences[2], vec!["third"]);
    }
}
