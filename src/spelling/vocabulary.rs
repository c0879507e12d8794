//! Known-word vocabulary with unigram frequencies.

use std::collections::BTreeSet;

use ahash::AHashMap;

/// The set of words the corrector may propose, with their corpus frequencies.
///
/// Every stored word has a count greater than zero.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    /// Words and their frequencies
    words: AHashMap<String, u64>,
    /// Sum of all frequencies
    total_count: u64,
}

impl Vocabulary {
    /// Create a new empty vocabulary.
    pub fn new() -> Self {
        Vocabulary {
            words: AHashMap::new(),
            total_count: 0,
        }
    }

    /// Build a vocabulary by counting every token of every sentence.
    pub fn from_sentences<S: AsRef<[String]>>(sentences: &[S]) -> Self {
        let mut vocabulary = Vocabulary::new();
        for sentence in sentences {
            for token in sentence.as_ref() {
                vocabulary.increment_word(token);
            }
        }
        vocabulary
    }

    /// Increment the frequency of a word by 1.
    pub fn increment_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        *self.words.entry(word.to_string()).or_insert(0) += 1;
        self.total_count += 1;
    }

    /// Check if a word exists in the vocabulary.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    /// Get the frequency of a word (0 when unknown).
    pub fn frequency(&self, word: &str) -> u64 {
        self.words.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Sum of all word frequencies.
    pub fn total_frequency(&self) -> u64 {
        self.total_count
    }

    /// The sorted set of characters used by the known words.
    ///
    /// Candidate generation edits tokens over this alphabet, so it never
    /// proposes characters no known word contains.
    pub fn alphabet(&self) -> Vec<char> {
        self.words
            .keys()
            .flat_map(|word| word.chars())
            .collect::<BTreeSet<char>>()
            .into_iter()
            .collect()
    }

    /// Get the most frequent words, ties broken alphabetically.
    pub fn most_frequent_words(&self, limit: usize) -> Vec<(String, u64)> {
        let mut word_freq: Vec<(String, u64)> = self
            .words
            .iter()
            .map(|(word, freq)| (word.clone(), *freq))
            .collect();

        word_freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        word_freq.truncate(limit);
        word_freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_vocabulary_basic_operations() {
        let mut vocab = Vocabulary::new();

        assert!(!vocab.contains("hello"));
        assert_eq!(vocab.frequency("hello"), 0);
        assert_eq!(vocab.word_count(), 0);

        vocab.increment_word("hello");
        vocab.increment_word("hello");
        assert!(vocab.contains("hello"));
        assert_eq!(vocab.frequency("hello"), 2);
        assert_eq!(vocab.total_frequency(), 2);

        vocab.increment_word("world");
        assert_eq!(vocab.word_count(), 2);
        assert_eq!(vocab.total_frequency(), 3);
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let mut vocab = Vocabulary::new();
        vocab.increment_word("");

        assert!(!vocab.contains(""));
        assert_eq!(vocab.total_frequency(), 0);
    }

    #[test]
    fn test_from_sentences() {
        let vocab = Vocabulary::from_sentences(&sentences(&[
            "the quick brown fox",
            "the lazy dog",
            "the dog was lazy",
        ]));

        assert_eq!(vocab.frequency("the"), 3);
        assert_eq!(vocab.frequency("dog"), 2);
        assert_eq!(vocab.frequency("quick"), 1);
        assert_eq!(vocab.frequency("cat"), 0);
        assert_eq!(vocab.word_count(), 7);
        assert_eq!(vocab.total_frequency(), 11);
    }

    #[test]
    fn test_alphabet() {
        let vocab = Vocabulary::from_sentences(&sentences(&["cab bad"]));
        assert_eq!(vocab.alphabet(), vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_most_frequent_words() {
        let vocab = Vocabulary::from_sentences(&sentences(&[
            "common common common medium medium average average rare",
        ]));

        let top_words = vocab.most_frequent_words(3);
        assert_eq!(top_words.len(), 3);
        assert_eq!(top_words[0], ("common".to_string(), 3));
        assert_eq!(top_words[1], ("average".to_string(), 2));
        assert_eq!(top_words[2], ("medium".to_string(), 2));
    }
}
