//! Candidate generation within two edits of an observed token.
//!
//! Edits are applied to the observed token to recover what the writer may
//! have intended. Each edit is recorded as the [`EditStep`] the writer would
//! have made, so inserting a letter into the observed token corresponds to a
//! deletion error, deleting one corresponds to an insertion error, and so on.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use ahash::AHashMap;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::spelling::error_model::{EditOperation, EditStep, ErrorModel, WORD_BOUNDARY};
use crate::spelling::vocabulary::Vocabulary;

/// Configuration for the candidate generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Tokens longer than this only get distance-1 candidates.
    pub max_expansion_chars: usize,
    /// Tokens longer than this get no edited candidates at all.
    pub max_token_chars: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_expansion_chars: 24,
            max_token_chars: 64,
        }
    }
}

/// A known word that may have been intended instead of the observed token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// The proposed word.
    pub word: String,
    /// Edits from the candidate to the observed token, in the order the
    /// writer would have made them. Empty for the observed token itself.
    pub edits: Vec<EditStep>,
    /// Error-model probability of the edit path (1 for the empty path).
    pub edit_probability: f64,
}

impl Candidate {
    /// The zero-edit candidate: the observed token was intended.
    pub fn original(word: &str) -> Self {
        Candidate {
            word: word.to_string(),
            edits: Vec::new(),
            edit_probability: 1.0,
        }
    }

    /// Number of edits on the path.
    pub fn distance(&self) -> usize {
        self.edits.len()
    }

    /// Whether this candidate keeps the observed token.
    pub fn is_original(&self) -> bool {
        self.edits.is_empty()
    }

    fn is_better_than(&self, other: &Candidate) -> bool {
        self.edit_probability
            .total_cmp(&other.edit_probability)
            .then_with(|| other.edits.len().cmp(&self.edits.len()))
            .then_with(|| other.edits.cmp(&self.edits))
            .is_gt()
    }
}

/// An edit applied to a string position, turning the observed side into the intended side.
#[derive(Debug, Clone, Copy)]
enum Edit {
    Insert { at: usize, ch: char },
    Delete { at: usize },
    Replace { at: usize, ch: char },
    Swap { at: usize },
}

/// Enumerates vocabulary words within two edits of a token.
pub struct CandidateGenerator<'a> {
    vocabulary: &'a Vocabulary,
    error_model: &'a ErrorModel,
    alphabet: &'a [char],
    config: GeneratorConfig,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(
        vocabulary: &'a Vocabulary,
        error_model: &'a ErrorModel,
        alphabet: &'a [char],
        config: GeneratorConfig,
    ) -> Self {
        CandidateGenerator {
            vocabulary,
            error_model,
            alphabet,
            config,
        }
    }

    /// All known words reachable from `token` in at most two edits, sorted by word.
    ///
    /// The token itself is included as the zero-edit candidate when it is a
    /// known word. A word reachable by several paths keeps the most probable
    /// one.
    pub fn generate(&self, token: &str) -> Vec<Candidate> {
        let observed: Vec<char> = token.chars().collect();
        let mut memo: AHashMap<EditStep, f64> = AHashMap::new();
        let mut best: BTreeMap<String, Candidate> = BTreeMap::new();

        if self.vocabulary.contains(token) {
            best.insert(token.to_string(), Candidate::original(token));
        }

        if observed.len() > self.config.max_token_chars {
            trace!(
                "Token '{}' has {} characters, skipping candidate search",
                token,
                observed.len()
            );
            return best.into_values().collect();
        }

        // Most probable single edit for every distance-1 string, known or not
        let mut first: AHashMap<String, (EditStep, f64)> = AHashMap::new();
        for (word, edit) in self.variants(&observed) {
            let step = edit_step(&observed, edit);
            let probability = self.lookup(&step, &mut memo);
            let replace = match first.get(&word) {
                Some((kept, p)) => probability
                    .total_cmp(p)
                    .then_with(|| kept.cmp(&step))
                    .is_gt(),
                None => true,
            };
            if replace {
                first.insert(word, (step, probability));
            }
        }

        for (word, (step, probability)) in &first {
            if word != token && self.vocabulary.contains(word) {
                offer(
                    &mut best,
                    Candidate {
                        word: word.clone(),
                        edits: vec![step.clone()],
                        edit_probability: *probability,
                    },
                );
            }
        }

        if observed.len() <= self.config.max_expansion_chars {
            for (intermediate, (last_step, last_probability)) in &first {
                let chars: Vec<char> = intermediate.chars().collect();
                for (word, edit) in self.variants(&chars) {
                    if word == token || !self.vocabulary.contains(&word) {
                        continue;
                    }
                    let step = edit_step(&chars, edit);
                    let probability = self.lookup(&step, &mut memo) * last_probability;
                    offer(
                        &mut best,
                        Candidate {
                            word,
                            edits: vec![step, last_step.clone()],
                            edit_probability: probability,
                        },
                    );
                }
            }
        } else {
            trace!(
                "Token '{}' has {} characters, skipping distance-2 expansion",
                token,
                observed.len()
            );
        }

        trace!("Generated {} candidates for '{}'", best.len(), token);
        best.into_values().collect()
    }

    fn lookup(&self, step: &EditStep, memo: &mut AHashMap<EditStep, f64>) -> f64 {
        if let Some(&probability) = memo.get(step) {
            return probability;
        }
        let probability = self.error_model.step_probability(step);
        memo.insert(step.clone(), probability);
        probability
    }

    /// Every string one edit away from `word`, over the alphabet.
    fn variants(&self, word: &[char]) -> Vec<(String, Edit)> {
        let mut variants =
            Vec::with_capacity((2 * word.len() + 1) * self.alphabet.len() + 2 * word.len());

        for at in 0..=word.len() {
            for &ch in self.alphabet {
                variants.push((apply(word, Edit::Insert { at, ch }), Edit::Insert { at, ch }));
            }
        }
        for at in 0..word.len() {
            variants.push((apply(word, Edit::Delete { at }), Edit::Delete { at }));
            for &ch in self.alphabet {
                if ch != word[at] {
                    variants.push((apply(word, Edit::Replace { at, ch }), Edit::Replace { at, ch }));
                }
            }
        }
        for at in 0..word.len().saturating_sub(1) {
            if word[at] != word[at + 1] {
                variants.push((apply(word, Edit::Swap { at }), Edit::Swap { at }));
            }
        }

        variants
    }
}

fn offer(best: &mut BTreeMap<String, Candidate>, candidate: Candidate) {
    match best.entry(candidate.word.clone()) {
        Entry::Vacant(entry) => {
            entry.insert(candidate);
        }
        Entry::Occupied(mut entry) => {
            if candidate.is_better_than(entry.get()) {
                entry.insert(candidate);
            }
        }
    }
}

fn apply(word: &[char], edit: Edit) -> String {
    let mut chars = word.to_vec();
    match edit {
        Edit::Insert { at, ch } => chars.insert(at, ch),
        Edit::Delete { at } => {
            chars.remove(at);
        }
        Edit::Replace { at, ch } => chars[at] = ch,
        Edit::Swap { at } => chars.swap(at, at + 1),
    }
    chars.into_iter().collect()
}

/// The writer's edit that an edit of the observed string undoes.
fn edit_step(observed: &[char], edit: Edit) -> EditStep {
    let previous = |at: usize| {
        if at == 0 {
            WORD_BOUNDARY
        } else {
            observed[at - 1]
        }
    };

    match edit {
        Edit::Insert { at, ch } => {
            let prev = previous(at);
            EditStep::new(EditOperation::Deletion, format!("{prev}{ch}"), prev.to_string())
        }
        Edit::Delete { at } => {
            let prev = previous(at);
            EditStep::new(
                EditOperation::Insertion,
                prev.to_string(),
                format!("{prev}{}", observed[at]),
            )
        }
        Edit::Replace { at, ch } => EditStep::new(
            EditOperation::Substitution,
            ch.to_string(),
            observed[at].to_string(),
        ),
        Edit::Swap { at } => EditStep::new(
            EditOperation::Transposition,
            format!("{}{}", observed[at + 1], observed[at]),
            format!("{}{}", observed[at], observed[at + 1]),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spelling::distance::edit_distance;
    use crate::spelling::error_model::{ErrorModelConfig, ErrorRecord};

    fn vocabulary(words: &[&str]) -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        for word in words {
            vocabulary.increment_word(word);
        }
        vocabulary
    }

    fn words(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.word.as_str()).collect()
    }

    #[test]
    fn test_distance_one_edits_map_to_writer_errors() {
        let vocab = vocabulary(&["example", "the", "cat", "at"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let candidates = generator.generate("exmple");
        let example = candidates.iter().find(|c| c.word == "example").unwrap();
        assert_eq!(example.edits, vec![EditStep::new(EditOperation::Deletion, "xa", "x")]);

        let candidates = generator.generate("teh");
        let the = candidates.iter().find(|c| c.word == "the").unwrap();
        assert_eq!(the.edits, vec![EditStep::new(EditOperation::Transposition, "he", "eh")]);

        let candidates = generator.generate("caat");
        let cat = candidates.iter().find(|c| c.word == "cat").unwrap();
        assert_eq!(cat.edits, vec![EditStep::new(EditOperation::Insertion, "a", "aa")]);

        let candidates = generator.generate("cot");
        let cat = candidates.iter().find(|c| c.word == "cat").unwrap();
        assert_eq!(cat.edits, vec![EditStep::new(EditOperation::Substitution, "a", "o")]);

        let candidates = generator.generate("xat");
        let at = candidates.iter().find(|c| c.word == "at").unwrap();
        assert_eq!(at.edits, vec![EditStep::new(EditOperation::Insertion, "#", "#x")]);
    }

    #[test]
    fn test_distance_two_paths() {
        let vocab = vocabulary(&["example"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let candidates = generator.generate("exmpel");
        assert_eq!(words(&candidates), vec!["example"]);
        assert_eq!(candidates[0].distance(), 2);
        assert!((candidates[0].edit_probability - 1e-12).abs() < 1e-20);
    }

    #[test]
    fn test_candidates_are_known_and_within_two_edits() {
        let vocab = vocabulary(&["the", "then", "them", "cat", "hat", "heat", "elephant"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let candidates = generator.generate("thne");
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!(vocab.contains(&candidate.word));
            assert!(edit_distance(&candidate.word, "thne") <= 2);
            assert!(candidate.distance() >= 1 && candidate.distance() <= 2);
        }
        assert!(!words(&candidates).contains(&"elephant"));
    }

    #[test]
    fn test_known_token_includes_original() {
        let vocab = vocabulary(&["hat", "cat"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let candidates = generator.generate("hat");
        assert_eq!(words(&candidates), vec!["cat", "hat"]);
        let original = &candidates[1];
        assert!(original.is_original());
        assert_eq!(original.edit_probability, 1.0);
    }

    #[test]
    fn test_deduplication_keeps_most_probable_path() {
        let vocab = vocabulary(&["ab"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::from_records(
            &[ErrorRecord {
                operation: EditOperation::Transposition,
                source: "ab".to_string(),
                target: "ba".to_string(),
                count: 10,
            }],
            ErrorModelConfig::default(),
        )
        .unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        // "ba" reaches "ab" by one swap or by two substitutions
        let candidates = generator.generate("ba");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].edits,
            vec![EditStep::new(EditOperation::Transposition, "ab", "ba")]
        );
    }

    #[test]
    fn test_no_candidates() {
        let vocab = vocabulary(&["elephant"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        assert!(generator.generate("zzz").is_empty());
    }

    #[test]
    fn test_long_tokens_skip_second_edit() {
        let vocab = vocabulary(&["example"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let config = GeneratorConfig {
            max_expansion_chars: 4,
            ..Default::default()
        };
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, config);

        assert!(generator.generate("exmpel").is_empty());
        assert_eq!(words(&generator.generate("exmple")), vec!["example"]);
    }

    #[test]
    fn test_overlong_tokens_skip_search() {
        let long = "a".repeat(70);
        let vocab = vocabulary(&[long.as_str(), "aa"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let typo = format!("{}b", "a".repeat(69));
        assert!(generator.generate(&typo).is_empty());

        let candidates = generator.generate(&long);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_original());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let vocab = vocabulary(&["the", "then", "than", "that", "this", "tea", "ten"]);
        let alphabet = vocab.alphabet();
        let model = ErrorModel::empty(ErrorModelConfig::default()).unwrap();
        let generator = CandidateGenerator::new(&vocab, &model, &alphabet, GeneratorConfig::default());

        let first = generator.generate("teh");
        for _ in 0..5 {
            assert_eq!(generator.generate("teh"), first);
        }
    }
}
