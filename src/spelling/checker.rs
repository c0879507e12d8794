//! The spell checker: training, loading and sentence correction.
//!
//! [`SpellChecker`] owns the trained models. Training and table loading take
//! `&mut self`; correction goes through a [`CorrectionContext`], an immutable
//! view over the models that is cheap to create, `Copy`, and safe to share
//! across threads.
//!
//! ```
//! use noisy_speller::spelling::{EditOperation, ErrorRecord, SpellChecker};
//!
//! let corpus: Vec<Vec<String>> = ["this is an example", "an example sentence"]
//!     .iter()
//!     .map(|s| s.split_whitespace().map(String::from).collect())
//!     .collect();
//!
//! let mut checker = SpellChecker::default();
//! checker.train_language_model(&corpus).unwrap();
//! checker
//!     .load_error_tables(&[ErrorRecord {
//!         operation: EditOperation::Deletion,
//!         source: "xa".to_string(),
//!         target: "x".to_string(),
//!         count: 12,
//!     }])
//!     .unwrap();
//!
//! let tokens: Vec<String> = ["this", "is", "an", "exmple"].iter().map(|s| s.to_string()).collect();
//! let correction = checker.correct_sentence(&tokens).unwrap();
//! assert_eq!(correction.tokens, vec!["this", "is", "an", "example"]);
//! assert!(correction.applied);
//! assert_eq!(correction.index, Some(3));
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::spelling::candidates::{Candidate, CandidateGenerator, GeneratorConfig};
use crate::spelling::error_model::{
    ErrorModel, ErrorModelConfig, ErrorRecord, ErrorTables, Normalization,
};
use crate::spelling::language_model::{CharModel, LanguageModelConfig, WordModel};
use crate::spelling::ranking::{RankingConfig, RankingEngine, ScoredCandidate};
use crate::spelling::vocabulary::Vocabulary;

/// Configuration for the spell checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Order of the word-level n-gram model (1 to 3).
    pub order: usize,
    /// Additive smoothing constant for both language models.
    pub smoothing_k: f64,
    /// Order of the character-level model (1 to 3).
    pub char_order: usize,
    /// Channel probability reserved for "the observed word was intended".
    pub no_error_probability: f64,
    /// Error-model probability of an edit never observed.
    pub floor_probability: f64,
    /// How confusion counts are normalized.
    pub normalization: Normalization,
    /// Known words whose context margin is at or below this are suspects.
    pub anomaly_threshold: f64,
    /// Whether known words are checked against their context at all.
    pub detect_real_words: bool,
    /// Weight of the words after a candidate when ranking.
    pub following_context_weight: f64,
    /// Longest token expanded to two edits.
    pub max_expansion_chars: usize,
    /// Longest token searched for candidates at all.
    pub max_token_chars: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            order: 3,
            smoothing_k: 1.0,
            char_order: 2,
            no_error_probability: 0.95,
            floor_probability: 1e-6,
            normalization: Normalization::MatrixTotals,
            anomaly_threshold: 0.0,
            detect_real_words: true,
            following_context_weight: 1.0,
            max_expansion_chars: 24,
            max_token_chars: 64,
        }
    }
}

impl CheckerConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CheckerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.language_model_config().validate()?;
        self.char_model_config().validate()?;
        self.error_model_config().validate()?;
        self.ranking_config().validate()?;
        if !self.anomaly_threshold.is_finite() {
            return Err(SpellError::invalid_config(format!(
                "anomaly threshold must be finite, got {}",
                self.anomaly_threshold
            )));
        }
        Ok(())
    }

    pub fn language_model_config(&self) -> LanguageModelConfig {
        LanguageModelConfig {
            order: self.order,
            smoothing_k: self.smoothing_k,
        }
    }

    pub fn char_model_config(&self) -> LanguageModelConfig {
        LanguageModelConfig {
            order: self.char_order,
            smoothing_k: self.smoothing_k,
        }
    }

    pub fn error_model_config(&self) -> ErrorModelConfig {
        ErrorModelConfig {
            floor_probability: self.floor_probability,
            normalization: self.normalization,
        }
    }

    pub fn ranking_config(&self) -> RankingConfig {
        RankingConfig {
            no_error_probability: self.no_error_probability,
            following_context_weight: self.following_context_weight,
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            max_expansion_chars: self.max_expansion_chars,
            max_token_chars: self.max_token_chars,
        }
    }
}

/// Why a token was singled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspectKind {
    /// Not a known word.
    NonWord,
    /// A known word that does not fit its context.
    RealWord,
}

/// The token chosen for correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suspect {
    pub index: usize,
    pub kind: SuspectKind,
    /// Mean context evidence over the n-gram windows covering the token.
    pub margin: f64,
}

/// What happened to a sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrectionOutcome {
    /// Every token is known and fits its context.
    NoErrorDetected,
    /// The suspect was replaced by the top-ranked candidate.
    Corrected {
        index: usize,
        original: String,
        replacement: String,
        kind: SuspectKind,
        score: f64,
    },
    /// The suspect itself ranked first.
    KeptOriginal {
        index: usize,
        token: String,
        kind: SuspectKind,
    },
    /// No known word lies within two edits of the suspect.
    Unresolved { index: usize, token: String },
}

/// The result of correcting one sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    /// The output sentence.
    pub tokens: Vec<String>,
    /// Whether a token was replaced.
    pub applied: bool,
    /// Position of the replaced token.
    pub index: Option<usize>,
    pub outcome: CorrectionOutcome,
}

impl Correction {
    fn unchanged(tokens: &[String], outcome: CorrectionOutcome) -> Self {
        Correction {
            tokens: tokens.to_vec(),
            applied: false,
            index: None,
            outcome,
        }
    }

    /// The corrected sentence joined with spaces.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

enum Stage {
    Idle,
    Detecting,
    Generating(Suspect),
    Ranking(Suspect, Vec<Candidate>),
    Corrected(Correction),
}

/// Holds the trained language models, vocabulary and error model.
#[derive(Debug, Clone, Default)]
pub struct SpellChecker {
    config: CheckerConfig,
    word_model: Option<WordModel>,
    char_model: Option<Arc<CharModel>>,
    vocabulary: Option<Vocabulary>,
    alphabet: Vec<char>,
    error_model: Option<ErrorModel>,
}

impl SpellChecker {
    /// Create an untrained checker.
    pub fn new(config: CheckerConfig) -> Result<Self> {
        config.validate()?;
        Ok(SpellChecker {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Train the word and character models and the vocabulary on tokenized sentences.
    ///
    /// Replaces anything learned before.
    pub fn train_language_model<S: AsRef<[String]>>(&mut self, corpus: &[S]) -> Result<()> {
        let mut word_model = WordModel::new(self.config.language_model_config())?;
        word_model.train(corpus.iter().map(|sentence| sentence.as_ref()));
        if !word_model.is_trained() {
            warn!("Training corpus contains no tokens");
        }

        let mut char_model = CharModel::new(self.config.char_model_config())?;
        char_model.train(
            corpus
                .iter()
                .flat_map(|sentence| sentence.as_ref().iter())
                .map(|word| word.chars().collect::<Vec<char>>()),
        );
        let char_model = Arc::new(char_model);

        let vocabulary = Vocabulary::from_sentences(corpus);
        self.alphabet = vocabulary.alphabet();
        info!(
            "Vocabulary has {} words over {} characters",
            vocabulary.word_count(),
            self.alphabet.len()
        );

        if let Some(error_model) = self.error_model.as_mut() {
            error_model.attach_char_model(Arc::clone(&char_model));
        }
        self.word_model = Some(word_model);
        self.char_model = Some(char_model);
        self.vocabulary = Some(vocabulary);
        Ok(())
    }

    /// Build the error model from confusion records, replacing any previous one.
    ///
    /// An empty slice gives a model where every edit has the floor probability.
    pub fn load_error_tables(&mut self, records: &[ErrorRecord]) -> Result<()> {
        let mut error_model = ErrorModel::from_records(records, self.config.error_model_config())?;
        if let Some(char_model) = &self.char_model {
            error_model.attach_char_model(Arc::clone(char_model));
        }
        self.error_model = Some(error_model);
        Ok(())
    }

    /// Use the confusion tables shipped with the crate.
    pub fn load_bundled_error_tables(&mut self) -> Result<()> {
        let records = ErrorTables::bundled()?.to_records()?;
        self.load_error_tables(&records)
    }

    /// Load error tables from a file in any supported format.
    pub fn load_error_tables_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let records = ErrorModel::load_records(path)?;
        self.load_error_tables(&records)
    }

    pub fn language_model(&self) -> Option<&WordModel> {
        self.word_model.as_ref()
    }

    pub fn char_model(&self) -> Option<&CharModel> {
        self.char_model.as_deref()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn error_model(&self) -> Option<&ErrorModel> {
        self.error_model.as_ref()
    }

    /// Whether both the language model and the error tables are in place.
    pub fn is_ready(&self) -> bool {
        self.context().is_ok()
    }

    fn trained_model(&self) -> Result<&WordModel> {
        self.word_model
            .as_ref()
            .filter(|model| model.is_trained())
            .ok_or_else(|| SpellError::untrained("the language model has not been trained"))
    }

    /// An immutable view for correction calls.
    ///
    /// Fails with [`SpellError::UntrainedModel`] until the language model has
    /// been trained and the error tables loaded.
    pub fn context(&self) -> Result<CorrectionContext<'_>> {
        let language_model = self.trained_model()?;
        let vocabulary = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| SpellError::untrained("the vocabulary has not been built"))?;
        let error_model = self
            .error_model
            .as_ref()
            .ok_or_else(|| SpellError::untrained("the error tables have not been loaded"))?;

        Ok(CorrectionContext {
            config: &self.config,
            language_model,
            vocabulary,
            error_model,
            alphabet: &self.alphabet,
        })
    }

    /// Correct at most one token of a sentence.
    pub fn correct_sentence(&self, tokens: &[String]) -> Result<Correction> {
        Ok(self.context()?.correct_sentence(tokens))
    }

    /// Log-probability of a sentence under the word model.
    ///
    /// Only needs a trained language model.
    pub fn evaluate_text(&self, tokens: &[String]) -> Result<f64> {
        Ok(self.trained_model()?.sequence_log_probability(tokens))
    }
}

/// Read-only access to trained models for correction.
#[derive(Clone, Copy)]
pub struct CorrectionContext<'a> {
    config: &'a CheckerConfig,
    language_model: &'a WordModel,
    vocabulary: &'a Vocabulary,
    error_model: &'a ErrorModel,
    alphabet: &'a [char],
}

impl<'a> CorrectionContext<'a> {
    pub fn generator(&self) -> CandidateGenerator<'a> {
        CandidateGenerator::new(
            self.vocabulary,
            self.error_model,
            self.alphabet,
            self.config.generator_config(),
        )
    }

    pub fn ranker(&self) -> RankingEngine<'a> {
        RankingEngine::new(self.language_model, self.config.ranking_config())
    }

    /// Find and fix at most one erroneous token.
    pub fn correct_sentence(&self, tokens: &[String]) -> Correction {
        let mut stage = Stage::Idle;
        loop {
            stage = match stage {
                Stage::Idle => Stage::Detecting,
                Stage::Detecting => match self.detect(tokens) {
                    Some(suspect) => {
                        debug!(
                            "Suspect '{}' at {} ({:?}, margin {:.4})",
                            tokens[suspect.index], suspect.index, suspect.kind, suspect.margin
                        );
                        Stage::Generating(suspect)
                    }
                    None => Stage::Corrected(Correction::unchanged(
                        tokens,
                        CorrectionOutcome::NoErrorDetected,
                    )),
                },
                Stage::Generating(suspect) => {
                    let token = &tokens[suspect.index];
                    let candidates = self.generator().generate(token);
                    if candidates.is_empty() {
                        debug!("No known word within two edits of '{token}'");
                        Stage::Corrected(Correction::unchanged(
                            tokens,
                            CorrectionOutcome::Unresolved {
                                index: suspect.index,
                                token: token.clone(),
                            },
                        ))
                    } else {
                        Stage::Ranking(suspect, candidates)
                    }
                }
                Stage::Ranking(suspect, candidates) => {
                    Stage::Corrected(self.select(tokens, &suspect, candidates))
                }
                Stage::Corrected(correction) => return correction,
            };
        }
    }

    /// Correct independent sentences in parallel, keeping input order.
    pub fn correct_sentences(&self, sentences: &[Vec<String>]) -> Vec<Correction> {
        sentences
            .par_iter()
            .map(|tokens| self.correct_sentence(tokens))
            .collect()
    }

    /// Ranked candidates for the token at `index`, best first.
    pub fn suggest(&self, tokens: &[String], index: usize, limit: usize) -> Vec<ScoredCandidate> {
        let Some(token) = tokens.get(index) else {
            return Vec::new();
        };
        let candidates = self.generator().generate(token);
        let mut ranked =
            self.ranker()
                .rank(token, &tokens[..index], &tokens[index + 1..], candidates);
        ranked.truncate(limit);
        ranked
    }

    /// Log-probability of a sentence under the word model.
    pub fn evaluate_text(&self, tokens: &[String]) -> f64 {
        self.language_model.sequence_log_probability(tokens)
    }

    /// Mean context evidence over the n-gram windows that contain position `index`.
    ///
    /// Zero means the token never followed its context in any of those
    /// windows, after backoff. A window whose backed-off context no longer
    /// reaches back to `index` says nothing about the token and counts as zero.
    pub fn context_margin(&self, tokens: &[String], index: usize) -> f64 {
        let model = self.language_model;
        let end = (index + model.order()).min(tokens.len());
        if end <= index {
            return 0.0;
        }
        let total: f64 = (index..end)
            .map(|j| {
                let context = model.context_at(tokens, j);
                if model.effective_context(&context).len() < j - index {
                    trace!("Window ending at {j} backed off past {index}");
                    return 0.0;
                }
                model.evidence(&tokens[j], &context)
            })
            .sum();
        total / (end - index) as f64
    }

    /// Pick the token to correct, if any.
    ///
    /// Unknown words come first; among several the one with the weakest
    /// context wins, then the earliest.
    pub fn detect(&self, tokens: &[String]) -> Option<Suspect> {
        let mut non_word: Option<Suspect> = None;
        let mut real_word: Option<Suspect> = None;

        for (index, token) in tokens.iter().enumerate() {
            let known = self.vocabulary.contains(token);
            if known && !self.config.detect_real_words {
                continue;
            }

            let margin = self.context_margin(tokens, index);
            let (slot, kind) = if known {
                if margin > self.config.anomaly_threshold {
                    continue;
                }
                (&mut real_word, SuspectKind::RealWord)
            } else {
                (&mut non_word, SuspectKind::NonWord)
            };

            if slot.as_ref().is_none_or(|current| margin < current.margin) {
                *slot = Some(Suspect {
                    index,
                    kind,
                    margin,
                });
            }
        }

        non_word.or(real_word)
    }

    fn select(&self, tokens: &[String], suspect: &Suspect, candidates: Vec<Candidate>) -> Correction {
        let index = suspect.index;
        let observed = &tokens[index];
        let ranked = self
            .ranker()
            .rank(observed, &tokens[..index], &tokens[index + 1..], candidates);

        let Some(best) = ranked.into_iter().next() else {
            return Correction::unchanged(
                tokens,
                CorrectionOutcome::Unresolved {
                    index,
                    token: observed.clone(),
                },
            );
        };

        if best.word() == observed {
            debug!("Keeping '{observed}' at {index}");
            return Correction::unchanged(
                tokens,
                CorrectionOutcome::KeptOriginal {
                    index,
                    token: observed.clone(),
                    kind: suspect.kind,
                },
            );
        }

        debug!("Replacing '{}' with '{}' at {}", observed, best.word(), index);
        let mut corrected = tokens.to_vec();
        corrected[index] = best.candidate.word.clone();

        Correction {
            tokens: corrected,
            applied: true,
            index: Some(index),
            outcome: CorrectionOutcome::Corrected {
                index,
                original: observed.clone(),
                replacement: best.candidate.word,
                kind: suspect.kind,
                score: best.score,
            },
        }
    }
}
