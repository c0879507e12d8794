//! Markov n-gram language model with add-k smoothing.
//!
//! The same machinery serves two purposes: a word-level model scores candidate
//! sentences, and a character-level model supplies fragment frequencies to the
//! error model. Both are built once by [`LanguageModel::train`] and are
//! read-only afterwards.
//!
//! # Smoothing and backoff
//!
//! For a context `h` and token `w` the model returns
//!
//! ```text
//! P(w | h) = (count(h, w) + k) / (count(h) + k * |V|)
//! ```
//!
//! where `|V|` counts every known token, the end sentinel and one slot shared
//! by all unknown tokens. When fewer than n−1 context tokens are supplied, or
//! the context never occurred in training, the oldest context token is dropped
//! and the next lower order is used. Every distribution the model can pick is
//! a complete add-k distribution, so probabilities for a fixed context always
//! sum to one.

use std::collections::VecDeque;

use ahash::AHashMap;
use log::{info, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::spelling::ngram::{NGramTable, Token};

/// Highest supported n-gram order.
pub const MAX_ORDER: usize = 3;

/// Configuration for a language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelConfig {
    /// The n of the model (1 = unigram, 2 = bigram, 3 = trigram).
    pub order: usize,
    /// The additive smoothing constant k.
    pub smoothing_k: f64,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        LanguageModelConfig {
            order: 3,
            smoothing_k: 1.0,
        }
    }
}

impl LanguageModelConfig {
    /// Check that the order and smoothing constant are usable.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ORDER).contains(&self.order) {
            return Err(SpellError::invalid_config(format!(
                "n-gram order must be between 1 and {}, got {}",
                MAX_ORDER, self.order
            )));
        }
        if !(self.smoothing_k.is_finite() && self.smoothing_k > 0.0) {
            return Err(SpellError::invalid_config(format!(
                "smoothing constant must be positive, got {}",
                self.smoothing_k
            )));
        }
        Ok(())
    }
}

/// Summary of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageModelStats {
    /// The n of the model.
    pub order: usize,
    /// Number of training sentences.
    pub sentences: usize,
    /// Number of training tokens, sentinels excluded.
    pub tokens: u64,
    /// Number of distinct known tokens.
    pub types: usize,
    /// Distinct n-grams per order, starting with unigrams.
    pub distinct_ngrams: Vec<usize>,
}

/// An n-gram language model over tokens of type `T`.
#[derive(Debug, Clone)]
pub struct LanguageModel<T: Token> {
    config: LanguageModelConfig,
    /// `tables[m - 1]` holds the order-m counts.
    tables: Vec<NGramTable<T>>,
    /// Unigram counts of real tokens.
    types: AHashMap<T, u64>,
    sentences: usize,
}

/// Word-level model.
pub type WordModel = LanguageModel<String>;

/// Character-level model.
pub type CharModel = LanguageModel<char>;

impl<T: Token> LanguageModel<T> {
    /// Create an untrained model.
    pub fn new(config: LanguageModelConfig) -> Result<Self> {
        config.validate()?;
        let tables = (1..=config.order).map(NGramTable::new).collect();

        Ok(LanguageModel {
            config,
            tables,
            types: AHashMap::new(),
            sentences: 0,
        })
    }

    /// Create an untrained model of the given order with k = 1.
    pub fn with_order(order: usize) -> Result<Self> {
        Self::new(LanguageModelConfig {
            order,
            ..Default::default()
        })
    }

    /// Count all n-grams (every order up to n) of the corpus.
    ///
    /// Any previous training data is discarded. Sentinel values inside the
    /// corpus are dropped, and empty sentences are ignored.
    pub fn train<I, S>(&mut self, corpus: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[T]>,
    {
        self.tables = (1..=self.config.order).map(NGramTable::new).collect();
        self.types.clear();
        self.sentences = 0;

        for sentence in corpus {
            let sentence = sentence.as_ref();
            let tokens: Vec<T> = if sentence.iter().any(Token::is_sentinel) {
                warn!("Dropping sentinel tokens from a training sentence");
                sentence
                    .iter()
                    .filter(|token| !token.is_sentinel())
                    .cloned()
                    .collect()
            } else {
                sentence.to_vec()
            };

            if tokens.is_empty() {
                continue;
            }

            for table in &mut self.tables {
                table.count_sentence(&tokens);
            }
            for token in &tokens {
                *self.types.entry(token.clone()).or_insert(0) += 1;
            }
            self.sentences += 1;
        }

        info!(
            "Trained order-{} model on {} sentences ({} types)",
            self.config.order,
            self.sentences,
            self.types.len()
        );
    }

    /// Whether the model has seen any training data.
    pub fn is_trained(&self) -> bool {
        self.sentences > 0
    }

    /// The n of the model.
    pub fn order(&self) -> usize {
        self.config.order
    }

    /// The model configuration.
    pub fn config(&self) -> &LanguageModelConfig {
        &self.config
    }

    /// Size of the smoothing support: known tokens, the end sentinel and the unknown slot.
    pub fn vocabulary_size(&self) -> usize {
        self.types.len() + 2
    }

    /// Whether the token was seen in training.
    pub fn contains(&self, token: &T) -> bool {
        self.types.contains_key(token)
    }

    /// Training frequency of a token.
    pub fn token_count(&self, token: &T) -> u64 {
        self.types.get(token).copied().unwrap_or(0)
    }

    /// Iterate over all known tokens.
    pub fn types(&self) -> impl Iterator<Item = &T> {
        self.types.keys()
    }

    /// Raw count of an m-gram (1 ≤ m ≤ n), start sentinels allowed in front.
    pub fn ngram_count(&self, ngram: &[T]) -> u64 {
        match ngram.split_last() {
            Some((last, context)) if ngram.len() <= self.config.order => {
                self.tables[context.len()].count(context, last)
            }
            _ => 0,
        }
    }

    /// Number of events observed after a context of length < n.
    pub fn context_count(&self, context: &[T]) -> u64 {
        self.tables
            .get(context.len())
            .map(|table| table.context_count(context))
            .unwrap_or(0)
    }

    /// The context the model actually conditions on, after backoff.
    ///
    /// Keeps at most the last n−1 tokens, then drops the oldest token while the
    /// remaining context was never observed.
    pub fn effective_context<'c>(&self, context: &'c [T]) -> &'c [T] {
        let max_context = self.config.order - 1;
        if context.len() < max_context {
            trace!(
                "Context of {} tokens is shorter than {}, backing off",
                context.len(),
                max_context
            );
        }

        let mut effective = &context[context.len().saturating_sub(max_context)..];
        while !effective.is_empty() && self.context_count(effective) == 0 {
            effective = &effective[1..];
        }
        effective
    }

    /// Smoothed conditional probability P(token | context).
    pub fn probability(&self, token: &T, context: &[T]) -> f64 {
        let context = self.effective_context(context);
        let table = &self.tables[context.len()];
        let k = self.config.smoothing_k;

        (table.count(context, token) as f64 + k)
            / (table.context_count(context) as f64 + k * self.vocabulary_size() as f64)
    }

    /// Natural log of [`probability`](Self::probability).
    pub fn log_probability(&self, token: &T, context: &[T]) -> f64 {
        self.probability(token, context).ln()
    }

    /// How much more likely the token is than an event never seen in this context.
    ///
    /// Returns `ln((count + k) / k)` at the backed-off context: 0 when the
    /// token never followed the context, positive otherwise.
    pub fn evidence(&self, token: &T, context: &[T]) -> f64 {
        let context = self.effective_context(context);
        let count = self.tables[context.len()].count(context, token) as f64;
        let k = self.config.smoothing_k;
        ((count + k) / k).ln()
    }

    /// The n−1 tokens preceding position `index`, padded with start sentinels.
    pub fn context_at(&self, tokens: &[T], index: usize) -> Vec<T> {
        let max_context = self.config.order - 1;
        let available = index.min(tokens.len());
        let padding = max_context.saturating_sub(available);

        let mut context = Vec::with_capacity(max_context);
        context.extend(std::iter::repeat_n(T::start(), padding));
        context.extend_from_slice(&tokens[available - (max_context - padding)..available]);
        context
    }

    /// Sum of log P(token_i | preceding n−1 tokens) over the sequence.
    ///
    /// The end sentinel is not scored, so extending a sequence never raises
    /// its log-probability. An empty sequence scores 0.
    pub fn sequence_log_probability(&self, tokens: &[T]) -> f64 {
        (0..tokens.len())
            .map(|i| self.log_probability(&tokens[i], &self.context_at(tokens, i)))
            .sum()
    }

    /// Per-token perplexity of the sequence, `None` for an empty sequence.
    pub fn perplexity(&self, tokens: &[T]) -> Option<f64> {
        if tokens.is_empty() {
            return None;
        }
        Some((-self.sequence_log_probability(tokens) / tokens.len() as f64).exp())
    }

    /// Lazily sample a sequence of at most `max_length` tokens.
    pub fn generate<'a, R: Rng>(&'a self, rng: &'a mut R, max_length: usize) -> Sampler<'a, T, R> {
        self.generate_from(&[], rng, max_length)
    }

    /// Lazily sample a continuation of `prefix`.
    ///
    /// The prefix tokens are yielded first; a prefix at least `max_length`
    /// long is simply truncated.
    pub fn generate_from<'a, R: Rng>(
        &'a self,
        prefix: &[T],
        rng: &'a mut R,
        max_length: usize,
    ) -> Sampler<'a, T, R> {
        Sampler {
            model: self,
            rng,
            history: Vec::new(),
            pending: prefix.iter().cloned().collect(),
            emitted: 0,
            max_length,
            finished: false,
        }
    }

    /// Summary of the training data.
    pub fn stats(&self) -> LanguageModelStats {
        LanguageModelStats {
            order: self.config.order,
            sentences: self.sentences,
            tokens: self.types.values().sum(),
            types: self.types.len(),
            distinct_ngrams: self.tables.iter().map(NGramTable::distinct_ngrams).collect(),
        }
    }

    fn sample_next<R: Rng>(&self, history: &[T], rng: &mut R) -> Option<T> {
        let context = self.context_at(history, history.len());
        let context = self.effective_context(&context);
        let successors = self.tables[context.len()].successors(context)?;

        let mut weighted: Vec<(&T, u64)> = successors.iter().map(|(t, &c)| (t, c)).collect();
        weighted.sort();
        let total: u64 = weighted.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return None;
        }

        let mut target = rng.random_range(0..total);
        for (token, count) in weighted {
            if target < count {
                return Some(token.clone());
            }
            target -= count;
        }
        None
    }
}

/// A finite, non-restartable stream of sampled tokens.
///
/// Stops when the end sentinel is drawn, when `max_length` tokens have been
/// produced, or when the model has nothing to continue with.
pub struct Sampler<'a, T: Token, R: Rng> {
    model: &'a LanguageModel<T>,
    rng: &'a mut R,
    history: Vec<T>,
    pending: VecDeque<T>,
    emitted: usize,
    max_length: usize,
    finished: bool,
}

impl<T: Token, R: Rng> Iterator for Sampler<'_, T, R> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.finished || self.emitted >= self.max_length {
            return None;
        }

        let next = match self.pending.pop_front() {
            Some(token) => Some(token),
            None => self.model.sample_next(&self.history, &mut *self.rng),
        };

        match next {
            Some(token) if token != T::end() => {
                self.history.push(token.clone());
                self.emitted += 1;
                Some(token)
            }
            _ => {
                self.finished = true;
                None
            }
        }
    }
}
