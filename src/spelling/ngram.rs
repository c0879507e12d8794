//! N-gram frequency tables shared by the word-level and character-level models.

use std::fmt::Debug;
use std::hash::Hash;

use ahash::AHashMap;

/// A unit an n-gram model counts: a word or a character.
///
/// Each token type reserves two sentinel values that mark where a sentence
/// starts and ends. They never appear inside normalized text.
pub trait Token: Clone + Eq + Hash + Ord + Debug + Send + Sync {
    /// Marker padding the context before the first real token.
    fn start() -> Self;

    /// Marker predicted after the last real token.
    fn end() -> Self;

    /// Whether this token is one of the two sentinels.
    fn is_sentinel(&self) -> bool {
        *self == Self::start() || *self == Self::end()
    }
}

impl Token for String {
    fn start() -> Self {
        "<s>".to_string()
    }

    fn end() -> Self {
        "</s>".to_string()
    }
}

impl Token for char {
    fn start() -> Self {
        '\u{2}'
    }

    fn end() -> Self {
        '\u{3}'
    }
}

/// Counts of (context, next token) events for a single order n.
///
/// The context is the tuple of n−1 preceding tokens; order 1 uses the empty
/// context. The table only grows during training and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct NGramTable<T: Token> {
    order: usize,
    continuations: AHashMap<Vec<T>, AHashMap<T, u64>>,
    context_totals: AHashMap<Vec<T>, u64>,
    distinct_ngrams: usize,
}

impl<T: Token> NGramTable<T> {
    /// Create an empty table for n-grams of the given order (n ≥ 1).
    pub fn new(order: usize) -> Self {
        NGramTable {
            order: order.max(1),
            continuations: AHashMap::new(),
            context_totals: AHashMap::new(),
            distinct_ngrams: 0,
        }
    }

    /// Record one occurrence of `token` following `context`.
    pub fn add(&mut self, context: &[T], token: T) {
        debug_assert_eq!(context.len(), self.order - 1);

        let successors = self.continuations.entry(context.to_vec()).or_default();
        let count = successors.entry(token).or_insert(0);
        if *count == 0 {
            self.distinct_ngrams += 1;
        }
        *count += 1;

        *self.context_totals.entry(context.to_vec()).or_insert(0) += 1;
    }

    /// Count every n-gram of one sentence, padded with start and end sentinels.
    pub fn count_sentence(&mut self, tokens: &[T]) {
        let padding = self.order - 1;
        let mut padded = Vec::with_capacity(tokens.len() + padding + 1);
        padded.extend(std::iter::repeat_n(T::start(), padding));
        padded.extend(tokens.iter().cloned());
        padded.push(T::end());

        for window in padded.windows(self.order) {
            let (context, next) = window.split_at(padding);
            self.add(context, next[0].clone());
        }
    }

    /// Number of times `token` followed `context`.
    pub fn count(&self, context: &[T], token: &T) -> u64 {
        self.continuations
            .get(context)
            .and_then(|successors| successors.get(token))
            .copied()
            .unwrap_or(0)
    }

    /// Number of events recorded with this context.
    pub fn context_count(&self, context: &[T]) -> u64 {
        self.context_totals.get(context).copied().unwrap_or(0)
    }

    /// All tokens observed after `context` with their counts.
    pub fn successors(&self, context: &[T]) -> Option<&AHashMap<T, u64>> {
        self.continuations.get(context)
    }

    /// Number of distinct n-grams observed.
    pub fn distinct_ngrams(&self) -> usize {
        self.distinct_ngrams
    }
}
