//! Noisy channel ranking of correction candidates.
//!
//! A candidate `c` for an observed token `o` scores
//!
//! ```text
//! log P(o | c) + log P(c | preceding words) + w * sum log P(next word | window containing c)
//! ```
//!
//! The channel term gives the observed token itself a fixed share α of the
//! probability mass; every edited candidate shares the remaining `1 - α`
//! in proportion to the error-model probability of its edit path.

use std::cmp::Ordering;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::spelling::candidates::Candidate;
use crate::spelling::language_model::WordModel;

/// Configuration for the ranking engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Channel probability that the observed token is what the writer meant.
    pub no_error_probability: f64,
    /// Weight of the terms for words following the candidate.
    pub following_context_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            no_error_probability: 0.95,
            following_context_weight: 1.0,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.no_error_probability > 0.0 && self.no_error_probability < 1.0) {
            return Err(SpellError::invalid_config(format!(
                "no-error probability must be in (0, 1), got {}",
                self.no_error_probability
            )));
        }
        if !(self.following_context_weight.is_finite() && self.following_context_weight >= 0.0) {
            return Err(SpellError::invalid_config(format!(
                "following context weight must be non-negative, got {}",
                self.following_context_weight
            )));
        }
        Ok(())
    }
}

/// A candidate with its score components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// P(observed | candidate) after the no-error split.
    pub channel_probability: f64,
    /// Language-model log-probability of the candidate in its sentence.
    pub context_log_probability: f64,
    /// Combined log score; higher is better.
    pub score: f64,
}

impl ScoredCandidate {
    pub fn word(&self) -> &str {
        &self.candidate.word
    }
}

/// Combines channel and language-model probabilities.
pub struct RankingEngine<'a> {
    language_model: &'a WordModel,
    config: RankingConfig,
}

impl<'a> RankingEngine<'a> {
    pub fn new(language_model: &'a WordModel, config: RankingConfig) -> Self {
        RankingEngine {
            language_model,
            config,
        }
    }

    /// Score every candidate and sort by descending score, ties by word.
    pub fn rank(
        &self,
        observed: &str,
        context_before: &[String],
        context_after: &[String],
        candidates: Vec<Candidate>,
    ) -> Vec<ScoredCandidate> {
        let channel = self.channel_probabilities(observed, &candidates);

        let mut sentence: Vec<String> =
            Vec::with_capacity(context_before.len() + 1 + context_after.len());
        sentence.extend_from_slice(context_before);
        sentence.push(observed.to_string());
        sentence.extend_from_slice(context_after);
        let index = context_before.len();

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .zip(channel)
            .map(|(candidate, channel_probability)| {
                sentence[index].clone_from(&candidate.word);
                let context_log_probability = self.context_log_probability(&sentence, index);
                // a two-edit path under a tiny floor can underflow to zero
                let score =
                    channel_probability.max(f64::MIN_POSITIVE).ln() + context_log_probability;
                trace!(
                    "Candidate '{}': channel {:.3e}, context {:.4}, score {:.4}",
                    candidate.word, channel_probability, context_log_probability, score
                );
                ScoredCandidate {
                    candidate,
                    channel_probability,
                    context_log_probability,
                    score,
                }
            })
            .collect();

        scored.sort_by(compare_scored);
        scored
    }

    /// Log-probability of the word at `index` plus the weighted terms of the
    /// following words whose n-gram window contains it.
    pub fn context_log_probability(&self, sentence: &[String], index: usize) -> f64 {
        let model = self.language_model;
        let own = model.log_probability(&sentence[index], &model.context_at(sentence, index));

        let window_end = (index + model.order()).min(sentence.len());
        let following: f64 = (index + 1..window_end)
            .map(|j| model.log_probability(&sentence[j], &model.context_at(sentence, j)))
            .sum();

        own + self.config.following_context_weight * following
    }

    /// P(observed | candidate) for each candidate, in input order.
    pub fn channel_probabilities(&self, observed: &str, candidates: &[Candidate]) -> Vec<f64> {
        debug_assert!(
            candidates
                .iter()
                .all(|c| !c.is_original() || c.word == observed)
        );
        let alpha = self.config.no_error_probability;
        let edited_mass: f64 = candidates
            .iter()
            .filter(|c| !c.is_original())
            .map(|c| c.edit_probability)
            .sum();
        let edited_count = candidates.iter().filter(|c| !c.is_original()).count();

        candidates
            .iter()
            .map(|c| {
                if c.is_original() {
                    alpha
                } else if edited_mass > 0.0 {
                    (1.0 - alpha) * c.edit_probability / edited_mass
                } else {
                    (1.0 - alpha) / edited_count as f64
                }
            })
            .collect()
    }
}

fn compare_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.candidate.word.cmp(&b.candidate.word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spelling::error_model::{EditOperation, EditStep};

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn model() -> WordModel {
        let mut model = WordModel::with_order(2).unwrap();
        model.train(vec![
            words("the cat sat on the mat"),
            words("the cat sat on the mat"),
            words("a hat"),
        ]);
        model
    }

    fn edited(word: &str, probability: f64) -> Candidate {
        Candidate {
            word: word.to_string(),
            edits: vec![EditStep::new(EditOperation::Substitution, "m", "h")],
            edit_probability: probability,
        }
    }

    #[test]
    fn test_channel_split() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        let candidates = vec![edited("cat", 3e-6), Candidate::original("hat"), edited("mat", 1e-6)];

        let channel = engine.channel_probabilities("hat", &candidates);
        assert_eq!(channel[1], 0.95);
        assert!((channel[0] - 0.05 * 0.75).abs() < 1e-12);
        assert!((channel[2] - 0.05 * 0.25).abs() < 1e-12);
        assert!((channel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_context_prefers_fitting_word() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        let candidates = vec![edited("mat", 1e-6), edited("hat", 1e-6)];

        let ranked = engine.rank("xat", &words("the cat sat on the"), &[], candidates);
        assert_eq!(ranked[0].word(), "mat");
        assert!(ranked[0].score > ranked[1].score);
        assert_eq!(ranked[0].channel_probability, ranked[1].channel_probability);
    }

    #[test]
    fn test_following_context_contributes() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        let sentence = words("the cat sat");
        let with_following = engine.context_log_probability(&sentence, 1);

        let unweighted = RankingEngine::new(
            &lm,
            RankingConfig {
                following_context_weight: 0.0,
                ..Default::default()
            },
        );
        let own_only = unweighted.context_log_probability(&sentence, 1);
        assert!(with_following < own_only);

        let expected = own_only + lm.log_probability(&"sat".to_string(), &words("cat"));
        assert!((with_following - expected).abs() < 1e-12);
    }

    #[test]
    fn test_ties_break_by_word() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        let candidates = vec![edited("zzb", 1e-6), edited("zza", 1e-6)];

        let ranked = engine.rank("zzc", &[], &[], candidates);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].word(), "zza");
    }

    #[test]
    fn test_underflowing_channel_keeps_finite_score() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        let candidates = vec![edited("mat", 1e-6), edited("hat", 0.0)];

        let ranked = engine.rank("xat", &words("the cat sat on the"), &[], candidates);
        assert_eq!(ranked[0].word(), "mat");
        assert_eq!(ranked[1].channel_probability, 0.0);
        assert!(ranked[1].score.is_finite());
    }

    #[test]
    fn test_empty_candidates() {
        let lm = model();
        let engine = RankingEngine::new(&lm, RankingConfig::default());
        assert!(engine.rank("zzz", &[], &[], Vec::new()).is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let config = RankingConfig {
            no_error_probability: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(RankingConfig::default().validate().is_ok());
    }
}
