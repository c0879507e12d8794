//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, SpellerArgs};
use crate::error::Result;
use crate::spelling::{
    CorrectionOutcome, LanguageModelStats, ScoredCandidate, Vocabulary, edit_distance,
};

/// Results that know how to print themselves for a person.
pub trait HumanOutput {
    fn print_human(&self);
}

/// One corrected sentence.
#[derive(Debug, Serialize)]
pub struct CorrectionReport {
    pub input: String,
    pub output: String,
    pub applied: bool,
    pub index: Option<usize>,
    pub outcome: CorrectionOutcome,
}

/// Result structure for the correct command.
#[derive(Debug, Serialize)]
pub struct CorrectionResults {
    pub sentences: Vec<CorrectionReport>,
    pub corrected: usize,
    pub duration_ms: u64,
}

/// One ranked suggestion.
///
/// `distance` is the string distance to the typed word, which can be lower
/// than `path_length` when a longer edit path was more probable.
#[derive(Debug, Serialize)]
pub struct SuggestionEntry {
    pub word: String,
    pub distance: usize,
    pub path_length: usize,
    pub frequency: u64,
    pub edits: Vec<String>,
    pub channel_probability: f64,
    pub context_log_probability: f64,
    pub score: f64,
}

impl SuggestionEntry {
    pub fn new(observed: &str, scored: &ScoredCandidate, vocabulary: &Vocabulary) -> Self {
        let word = &scored.candidate.word;
        SuggestionEntry {
            word: word.clone(),
            distance: edit_distance(observed, word),
            path_length: scored.candidate.distance(),
            frequency: vocabulary.frequency(word),
            edits: scored.candidate.edits.iter().map(ToString::to_string).collect(),
            channel_probability: scored.channel_probability,
            context_log_probability: scored.context_log_probability,
            score: scored.score,
        }
    }
}

/// Result structure for the suggest command.
#[derive(Debug, Serialize)]
pub struct SuggestionResults {
    pub word: String,
    pub known: bool,
    pub suggestions: Vec<SuggestionEntry>,
}

/// Result structure for the evaluate command.
#[derive(Debug, Serialize)]
pub struct EvaluationResult {
    pub tokens: Vec<String>,
    pub log_probability: f64,
    pub perplexity: Option<f64>,
    pub unknown_tokens: Vec<String>,
}

/// Result structure for the generate command.
#[derive(Debug, Serialize)]
pub struct GenerationResults {
    pub level: String,
    pub samples: Vec<String>,
}

/// Result structure for the stats command.
#[derive(Debug, Serialize)]
pub struct ModelStats {
    pub vocabulary_words: usize,
    pub vocabulary_tokens: u64,
    pub alphabet: String,
    pub word_model: LanguageModelStats,
    pub char_model: LanguageModelStats,
    pub top_words: Vec<(String, u64)>,
}

impl HumanOutput for CorrectionResults {
    fn print_human(&self) {
        for report in &self.sentences {
            println!("{}", report.output);
            match &report.outcome {
                CorrectionOutcome::Corrected {
                    original,
                    replacement,
                    index,
                    ..
                } => println!("  corrected '{original}' -> '{replacement}' at position {index}"),
                CorrectionOutcome::KeptOriginal { token, index, .. } => {
                    println!("  kept '{token}' at position {index}")
                }
                CorrectionOutcome::Unresolved { token, index } => {
                    println!("  no correction found for '{token}' at position {index}")
                }
                CorrectionOutcome::NoErrorDetected => {}
            }
        }
    }
}

impl HumanOutput for SuggestionResults {
    fn print_human(&self) {
        if self.suggestions.is_empty() {
            println!("No known word within two edits of '{}'", self.word);
            return;
        }

        println!("Suggestions for '{}':", self.word);
        println!("════════════════");
        for (i, entry) in self.suggestions.iter().enumerate() {
            println!(
                "{}. {} (score {:.3}, distance {}, frequency {})",
                i + 1,
                entry.word,
                entry.score,
                entry.distance,
                entry.frequency
            );
            for edit in &entry.edits {
                println!("     {edit}");
            }
        }
    }
}

impl HumanOutput for EvaluationResult {
    fn print_human(&self) {
        println!("Tokens: {}", self.tokens.join(" "));
        println!("Log probability: {:.4}", self.log_probability);
        if let Some(perplexity) = self.perplexity {
            println!("Perplexity: {perplexity:.2}");
        }
        if !self.unknown_tokens.is_empty() {
            println!("Unknown tokens: {}", self.unknown_tokens.join(", "));
        }
    }
}

impl HumanOutput for GenerationResults {
    fn print_human(&self) {
        for sample in &self.samples {
            println!("{sample}");
        }
    }
}

impl HumanOutput for ModelStats {
    fn print_human(&self) {
        println!("Corpus Statistics:");
        println!("════════════════");
        println!("Vocabulary: {} words", self.vocabulary_words);
        println!("Tokens: {}", self.vocabulary_tokens);
        println!("Alphabet: {}", self.alphabet);

        print_model_stats("Word model", &self.word_model);
        print_model_stats("Character model", &self.char_model);

        if !self.top_words.is_empty() {
            println!();
            println!("Most frequent words:");
            println!("──────────────────");
            for (word, count) in &self.top_words {
                println!("  {word} ({count})");
            }
        }
    }
}

fn print_model_stats(title: &str, stats: &LanguageModelStats) {
    println!();
    println!("{title}:");
    println!("  Order: {}", stats.order);
    println!("  Sequences: {}", stats.sentences);
    println!("  Types: {}", stats.types);
    let ngrams = stats
        .distinct_ngrams
        .iter()
        .enumerate()
        .map(|(i, count)| format!("{}-grams: {}", i + 1, count))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Distinct {ngrams}");
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &SpellerArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: HumanOutput>(message: &str, result: &T, args: &SpellerArgs) -> Result<()> {
    if args.verbosity() > 1 {
        println!("{message}");
        println!();
    }
    result.print_human();
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SpellerArgs) -> Result<()> {
    println!("{}", to_json(result, args.pretty)?);
    Ok(())
}

fn to_json<T: Serialize>(result: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}
