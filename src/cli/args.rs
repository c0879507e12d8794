//! Command line argument parsing for the noisy-speller CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// noisy-speller - context-sensitive spelling correction
#[derive(Parser, Debug, Clone)]
#[command(name = "noisy-speller")]
#[command(about = "Context-sensitive spelling correction with a noisy channel model")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SpellerArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Checker configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", env = "NOISY_SPELLER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SpellerArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Correct the given text, or each line of standard input
    Correct(CorrectArgs),

    /// Rank correction candidates for a single word
    Suggest(SuggestArgs),

    /// Score a sentence under the language model
    Evaluate(EvaluateArgs),

    /// Sample text from the trained language model
    Generate(GenerateArgs),

    /// Show corpus and model statistics
    Stats(StatsArgs),
}

/// Training data shared by every command
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Plain-text training corpus
    #[arg(long, value_name = "CORPUS_FILE")]
    pub corpus: PathBuf,
}

/// Arguments for correcting text
#[derive(Parser, Debug, Clone)]
pub struct CorrectArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Confusion tables (JSON tables, JSON records or "operation source target count" lines)
    #[arg(short, long, value_name = "TABLES_FILE")]
    pub error_tables: Option<PathBuf>,

    /// Text to correct (reads standard input when absent)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,
}

/// Arguments for suggesting corrections
#[derive(Parser, Debug, Clone)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Confusion tables file
    #[arg(short, long, value_name = "TABLES_FILE")]
    pub error_tables: Option<PathBuf>,

    /// The word to correct
    #[arg(value_name = "WORD")]
    pub word: String,

    /// Words preceding the word
    #[arg(long, value_name = "TEXT")]
    pub context: Option<String>,

    /// Words following the word
    #[arg(long, value_name = "TEXT")]
    pub after: Option<String>,

    /// Maximum number of suggestions
    #[arg(short, long, default_value = "5")]
    pub limit: usize,
}

/// Arguments for evaluating text
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Text to score
    #[arg(value_name = "TEXT")]
    pub text: String,
}

/// Arguments for sampling text
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Maximum tokens per sample
    #[arg(short, long, default_value = "20")]
    pub length: usize,

    /// Number of samples
    #[arg(short, long, default_value = "1")]
    pub count: usize,

    /// Sample characters instead of words
    #[arg(long)]
    pub chars: bool,

    /// Random seed for reproducible samples
    #[arg(long)]
    pub seed: Option<u64>,

    /// Text every sample starts with
    #[arg(long, value_name = "TEXT")]
    pub prefix: Option<String>,
}

/// Arguments for showing statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Number of most frequent words to list
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
