//! Command implementations for the noisy-speller CLI.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{Result, SpellError};
use crate::spelling::{CheckerConfig, SpellChecker};
use crate::text::{split_sentences, tokenize};

/// Execute a CLI command.
pub fn execute_command(args: SpellerArgs) -> Result<()> {
    match &args.command {
        Command::Correct(correct_args) => correct_text(correct_args.clone(), &args),
        Command::Suggest(suggest_args) => suggest_word(suggest_args.clone(), &args),
        Command::Evaluate(evaluate_args) => evaluate_text(evaluate_args.clone(), &args),
        Command::Generate(generate_args) => generate_text(generate_args.clone(), &args),
        Command::Stats(stats_args) => show_stats(stats_args.clone(), &args),
    }
}

/// Read a plain-text corpus and split it into tokenized sentences.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let sentences = split_sentences(&content);

    if sentences.is_empty() {
        return Err(SpellError::parse(format!(
            "corpus '{}' contains no sentences",
            path.display()
        )));
    }

    info!(
        "Loaded {} sentences from '{}'",
        sentences.len(),
        path.display()
    );
    Ok(sentences)
}

/// Build a checker trained on the corpus, with error tables when given.
fn build_checker(
    corpus: &CorpusArgs,
    error_tables: Option<&Path>,
    cli_args: &SpellerArgs,
) -> Result<SpellChecker> {
    let config = match &cli_args.config {
        Some(path) => CheckerConfig::load_from_file(path)?,
        None => CheckerConfig::default(),
    };
    debug!("Using configuration {config:?}");

    let mut checker = SpellChecker::new(config)?;
    checker.train_language_model(&load_corpus(&corpus.corpus)?)?;

    match error_tables {
        Some(path) => checker.load_error_tables_from_file(path)?,
        None => {
            info!("No error tables given, using the bundled confusion tables");
            checker.load_bundled_error_tables()?;
        }
    }

    Ok(checker)
}

/// Correct the given text or each line of standard input.
fn correct_text(args: CorrectArgs, cli_args: &SpellerArgs) -> Result<()> {
    let checker = build_checker(&args.corpus, args.error_tables.as_deref(), cli_args)?;
    let context = checker.context()?;

    let texts: Vec<String> = match args.text {
        Some(text) => vec![text],
        None => io::stdin().lock().lines().collect::<io::Result<_>>()?,
    };

    let start_time = Instant::now();
    let sentences: Vec<Vec<String>> = texts.iter().flat_map(|text| split_sentences(text)).collect();
    let corrections = context.correct_sentences(&sentences);

    let reports: Vec<CorrectionReport> = sentences
        .iter()
        .zip(corrections)
        .map(|(input, correction)| CorrectionReport {
            input: input.join(" "),
            output: correction.text(),
            applied: correction.applied,
            index: correction.index,
            outcome: correction.outcome,
        })
        .collect();

    let corrected = reports.iter().filter(|report| report.applied).count();
    output_result(
        "Correction finished",
        &CorrectionResults {
            sentences: reports,
            corrected,
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Rank candidates for one word in its context.
fn suggest_word(args: SuggestArgs, cli_args: &SpellerArgs) -> Result<()> {
    let checker = build_checker(&args.corpus, args.error_tables.as_deref(), cli_args)?;
    let context = checker.context()?;

    let word = tokenize(&args.word)
        .into_iter()
        .next()
        .ok_or_else(|| SpellError::other(format!("'{}' contains no word", args.word)))?;

    let mut tokens = args.context.as_deref().map(tokenize).unwrap_or_default();
    let index = tokens.len();
    tokens.push(word.clone());
    tokens.extend(args.after.as_deref().map(tokenize).unwrap_or_default());

    let vocabulary = checker
        .vocabulary()
        .ok_or_else(|| SpellError::untrained("the language model has not been trained"))?;
    let suggestions = context
        .suggest(&tokens, index, args.limit)
        .iter()
        .map(|scored| SuggestionEntry::new(&word, scored, vocabulary))
        .collect();

    output_result(
        "Suggestions",
        &SuggestionResults {
            known: vocabulary.contains(&word),
            word,
            suggestions,
        },
        cli_args,
    )
}

/// Score text under the word model.
fn evaluate_text(args: EvaluateArgs, cli_args: &SpellerArgs) -> Result<()> {
    let config = match &cli_args.config {
        Some(path) => CheckerConfig::load_from_file(path)?,
        None => CheckerConfig::default(),
    };
    let mut checker = SpellChecker::new(config)?;
    checker.train_language_model(&load_corpus(&args.corpus.corpus)?)?;

    let tokens = tokenize(&args.text);
    let log_probability = checker.evaluate_text(&tokens)?;
    let perplexity = checker
        .language_model()
        .and_then(|model| model.perplexity(&tokens));
    let unknown_tokens = tokens
        .iter()
        .filter(|token| !checker.vocabulary().is_some_and(|v| v.contains(token)))
        .cloned()
        .collect();

    output_result(
        "Evaluation",
        &EvaluationResult {
            tokens,
            log_probability,
            perplexity,
            unknown_tokens,
        },
        cli_args,
    )
}

/// Sample words or characters from the trained models.
fn generate_text(args: GenerateArgs, cli_args: &SpellerArgs) -> Result<()> {
    let config = match &cli_args.config {
        Some(path) => CheckerConfig::load_from_file(path)?,
        None => CheckerConfig::default(),
    };
    let mut checker = SpellChecker::new(config)?;
    checker.train_language_model(&load_corpus(&args.corpus.corpus)?)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let prefix = args.prefix.as_deref().unwrap_or_default();

    let samples: Vec<String> = if args.chars {
        let model = checker
            .char_model()
            .ok_or_else(|| SpellError::untrained("the character model has not been trained"))?;
        let prefix: Vec<char> = prefix.chars().collect();
        (0..args.count)
            .map(|_| model.generate_from(&prefix, &mut rng, args.length).collect())
            .collect()
    } else {
        let model = checker
            .language_model()
            .filter(|model| model.is_trained())
            .ok_or_else(|| SpellError::untrained("the language model has not been trained"))?;
        let prefix = tokenize(prefix);
        (0..args.count)
            .map(|_| {
                model
                    .generate_from(&prefix, &mut rng, args.length)
                    .collect::<Vec<String>>()
                    .join(" ")
            })
            .collect()
    };

    output_result(
        "Generated samples",
        &GenerationResults {
            level: if args.chars { "char" } else { "word" }.to_string(),
            samples,
        },
        cli_args,
    )
}

/// Show corpus and model statistics.
fn show_stats(args: StatsArgs, cli_args: &SpellerArgs) -> Result<()> {
    let mut checker = SpellChecker::default();
    if let Some(path) = &cli_args.config {
        checker = SpellChecker::new(CheckerConfig::load_from_file(path)?)?;
    }
    checker.train_language_model(&load_corpus(&args.corpus.corpus)?)?;

    let missing = || SpellError::untrained("the corpus produced no model");
    let vocabulary = checker.vocabulary().ok_or_else(missing)?;
    let word_model = checker.language_model().ok_or_else(missing)?;
    let char_model = checker.char_model().ok_or_else(missing)?;

    output_result(
        "Statistics",
        &ModelStats {
            vocabulary_words: vocabulary.word_count(),
            vocabulary_tokens: vocabulary.total_frequency(),
            alphabet: vocabulary.alphabet().into_iter().collect(),
            word_model: word_model.stats(),
            char_model: char_model.stats(),
            top_words: vocabulary.most_frequent_words(args.top),
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_corpus() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "The cat sat on the mat. The dog sat on the rug!").unwrap();
        writeln!(file, "A well-known fact").unwrap();
        file.flush().unwrap();

        let sentences = load_corpus(file.path()).unwrap();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], vec!["the", "cat", "sat", "on", "the", "mat"]);
        assert_eq!(sentences[2], vec!["a", "well", "known", "fact"]);
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "...").unwrap();
        file.flush().unwrap();

        assert!(matches!(load_corpus(file.path()), Err(SpellError::Parse(_))));
    }

    #[test]
    fn test_build_checker_falls_back_to_bundled_tables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "the cat sat on the mat").unwrap();
        file.flush().unwrap();

        let args = SpellerArgs {
            verbose: 0,
            quiet: true,
            output_format: OutputFormat::Json,
            pretty: false,
            config: None,
            command: Command::Stats(StatsArgs {
                corpus: CorpusArgs {
                    corpus: file.path().to_path_buf(),
                },
                top: 3,
            }),
        };
        let corpus = CorpusArgs {
            corpus: file.path().to_path_buf(),
        };

        let checker = build_checker(&corpus, None, &args).unwrap();
        assert!(checker.is_ready());
        assert!(!checker.error_model().unwrap().matrix().is_empty());
    }
}
