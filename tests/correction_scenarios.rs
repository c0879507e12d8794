use std::io::Write;

use noisy_speller::cli::load_corpus;
use noisy_speller::error::{Result, SpellError};
use noisy_speller::spelling::{
    CheckerConfig, CorrectionOutcome, EditOperation, ErrorRecord, SpellChecker, SuspectKind,
};
use noisy_speller::text::{split_sentences, tokenize};
use tempfile::NamedTempFile;

const CORPUS: &str = "This is an example sentence. Here is another example of text. \
                      This is a test of the checker.";

#[test]
fn missing_letter_is_restored() -> Result<()> {
    let checker = build_checker(CORPUS, &[])?;

    let correction = checker.correct_sentence(&tokenize("This is an exmple sentence"))?;
    assert_eq!(correction.text(), "this is an example sentence");
    assert!(correction.applied);
    assert_eq!(correction.index, Some(3));
    match correction.outcome {
        CorrectionOutcome::Corrected {
            original,
            replacement,
            kind,
            ..
        } => {
            assert_eq!(original, "exmple");
            assert_eq!(replacement, "example");
            assert_eq!(kind, SuspectKind::NonWord);
        }
        other => panic!("expected a correction, got {other:?}"),
    }
    Ok(())
}

#[test]
fn observed_deletion_drives_the_correction() -> Result<()> {
    let records = [ErrorRecord {
        operation: EditOperation::Deletion,
        source: "xa".to_string(),
        target: "x".to_string(),
        count: 4,
    }];
    let checker = build_checker(CORPUS, &records)?;

    let correction = checker.correct_sentence(&tokenize("this is an exmple"))?;
    assert_eq!(correction.tokens, tokenize("this is an example"));
    assert!(correction.applied);

    let suggestions = checker
        .context()?
        .suggest(&tokenize("this is an exmple"), 3, 1);
    assert_eq!(suggestions[0].word(), "example");
    assert_eq!(suggestions[0].candidate.edits.len(), 1);
    assert!(suggestions[0].candidate.edit_probability > 0.9);
    Ok(())
}

#[test]
fn swapped_letters_are_fixed_in_place() -> Result<()> {
    let checker = build_checker("the cat sat on the mat. the dog sat on the rug.", &[])?;

    let correction = checker.correct_sentence(&tokenize("the cat sat on teh mat"))?;
    assert_eq!(correction.tokens, tokenize("the cat sat on the mat"));
    assert_eq!(correction.index, Some(4));
    Ok(())
}

#[test]
fn token_without_candidates_is_left_alone() -> Result<()> {
    let checker = build_checker(CORPUS, &[])?;
    let tokens = tokenize("this is an xyzzyq");

    let correction = checker.correct_sentence(&tokens)?;
    assert_eq!(correction.tokens, tokens);
    assert!(!correction.applied);
    assert_eq!(correction.index, None);
    assert!(matches!(
        correction.outcome,
        CorrectionOutcome::Unresolved { index: 3, .. }
    ));
    Ok(())
}

#[test]
fn clean_sentence_passes_through() -> Result<()> {
    let checker = build_checker(CORPUS, &[])?;
    let tokens = tokenize("here is another example of text");

    let correction = checker.correct_sentence(&tokens)?;
    assert_eq!(correction.tokens, tokens);
    assert_eq!(correction.outcome, CorrectionOutcome::NoErrorDetected);
    Ok(())
}

#[test]
fn error_tables_decide_between_equally_likely_words() -> Result<()> {
    let corpus = "the cat ran. the cut ran.";
    let tokens = tokenize("the cst ran");

    // Without observed errors both candidates tie and the alphabetical one wins.
    let checker = build_checker(corpus, &[])?;
    assert_eq!(checker.correct_sentence(&tokens)?.text(), "the cat ran");

    let records = [ErrorRecord {
        operation: EditOperation::Substitution,
        source: "u".to_string(),
        target: "s".to_string(),
        count: 10,
    }];
    let checker = build_checker(corpus, &records)?;
    assert_eq!(checker.correct_sentence(&tokens)?.text(), "the cut ran");
    Ok(())
}

#[test]
fn corpus_and_tables_load_from_files() -> Result<()> {
    let mut corpus_file = NamedTempFile::new()?;
    writeln!(corpus_file, "The cat ran.")?;
    writeln!(corpus_file, "The cut ran!")?;
    corpus_file.flush()?;

    let mut line_tables = NamedTempFile::new()?;
    writeln!(line_tables, "substitution u s 10")?;
    writeln!(line_tables)?;
    writeln!(line_tables, "del ab a 3")?;
    line_tables.flush()?;

    let mut json_tables = NamedTempFile::new()?;
    write!(json_tables, r#"{{"substitution": {{"su": 10}}}}"#)?;
    json_tables.flush()?;

    let sentences = load_corpus(corpus_file.path())?;
    assert_eq!(sentences.len(), 2);

    for tables in [&line_tables, &json_tables] {
        let mut checker = SpellChecker::new(CheckerConfig::default())?;
        checker.train_language_model(&sentences)?;
        checker.load_error_tables_from_file(tables.path())?;

        let correction = checker.correct_sentence(&tokenize("the cst ran"))?;
        assert_eq!(correction.text(), "the cut ran");
    }
    Ok(())
}

#[test]
fn malformed_tables_are_reported() -> Result<()> {
    let mut tables = NamedTempFile::new()?;
    writeln!(tables, "substitution u s many")?;
    tables.flush()?;

    let mut checker = SpellChecker::default();
    assert!(matches!(
        checker.load_error_tables_from_file(tables.path()),
        Err(SpellError::InvalidErrorRecord(_))
    ));
    Ok(())
}

#[test]
fn correction_requires_training() {
    let checker = SpellChecker::default();
    assert!(matches!(
        checker.correct_sentence(&tokenize("teh cat")),
        Err(SpellError::UntrainedModel(_))
    ));
}

#[test]
fn batch_correction_matches_single_sentences() -> Result<()> {
    let checker = build_checker(CORPUS, &[])?;
    let context = checker.context()?;
    let sentences =
        split_sentences("This is an exmple sentence. Here is anotehr example. This is a tset");

    let batch = context.correct_sentences(&sentences);
    assert_eq!(batch.len(), sentences.len());
    for (sentence, correction) in sentences.iter().zip(&batch) {
        assert_eq!(correction, &context.correct_sentence(sentence));
    }
    assert!(batch.iter().all(|correction| correction.applied));
    Ok(())
}

fn build_checker(corpus: &str, records: &[ErrorRecord]) -> Result<SpellChecker> {
    let mut checker = SpellChecker::new(CheckerConfig::default())?;
    checker.train_language_model(&split_sentences(corpus))?;
    checker.load_error_tables(records)?;
    Ok(checker)
}
