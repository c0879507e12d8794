//! Character-level error model built from confusion matrices.
//!
//! Every edit is described from the writer's point of view: the `source`
//! fragment is what the writer intended, the `target` fragment is what was
//! actually typed. Insertions and deletions carry one character of left
//! context (`#` at the start of a word), following the classic two-letter
//! confusion tables:
//!
//! | operation | source | target | meaning |
//! |---|---|---|---|
//! | deletion | `xy` | `x` | `y` was dropped after `x` |
//! | insertion | `x` | `xy` | `y` was added after `x` |
//! | substitution | `x` | `y` | `y` was typed for `x` |
//! | transposition | `xy` | `yx` | two adjacent letters swapped |

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ahash::AHashMap;
use log::{info, trace};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::spelling::language_model::CharModel;
use crate::spelling::ngram::Token;

/// Marks the word boundary in insertion and deletion fragments.
pub const WORD_BOUNDARY: char = '#';

/// Confusion counts for common English typing errors, in table layout.
static BUNDLED_TABLES: &str = include_str!("confusion_tables.json");

/// The four single-character edit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    Insertion,
    Deletion,
    Substitution,
    Transposition,
}

impl EditOperation {
    pub const ALL: [EditOperation; 4] = [
        EditOperation::Insertion,
        EditOperation::Deletion,
        EditOperation::Substitution,
        EditOperation::Transposition,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::Insertion => "insertion",
            EditOperation::Deletion => "deletion",
            EditOperation::Substitution => "substitution",
            EditOperation::Transposition => "transposition",
        }
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EditOperation {
    type Err = SpellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "insertion" | "insert" | "ins" => Ok(EditOperation::Insertion),
            "deletion" | "delete" | "del" => Ok(EditOperation::Deletion),
            "substitution" | "substitute" | "sub" => Ok(EditOperation::Substitution),
            "transposition" | "transpose" | "trans" => Ok(EditOperation::Transposition),
            other => Err(SpellError::invalid_record(format!(
                "unknown edit operation '{other}'"
            ))),
        }
    }
}

/// One edit: the intended `source` fragment was typed as `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditStep {
    pub operation: EditOperation,
    pub source: String,
    pub target: String,
}

impl EditStep {
    pub fn new(operation: EditOperation, source: impl Into<String>, target: impl Into<String>) -> Self {
        EditStep {
            operation,
            source: source.into(),
            target: target.into(),
        }
    }

    /// Convert a two-letter confusion-table key into an edit step.
    pub fn from_table_key(operation: EditOperation, key: &str) -> Result<Self> {
        let chars: Vec<char> = key.chars().collect();
        let [x, y] = chars[..] else {
            return Err(SpellError::invalid_record(format!(
                "{operation} key '{key}' must have exactly two characters"
            )));
        };

        let step = match operation {
            EditOperation::Deletion => EditStep::new(operation, key, x.to_string()),
            EditOperation::Insertion => EditStep::new(operation, x.to_string(), key),
            EditOperation::Substitution => EditStep::new(operation, y.to_string(), x.to_string()),
            EditOperation::Transposition => EditStep::new(operation, format!("{y}{x}"), key),
        };
        step.validate()?;
        Ok(step)
    }

    /// Check that the fragments have the shape the operation requires.
    pub fn validate(&self) -> Result<()> {
        let source: Vec<char> = self.source.chars().collect();
        let target: Vec<char> = self.target.chars().collect();
        let boundary_ok = |fragment: &[char]| {
            fragment.iter().skip(1).all(|&c| c != WORD_BOUNDARY)
        };

        let valid = boundary_ok(&source)
            && boundary_ok(&target)
            && match self.operation {
                EditOperation::Deletion => {
                    source.len() == 2 && target.len() == 1 && source[0] == target[0]
                }
                EditOperation::Insertion => {
                    source.len() == 1 && target.len() == 2 && source[0] == target[0]
                }
                EditOperation::Substitution => {
                    source.len() == 1
                        && target.len() == 1
                        && source[0] != target[0]
                        && source[0] != WORD_BOUNDARY
                        && target[0] != WORD_BOUNDARY
                }
                EditOperation::Transposition => {
                    source.len() == 2
                        && target.len() == 2
                        && source[0] != source[1]
                        && source[0] == target[1]
                        && source[1] == target[0]
                        && !source.contains(&WORD_BOUNDARY)
                }
            };

        if valid {
            Ok(())
        } else {
            Err(SpellError::invalid_record(format!(
                "fragments do not describe a {}: '{}' -> '{}'",
                self.operation, self.source, self.target
            )))
        }
    }
}

impl fmt::Display for EditStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' -> '{}'", self.operation, self.source, self.target)
    }
}

/// One row of an error table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub operation: EditOperation,
    pub source: String,
    pub target: String,
    pub count: u64,
}

impl ErrorRecord {
    pub fn step(&self) -> EditStep {
        EditStep::new(self.operation, self.source.clone(), self.target.clone())
    }
}

/// The classic table layout: one map of two-letter keys per operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorTables {
    pub insertion: BTreeMap<String, u64>,
    pub deletion: BTreeMap<String, u64>,
    pub substitution: BTreeMap<String, u64>,
    pub transposition: BTreeMap<String, u64>,
}

impl ErrorTables {
    /// The confusion tables shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Ok(serde_json::from_str(BUNDLED_TABLES)?)
    }

    fn table(&self, operation: EditOperation) -> &BTreeMap<String, u64> {
        match operation {
            EditOperation::Insertion => &self.insertion,
            EditOperation::Deletion => &self.deletion,
            EditOperation::Substitution => &self.substitution,
            EditOperation::Transposition => &self.transposition,
        }
    }

    /// Flatten the tables into records.
    pub fn to_records(&self) -> Result<Vec<ErrorRecord>> {
        let mut records = Vec::new();
        for operation in EditOperation::ALL {
            for (key, &count) in self.table(operation) {
                if count == 0 {
                    continue;
                }
                let step = EditStep::from_table_key(operation, key)?;
                records.push(ErrorRecord {
                    operation,
                    source: step.source,
                    target: step.target,
                    count,
                });
            }
        }
        Ok(records)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorTableFile {
    Records(Vec<ErrorRecord>),
    Tables(ErrorTables),
}

/// Observed edit counts with per-source totals.
#[derive(Debug, Clone, Default)]
pub struct ConfusionMatrix {
    counts: AHashMap<EditStep, u64>,
    totals: AHashMap<(EditOperation, String), u64>,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from records. Zero counts are skipped.
    pub fn from_records<'a, I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ErrorRecord>,
    {
        let mut matrix = ConfusionMatrix::new();
        for record in records {
            matrix.add(record.step(), record.count)?;
        }
        Ok(matrix)
    }

    /// Add `count` observations of an edit.
    pub fn add(&mut self, step: EditStep, count: u64) -> Result<()> {
        step.validate()?;
        if count == 0 {
            return Ok(());
        }

        *self
            .totals
            .entry((step.operation, step.source.clone()))
            .or_insert(0) += count;
        *self.counts.entry(step).or_insert(0) += count;
        Ok(())
    }

    /// Observed count of an edit.
    pub fn count(&self, step: &EditStep) -> u64 {
        self.counts.get(step).copied().unwrap_or(0)
    }

    /// Sum of counts over all targets observed for (operation, source).
    pub fn total(&self, operation: EditOperation, source: &str) -> u64 {
        self.totals
            .get(&(operation, source.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// All observed edits for one (operation, source), sorted by target.
    pub fn targets(&self, operation: EditOperation, source: &str) -> Vec<(&str, u64)> {
        let mut targets: Vec<(&str, u64)> = self
            .counts
            .iter()
            .filter(|(step, _)| step.operation == operation && step.source == source)
            .map(|(step, &count)| (step.target.as_str(), count))
            .collect();
        targets.sort();
        targets
    }

    /// Number of distinct observed edits.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over all observed edits.
    pub fn iter(&self) -> impl Iterator<Item = (&EditStep, u64)> {
        self.counts.iter().map(|(step, &count)| (step, count))
    }
}

/// How raw counts become probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by the matrix total for the source fragment.
    #[default]
    MatrixTotals,
    /// Divide by the corpus frequency of the source fragment, add-one smoothed.
    CorpusCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorModelConfig {
    /// Probability of an edit never observed in the matrix.
    pub floor_probability: f64,
    pub normalization: Normalization,
}

impl Default for ErrorModelConfig {
    fn default() -> Self {
        ErrorModelConfig {
            floor_probability: 1e-6,
            normalization: Normalization::MatrixTotals,
        }
    }
}

impl ErrorModelConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.floor_probability > 0.0 && self.floor_probability < 1.0) {
            return Err(SpellError::invalid_config(format!(
                "floor probability must be in (0, 1), got {}",
                self.floor_probability
            )));
        }
        Ok(())
    }
}

/// P(typed fragment | intended fragment) for single edits and edit paths.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    config: ErrorModelConfig,
    matrix: ConfusionMatrix,
    char_model: Option<Arc<CharModel>>,
}

impl ErrorModel {
    pub fn new(matrix: ConfusionMatrix, config: ErrorModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(ErrorModel {
            config,
            matrix,
            char_model: None,
        })
    }

    /// A model with no observed edits: every edit gets the floor probability.
    pub fn empty(config: ErrorModelConfig) -> Result<Self> {
        Self::new(ConfusionMatrix::new(), config)
    }

    pub fn from_records(records: &[ErrorRecord], config: ErrorModelConfig) -> Result<Self> {
        let matrix = ConfusionMatrix::from_records(records)?;
        info!("Loaded {} distinct edits into the error model", matrix.len());
        Self::new(matrix, config)
    }

    pub fn from_tables(tables: &ErrorTables, config: ErrorModelConfig) -> Result<Self> {
        Self::from_records(&tables.to_records()?, config)
    }

    /// Build the model from the tables shipped with the crate.
    pub fn bundled(config: ErrorModelConfig) -> Result<Self> {
        Self::from_tables(&ErrorTables::bundled()?, config)
    }

    /// Read error records from a file.
    ///
    /// Accepts a JSON object of two-letter tables, a JSON array of records,
    /// or plain lines of `operation source target count`.
    pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<ErrorRecord>> {
        let content = fs::read_to_string(path)?;
        let trimmed = content.trim_start();

        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return match serde_json::from_str::<ErrorTableFile>(&content)? {
                ErrorTableFile::Records(records) => Ok(records),
                ErrorTableFile::Tables(tables) => tables.to_records(),
            };
        }

        let mut records = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [] => continue,
                [operation, source, target, count] => {
                    let count = count.parse::<u64>().map_err(|e| {
                        SpellError::invalid_record(format!(
                            "line {}: invalid count '{}': {}",
                            line_num + 1,
                            count,
                            e
                        ))
                    })?;
                    records.push(ErrorRecord {
                        operation: operation.parse()?,
                        source: source.to_string(),
                        target: target.to_string(),
                        count,
                    });
                }
                _ => {
                    return Err(SpellError::invalid_record(format!(
                        "line {}: expected 'operation source target count', got '{}'",
                        line_num + 1,
                        line
                    )));
                }
            }
        }
        Ok(records)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, config: ErrorModelConfig) -> Result<Self> {
        Self::from_records(&Self::load_records(path)?, config)
    }

    /// Use fragment frequencies from a character model for `CorpusCounts` normalization.
    pub fn attach_char_model(&mut self, model: Arc<CharModel>) {
        self.char_model = Some(model);
    }

    pub fn config(&self) -> &ErrorModelConfig {
        &self.config
    }

    pub fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }

    /// Probability that `source` was typed as `target` under `operation`.
    pub fn edit_probability(&self, operation: EditOperation, source: &str, target: &str) -> f64 {
        self.step_probability(&EditStep::new(operation, source, target))
    }

    pub fn step_probability(&self, step: &EditStep) -> f64 {
        let floor = self.config.floor_probability;
        let count = self.matrix.count(step);

        if let (Normalization::CorpusCounts, Some(model)) =
            (self.config.normalization, self.char_model.as_deref())
        {
            let corpus = fragment_count(model, &step.source) as f64;
            let p = (count as f64 + 1.0) / (corpus + model.vocabulary_size() as f64);
            return p.clamp(floor, 1.0);
        }

        let total = self.matrix.total(step.operation, &step.source);
        if count == 0 || total == 0 {
            return floor;
        }
        (1.0 - floor) * count as f64 / total as f64
    }

    /// Probability of independent edits applied in sequence.
    pub fn path_probability(&self, steps: &[EditStep]) -> f64 {
        steps.iter().map(|step| self.step_probability(step)).product()
    }
}

/// Corpus frequency of a fragment, with `#` standing for the word start.
fn fragment_count(model: &CharModel, fragment: &str) -> u64 {
    let chars: Vec<char> = fragment
        .chars()
        .map(|c| if c == WORD_BOUNDARY { char::start() } else { c })
        .collect();
    // a lone boundary counts word starts
    let count = if chars == [char::start()] {
        model.context_count(&chars)
    } else {
        model.ngram_count(&chars)
    };
    trace!("Corpus count for fragment '{fragment}': {count}");
    count
}
