//! Ingestion of (feature → test cases) examples
//!
//! Callers hand over a feature label plus a table of test case rows. The
//! table is checked for the four required columns, then every row is
//! flattened into the text block stored alongside the feature embedding.

use crate::testcase::{TestCase, REQUIRED_FIELDS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while shaping ingestion input.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("table is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("no test cases supplied for feature")]
    EmptyTable,

    #[error("feature description is empty")]
    EmptyFeature,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("seed file parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Tabular test case input with named columns.
///
/// Extra columns are ignored; column order is free.
#[derive(Debug, Clone)]
pub struct TestCaseTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TestCaseTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Validate the table shape and read out the test cases.
    pub fn into_test_cases(self) -> Result<Vec<TestCase>, IngestError> {
        let position = |name: &str| self.headers.iter().position(|h| h.trim() == name);

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|f| position(f).is_none())
            .map(|f| f.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        let cols: Vec<usize> = REQUIRED_FIELDS.iter().filter_map(|f| position(f)).collect();
        let width = self.headers.len();

        let mut cases = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(IngestError::RaggedRow {
                    row: i + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            cases.push(TestCase::new(
                row[cols[0]].clone(),
                row[cols[1]].clone(),
                row[cols[2]].clone(),
                row[cols[3]].clone(),
            ));
        }
        Ok(cases)
    }
}

/// Flatten test cases into the stored text form.
///
/// Each case renders as `Title/Preconditions/Steps/Expected Result` lines
/// followed by a blank line; the concatenation is trimmed.
pub fn flatten(cases: &[TestCase]) -> String {
    let mut out = String::new();
    for case in cases {
        out.push_str(&format!(
            "Title: {}\nPreconditions: {}\nSteps: {}\nExpected Result: {}\n\n",
            case.title, case.preconditions, case.steps, case.expected_result
        ));
    }
    out.trim().to_string()
}

/// One entry of a seed corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedExample {
    pub feature: String,
    pub test_cases: Vec<TestCase>,
}

/// Load a YAML seed corpus: a list of `{ feature, test_cases }` entries.
pub fn load_seed_file(path: &Path) -> Result<Vec<SeedExample>, IngestError> {
    let raw = std::fs::read_to_string(path)?;
    let seeds: Vec<SeedExample> = serde_yaml::from_str(&raw)?;
    Ok(seeds)
}
