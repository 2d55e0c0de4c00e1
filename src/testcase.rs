//! The generation target: one structured test case.

use serde::{Deserialize, Serialize};

/// Wire names of the four required fields, in column order.
pub const REQUIRED_FIELDS: [&str; 4] = ["Title", "Preconditions", "Steps", "Expected Result"];

/// A single test case as produced by the model or supplied for ingestion.
///
/// Field names on the wire match the column headers users work with
/// (`Expected Result` carries a space). `ExpectedResult` is accepted as an
/// alias when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Preconditions")]
    pub preconditions: String,
    /// Newline-delimited ordered step descriptions.
    #[serde(rename = "Steps")]
    pub steps: String,
    #[serde(rename = "Expected Result", alias = "ExpectedResult")]
    pub expected_result: String,
}

impl TestCase {
    pub fn new(
        title: impl Into<String>,
        preconditions: impl Into<String>,
        steps: impl Into<String>,
        expected_result: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            preconditions: preconditions.into(),
            steps: steps.into(),
            expected_result: expected_result.into(),
        }
    }

    /// Individual steps, in order, skipping blank lines.
    pub fn step_list(&self) -> Vec<&str> {
        self.steps
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Field values in `REQUIRED_FIELDS` order.
    pub fn fields(&self) -> [&str; 4] {
        [
            &self.title,
            &self.preconditions,
            &self.steps,
            &self.expected_result,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_column_names() {
        let tc = TestCase::new("Valid login", "User exists", "Step 1: a", "Dashboard shown");
        let json = serde_json::to_value(&tc).unwrap();
        assert_eq!(json["Title"], "Valid login");
        assert_eq!(json["Expected Result"], "Dashboard shown");
        assert!(json.get("expected_result").is_none());
    }

    #[test]
    fn accepts_expected_result_alias() {
        let tc: TestCase = serde_json::from_str(
            r#"{"Title":"t","Preconditions":"p","Steps":"s","ExpectedResult":"e"}"#,
        )
        .unwrap();
        assert_eq!(tc.expected_result, "e");
    }

    #[test]
    fn step_list_splits_lines() {
        let tc = TestCase::new("t", "p", "Step 1: enter creds\n\n Step 2: submit ", "e");
        assert_eq!(tc.step_list(), vec!["Step 1: enter creds", "Step 2: submit"]);
    }
}
