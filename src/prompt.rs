//! Prompt composition
//!
//! `compose` is a pure function of its inputs: retrieved examples first (in
//! the order given), then the fixed instruction block, then the new feature.

use crate::retrieval::RetrievedExample;
use crate::testcase::REQUIRED_FIELDS;

const PREAMBLE: &str = "You are a skilled and exhaustive test analyst.";

const COVERAGE: &str = "\
Now generate a comprehensive, detailed list of test cases for the new feature below. Include:
- Positive and negative scenarios
- Edge cases and boundary conditions
- Validation and exception handling
- Role-based behavior if applicable";

/// Marks where the feature description begins.
pub const FEATURE_DELIMITER: &str = "Feature:";

/// Render retrieved examples as labeled feature / test-cases blocks.
pub fn render_examples(retrieved: &[RetrievedExample]) -> String {
    retrieved
        .iter()
        .map(|ex| format!("Feature: {}\nTest Cases: {}", ex.feature_text, ex.test_cases_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The fixed output contract: one JSON array of records with the four fields.
fn output_contract() -> String {
    let fields = REQUIRED_FIELDS
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Output only a valid JSON array of objects. Each object must have exactly {} fields: {}.\n\
         Do not add any text before or after the array. Example:\n\
         [\n  {{\n    \"Title\": \"...\",\n    \"Preconditions\": \"...\",\n    \
         \"Steps\": \"Step 1: ...\\nStep 2: ...\",\n    \"Expected Result\": \"...\"\n  }}\n]",
        REQUIRED_FIELDS.len(),
        fields
    )
}

/// Build the generation prompt for `new_feature`.
pub fn compose(new_feature: &str, retrieved: &[RetrievedExample]) -> String {
    let mut prompt = String::new();
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    if retrieved.is_empty() {
        prompt.push_str("No similar features are on record; rely on the feature description alone.\n\n");
    } else {
        prompt.push_str("Here are similar feature descriptions and their test cases:\n");
        prompt.push_str(&render_examples(retrieved));
        prompt.push_str("\n\n");
    }

    prompt.push_str(COVERAGE);
    prompt.push_str("\n\n");
    prompt.push_str(&output_contract());
    prompt.push_str("\n\n");
    prompt.push_str(FEATURE_DELIMITER);
    prompt.push('\n');
    prompt.push_str(new_feature);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(feature: &str, cases: &str) -> RetrievedExample {
        RetrievedExample {
            feature_text: feature.to_string(),
            test_cases_text: cases.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn cold_start_prompt_has_contract_and_feature() {
        let prompt = compose("Users can export reports as CSV", &[]);
        assert!(prompt.contains("exactly 4 fields"));
        for field in REQUIRED_FIELDS {
            assert!(prompt.contains(&format!("\"{}\"", field)));
        }
        assert!(prompt.contains("Users can export reports as CSV"));
        assert!(!prompt.contains("Test Cases:"));
    }

    #[test]
    fn compose_is_deterministic() {
        let retrieved = vec![example("Login", "Title: a"), example("Logout", "Title: b")];
        assert_eq!(compose("Signup", &retrieved), compose("Signup", &retrieved));
    }

    #[test]
    fn examples_keep_given_order() {
        let retrieved = vec![example("First feature", "A"), example("Second feature", "B")];
        let prompt = compose("New", &retrieved);
        let first = prompt.find("Feature: First feature\nTest Cases: A").unwrap();
        let second = prompt.find("Feature: Second feature\nTest Cases: B").unwrap();
        assert!(first < second);
    }

    #[test]
    fn feature_comes_last_after_instructions() {
        let prompt = compose("The new feature text", &[example("Old", "cases")]);
        let instructions = prompt.find("Output only a valid JSON array").unwrap();
        let delimiter = prompt.rfind(FEATURE_DELIMITER).unwrap();
        let feature = prompt.rfind("The new feature text").unwrap();
        assert!(instructions < delimiter && delimiter < feature);
        assert!(prompt.trim_end().ends_with("The new feature text"));
    }

    #[test]
    fn coverage_categories_are_listed() {
        let prompt = compose("x", &[]);
        for phrase in ["Positive and negative", "boundary", "exception", "Role-based"] {
            assert!(prompt.contains(phrase), "missing {}", phrase);
        }
    }

    #[test]
    fn empty_feature_is_accepted() {
        let prompt = compose("", &[]);
        assert!(prompt.ends_with("Feature:\n\n"));
    }
}
