//! Result extraction: pull a JSON array of test cases out of model text
//!
//! Models wrap their output in prose, markdown fences, or both. The scanner
//! walks the text for a `[` that opens an array of objects (or an empty
//! array) and follows bracket nesting, honoring string literals and escapes,
//! until the matching `]`. The first such span that parses as a JSON array
//! wins. When no span parses, the whole trimmed text is tried as a fallback.
//!
//! Elements missing any of the four required fields (or carrying an empty
//! one) are dropped individually and reported; the rest are kept.

use crate::testcase::{TestCase, REQUIRED_FIELDS};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed model output: {message}")]
    MalformedOutput { message: String, raw_text: String },
}

impl ExtractError {
    /// The model text that failed to parse.
    pub fn raw_text(&self) -> &str {
        match self {
            ExtractError::MalformedOutput { raw_text, .. } => raw_text,
        }
    }
}

/// Why an individual element was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// The element is not a JSON object.
    NotAnObject,
    /// A required field is absent.
    MissingField(&'static str),
    /// A required field is present but not a string.
    NotAString(&'static str),
    /// A required field is an empty or whitespace-only string.
    EmptyField(&'static str),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "not an object"),
            Self::MissingField(name) => write!(f, "missing field \"{}\"", name),
            Self::NotAString(name) => write!(f, "field \"{}\" is not a string", name),
            Self::EmptyField(name) => write!(f, "field \"{}\" is empty", name),
        }
    }
}

/// A dropped element: its position in the parsed array and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectionReason,
}

/// The result of a successful extraction.
///
/// An empty `test_cases` with no rejections means the model legitimately
/// returned an empty array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub test_cases: Vec<TestCase>,
    pub rejections: Vec<Rejection>,
}

impl Extraction {
    pub fn dropped(&self) -> usize {
        self.rejections.len()
    }
}

/// Locate, parse, and validate the test case array in `raw_text`.
pub fn extract(raw_text: &str) -> Result<Extraction, ExtractError> {
    let elements = parse_array(raw_text)?;

    let mut extraction = Extraction::default();
    for (index, element) in elements.into_iter().enumerate() {
        match validate(element) {
            Ok(tc) => extraction.test_cases.push(tc),
            Err(reason) => extraction.rejections.push(Rejection { index, reason }),
        }
    }

    if extraction.dropped() > 0 {
        warn!(
            kept = extraction.test_cases.len(),
            dropped = extraction.dropped(),
            "dropped invalid test case records"
        );
    }
    debug!(kept = extraction.test_cases.len(), "extracted test cases");
    Ok(extraction)
}

fn parse_array(raw_text: &str) -> Result<Vec<Value>, ExtractError> {
    let mut first_error: Option<String> = None;

    for span in array_spans(raw_text) {
        match serde_json::from_str::<Value>(span) {
            Ok(Value::Array(items)) => return Ok(items),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    let trimmed = raw_text.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(malformed(
            format!("expected a JSON array, found {}", json_kind(&other)),
            raw_text,
        )),
        Err(e) => Err(malformed(
            first_error.unwrap_or_else(|| e.to_string()),
            raw_text,
        )),
    }
}

fn malformed(message: String, raw_text: &str) -> ExtractError {
    ExtractError::MalformedOutput {
        message,
        raw_text: raw_text.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Candidate array spans in order of their opening bracket.
///
/// A candidate opens with `[` whose next non-whitespace character is `{` or
/// `]`, and closes at the matching `]`. Unbalanced or mismatched candidates
/// are skipped.
fn array_spans<'a>(text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let bytes = text.as_bytes();
    (0..bytes.len())
        .filter(move |&i| bytes[i] == b'[' && opens_object_array(&bytes[i + 1..]))
        .filter_map(move |start| balanced_end(bytes, start).map(|end| &text[start..=end]))
}

fn opens_object_array(rest: &[u8]) -> bool {
    matches!(
        rest.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b']')
    )
}

/// Index of the `]` closing the array that opens at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => stack.push(b),
            b']' | b'}' => {
                let open = stack.pop()?;
                if (open == b'[') != (b == b']') {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate(element: Value) -> Result<TestCase, RejectionReason> {
    let Value::Object(mut map) = element else {
        return Err(RejectionReason::NotAnObject);
    };

    let title = take_field(&mut map, REQUIRED_FIELDS[0], &[])?;
    let preconditions = take_field(&mut map, REQUIRED_FIELDS[1], &[])?;
    let steps = take_field(&mut map, REQUIRED_FIELDS[2], &[])?;
    let expected = take_field(&mut map, REQUIRED_FIELDS[3], &["ExpectedResult"])?;

    Ok(TestCase::new(title, preconditions, steps, expected))
}

fn take_field(
    map: &mut Map<String, Value>,
    name: &'static str,
    aliases: &[&str],
) -> Result<String, RejectionReason> {
    let value = std::iter::once(name)
        .chain(aliases.iter().copied())
        .find_map(|key| map.remove(key))
        .ok_or(RejectionReason::MissingField(name))?;
    match value {
        Value::String(s) if s.trim().is_empty() => Err(RejectionReason::EmptyField(name)),
        Value::String(s) => Ok(s),
        _ => Err(RejectionReason::NotAString(name)),
    }
}
