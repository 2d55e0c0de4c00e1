//! CSV export of generated test cases

use crate::testcase::{TestCase, REQUIRED_FIELDS};

/// Render test cases as CSV with a header row.
///
/// Fields containing a comma, quote, or line break are quoted, with inner
/// quotes doubled. Rows end with `\r\n`.
pub fn to_csv(cases: &[TestCase]) -> String {
    let mut out = String::new();
    push_row(&mut out, &REQUIRED_FIELDS);
    for case in cases {
        push_row(&mut out, &case.fields());
    }
    out
}

fn push_row(out: &mut String, cells: &[&str]) {
    let row: Vec<String> = cells.iter().map(|c| escape(c)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
