//! Shared helpers for casegen integration tests.

#![allow(dead_code)]

use casegen::{
    CaseGenerator, ExampleStore, GenerationClient, HashingEmbedder, MockGenerationClient,
    Retriever, TestCase,
};
use std::sync::Arc;

/// Fresh in-memory store over the hashing embedder.
pub fn store() -> Arc<ExampleStore> {
    Arc::new(ExampleStore::new(Arc::new(HashingEmbedder::default())))
}

/// Generator over a fresh store and the given client.
pub fn generator_with(client: impl GenerationClient + 'static) -> CaseGenerator {
    CaseGenerator::new(Retriever::new(store()), Arc::new(client))
}

/// Generator whose backend answers every model with `text`.
pub fn generator_answering(text: &str) -> CaseGenerator {
    generator_with(MockGenerationClient::available().with_fallback(text))
}

pub fn login_case() -> TestCase {
    TestCase::new(
        "Valid login",
        "User exists",
        "Step 1: enter creds\nStep 2: submit",
        "Dashboard shown",
    )
}

/// Minified JSON for one valid record.
pub fn record_json(title: &str) -> String {
    serde_json::json!({
        "Title": title,
        "Preconditions": "p",
        "Steps": "Step 1: a\nStep 2: b",
        "Expected Result": "e",
    })
    .to_string()
}

/// A small corpus of unrelated features.
pub fn corpus() -> Vec<(&'static str, TestCase)> {
    vec![
        ("User login", login_case()),
        (
            "Export monthly invoices as PDF",
            TestCase::new("Export PDF", "Invoices exist", "Step 1: click export", "PDF downloads"),
        ),
        (
            "Reset a forgotten password by email",
            TestCase::new("Reset link", "Account exists", "Step 1: request reset", "Email sent"),
        ),
        (
            "Upload a profile picture",
            TestCase::new("Upload JPEG", "Logged in", "Step 1: choose file", "Avatar updated"),
        ),
    ]
}
