//! casegen: retrieval-augmented test case generation
//!
//! Turns a natural-language feature description into structured test cases
//! by grounding a local language model on similar past examples.
//!
//! # Core Concepts
//!
//! - **Examples**: (feature → test cases) pairs, embedded by feature text
//!   and held in a process-scoped `ExampleStore`
//! - **Retrieval**: best-effort k-nearest-neighbor lookup; failures degrade
//!   to an empty context rather than blocking generation
//! - **Extraction**: a bracket-balancing scan that pulls the JSON array out
//!   of whatever prose the model wraps around it
//!
//! # Example
//!
//! ```
//! use casegen::{ExampleStore, HashingEmbedder, Retriever};
//! use std::sync::Arc;
//!
//! let store = Arc::new(ExampleStore::new(Arc::new(HashingEmbedder::default())));
//! let retriever = Retriever::new(store);
//! assert!(retriever.retrieve("User login", 3).is_empty());
//! ```

pub mod config;
pub mod embedding;
pub mod export;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod store;
mod testcase;

pub use config::{Config, ConfigError, ModelInfo};
pub use embedding::{Embedder, EmbeddingBackend, EmbeddingError, HashingEmbedder};
#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use extract::{extract, ExtractError, Extraction, Rejection, RejectionReason};
pub use generation::{GenerationClient, GenerationError, MockGenerationClient, OllamaClient};
pub use ingest::{flatten, IngestError, SeedExample, TestCaseTable};
pub use pipeline::{CaseGenerator, Diagnostic, ErrorKind, GenerationOutcome, PipelineError};
pub use prompt::compose;
pub use retrieval::{RetrievedExample, Retriever};
pub use store::{
    DuplicatePolicy, ExampleId, ExampleRecord, ExampleStore, QueryHit, StoreError, StoreResult,
};
pub use testcase::{TestCase, REQUIRED_FIELDS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
