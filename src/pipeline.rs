//! CaseGenerator: the retrieval-augmented generation pipeline
//!
//! Write path: feature + test cases → flatten → embed → example store.
//! Generate path: retrieve → compose → generate → extract.
//!
//! Stages run sequentially within one request. Retrieval failures degrade to
//! an empty context; every other failure is returned as a `PipelineError`
//! that can be rendered as a `Diagnostic` for display.

use crate::config::Config;
use crate::embedding::EmbeddingError;
use crate::extract::{self, ExtractError, Rejection};
use crate::generation::{GenerationClient, GenerationError, OllamaClient};
use crate::ingest::{self, IngestError, SeedExample, TestCaseTable};
use crate::prompt;
use crate::retrieval::{RetrievedExample, Retriever, DEFAULT_K};
use crate::store::{DuplicatePolicy, ExampleId, ExampleRecord, ExampleStore, StoreError};
use crate::testcase::TestCase;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Stable label for each failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    DuplicateExample,
    TextTooLong,
    StoreUnavailable,
    BackendUnreachable,
    BackendError,
    MalformedOutput,
}

/// Display payload for a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub error_kind: ErrorKind,
    pub message: String,
    /// Model output, when the failure happened after generation.
    pub raw_text: Option<String>,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::Ingest(_) => ErrorKind::InvalidInput,
            PipelineError::Store(StoreError::DuplicateId(_)) => ErrorKind::DuplicateExample,
            PipelineError::Store(StoreError::Embedding(EmbeddingError::TextTooLong { .. })) => {
                ErrorKind::TextTooLong
            }
            PipelineError::Store(_) => ErrorKind::StoreUnavailable,
            PipelineError::Generation(GenerationError::BackendUnreachable(_)) => {
                ErrorKind::BackendUnreachable
            }
            PipelineError::Generation(GenerationError::BackendError(_)) => ErrorKind::BackendError,
            PipelineError::Extract(_) => ErrorKind::MalformedOutput,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        let raw_text = match self {
            PipelineError::Extract(e) => Some(e.raw_text().to_string()),
            _ => None,
        };
        Diagnostic {
            error_kind: self.kind(),
            message: self.to_string(),
            raw_text,
        }
    }
}

/// What a successful generation produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub test_cases: Vec<TestCase>,
    /// Elements of the model's array that failed validation.
    pub rejections: Vec<Rejection>,
    /// Examples used as grounding, most similar first.
    pub retrieved: Vec<RetrievedExample>,
    pub prompt: String,
    pub raw_text: String,
}

/// Runs ingestion and generation against one example store and one backend.
pub struct CaseGenerator {
    retriever: Retriever,
    client: Arc<dyn GenerationClient>,
    retrieval_k: usize,
    duplicate_policy: DuplicatePolicy,
    timeout: Option<Duration>,
}

impl CaseGenerator {
    pub fn new(retriever: Retriever, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            retriever,
            client,
            retrieval_k: DEFAULT_K,
            duplicate_policy: DuplicatePolicy::default(),
            timeout: None,
        }
    }

    /// Build from configuration: open the example store (degrading to an
    /// unavailable retriever if the embedding backend fails) and an HTTP
    /// generation client.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let retriever = match ExampleStore::open(config.embedding_backend, config.max_embed_chars) {
            Ok(store) => Retriever::new(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "example store unavailable, generating without retrieval");
                Retriever::unavailable(e)
            }
        };
        let client = OllamaClient::new(config.endpoint.clone(), config.timeout())?;
        info!(
            endpoint = client.endpoint(),
            model = %config.default_model,
            "generation backend configured"
        );
        Ok(Self::new(retriever, Arc::new(client))
            .with_retrieval_k(config.retrieval_k)
            .with_duplicate_policy(config.duplicate_policy)
            .with_timeout(config.timeout()))
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Bound each generation call; expiry surfaces as `BackendUnreachable`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    fn store(&self) -> Result<&Arc<ExampleStore>, PipelineError> {
        self.retriever.store().ok_or_else(|| {
            PipelineError::Store(StoreError::Unavailable(
                "example store failed to initialize".to_string(),
            ))
        })
    }

    /// Store `cases` as an example for `feature` under the configured
    /// duplicate policy.
    pub fn ingest(&self, feature: &str, cases: &[TestCase]) -> Result<ExampleId, PipelineError> {
        self.ingest_with_policy(feature, cases, self.duplicate_policy)
    }

    pub fn ingest_with_policy(
        &self,
        feature: &str,
        cases: &[TestCase],
        policy: DuplicatePolicy,
    ) -> Result<ExampleId, PipelineError> {
        let feature = feature.trim();
        if feature.is_empty() {
            return Err(IngestError::EmptyFeature.into());
        }
        if cases.is_empty() {
            return Err(IngestError::EmptyTable.into());
        }
        let record = ExampleRecord::new(feature, ingest::flatten(cases));
        self.store_record(record, cases.len(), policy)
    }

    /// Store `cases` for `feature` under a caller-supplied key instead of one
    /// derived from the feature text.
    pub fn ingest_with_id(
        &self,
        id: ExampleId,
        feature: &str,
        cases: &[TestCase],
        policy: DuplicatePolicy,
    ) -> Result<ExampleId, PipelineError> {
        let feature = feature.trim();
        if id.as_str().trim().is_empty() {
            return Err(PipelineError::InvalidInput("example id is empty".to_string()));
        }
        if feature.is_empty() {
            return Err(IngestError::EmptyFeature.into());
        }
        if cases.is_empty() {
            return Err(IngestError::EmptyTable.into());
        }
        let record = ExampleRecord::with_id(id, feature, ingest::flatten(cases));
        self.store_record(record, cases.len(), policy)
    }

    fn store_record(
        &self,
        record: ExampleRecord,
        cases: usize,
        policy: DuplicatePolicy,
    ) -> Result<ExampleId, PipelineError> {
        let id = record.id.clone();
        self.store()?.add(record, policy)?;
        info!(id = %id, cases, "ingested example");
        Ok(id)
    }

    /// Validate a table of test cases and store it for `feature`.
    pub fn ingest_table(
        &self,
        feature: &str,
        table: TestCaseTable,
    ) -> Result<ExampleId, PipelineError> {
        let cases = table.into_test_cases()?;
        self.ingest(feature, &cases)
    }

    /// Ingest every seed entry, stopping at the first failure.
    pub fn ingest_seeds(&self, seeds: &[SeedExample]) -> Result<usize, PipelineError> {
        for seed in seeds {
            self.ingest(&seed.feature, &seed.test_cases)?;
        }
        Ok(seeds.len())
    }

    /// Grounding examples for `feature`, best effort.
    pub fn retrieve(&self, feature: &str) -> Vec<RetrievedExample> {
        self.retriever.retrieve(feature, self.retrieval_k)
    }

    /// Generate test cases for `feature` with `model_id`.
    pub async fn generate(
        &self,
        feature: &str,
        model_id: &str,
    ) -> Result<GenerationOutcome, PipelineError> {
        if feature.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "feature description is empty".to_string(),
            ));
        }

        let retrieved = self.retrieve(feature);
        let prompt = prompt::compose(feature, &retrieved);

        let call = self.client.generate(&prompt, model_id);
        let raw_text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                GenerationError::BackendUnreachable(format!(
                    "timed out after {}s",
                    limit.as_secs_f32()
                ))
            })??,
            None => call.await?,
        };

        let extraction = extract::extract(&raw_text)?;
        info!(
            model = model_id,
            retrieved = retrieved.len(),
            generated = extraction.test_cases.len(),
            dropped = extraction.dropped(),
            "generation finished"
        );

        Ok(GenerationOutcome {
            test_cases: extraction.test_cases,
            rejections: extraction.rejections,
            retrieved,
            prompt,
            raw_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::generation::MockGenerationClient;

    fn generator(client: MockGenerationClient) -> CaseGenerator {
        let store = Arc::new(ExampleStore::new(Arc::new(HashingEmbedder::default())));
        CaseGenerator::new(Retriever::new(store), Arc::new(client))
    }

    fn login_case() -> TestCase {
        TestCase::new(
            "Valid login",
            "User exists",
            "Step 1: enter creds\nStep 2: submit",
            "Dashboard shown",
        )
    }

    #[test]
    fn ingest_rejects_empty_feature_and_cases() {
        let g = generator(MockGenerationClient::available());
        assert_eq!(g.ingest("  ", &[login_case()]).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(g.ingest("Login", &[]).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn duplicate_ingest_is_labeled() {
        let g = generator(MockGenerationClient::available());
        g.ingest("User login", &[login_case()]).unwrap();
        let err = g.ingest("User login", &[login_case()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateExample);
        g.ingest_with_policy("User login", &[login_case()], DuplicatePolicy::Overwrite)
            .unwrap();
    }

    #[test]
    fn symbol_only_differences_ingest_as_separate_examples() {
        let g = generator(MockGenerationClient::available());
        let lt = g.ingest("Upload limit: file size < 5 MB", &[login_case()]).unwrap();
        let gt = g.ingest("Upload limit: file size > 5 MB", &[login_case()]).unwrap();
        assert_ne!(lt, gt);
        assert_eq!(g.retriever().store().unwrap().len(), 2);
    }

    #[test]
    fn ingest_with_id_uses_the_caller_key() {
        let g = generator(MockGenerationClient::available());
        let id = ExampleId::from_string("REQ-17");
        let stored = g
            .ingest_with_id(id.clone(), "User login", &[login_case()], DuplicatePolicy::Reject)
            .unwrap();
        assert_eq!(stored, id);

        // same feature text under a different key is a separate example
        g.ingest_with_id(
            ExampleId::from_string("REQ-18"),
            "User login",
            &[login_case()],
            DuplicatePolicy::Reject,
        )
        .unwrap();
        let store = g.retriever().store().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&id).unwrap().feature_text, "User login");

        let err = g
            .ingest_with_id(id, "Other", &[login_case()], DuplicatePolicy::Reject)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateExample);
    }

    #[test]
    fn ingest_with_blank_id_is_invalid_input() {
        let g = generator(MockGenerationClient::available());
        let err = g
            .ingest_with_id(
                ExampleId::from_string(" "),
                "User login",
                &[login_case()],
                DuplicatePolicy::Reject,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn ingest_into_unavailable_store_is_store_unavailable() {
        let g = CaseGenerator::new(
            Retriever::unavailable(StoreError::Unavailable("no model".into())),
            Arc::new(MockGenerationClient::available()),
        );
        let err = g.ingest("Login", &[login_case()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn text_too_long_is_labeled() {
        let store = Arc::new(ExampleStore::new(Arc::new(
            HashingEmbedder::default().with_max_chars(4),
        )));
        let g = CaseGenerator::new(
            Retriever::new(store),
            Arc::new(MockGenerationClient::available()),
        );
        let err = g.ingest("User login", &[login_case()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TextTooLong);
    }

    #[tokio::test]
    async fn generate_rejects_blank_feature() {
        let g = generator(MockGenerationClient::available().with_fallback("[]"));
        let err = g.generate("   ", "mistral").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn malformed_output_diagnostic_carries_raw_text() {
        let g = generator(MockGenerationClient::available().with_response("mistral", "I cannot comply"));
        let err = g.generate("User login", "mistral").await.unwrap_err();
        let diag = err.diagnostic();
        assert_eq!(diag.error_kind, ErrorKind::MalformedOutput);
        assert_eq!(diag.raw_text.as_deref(), Some("I cannot comply"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_labeled() {
        let g = generator(MockGenerationClient::unavailable());
        let err = g.generate("User login", "mistral").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnreachable);
        assert!(err.diagnostic().raw_text.is_none());
    }

    #[tokio::test]
    async fn unknown_model_is_backend_error() {
        let g = generator(MockGenerationClient::available());
        let err = g.generate("User login", "gemma").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendError);
    }

    #[test]
    fn diagnostic_serializes_camel_case() {
        let err = PipelineError::InvalidInput("empty".into());
        let json = serde_json::to_value(err.diagnostic()).unwrap();
        assert_eq!(json["errorKind"], "InvalidInput");
        assert_eq!(json["message"], "invalid input: empty");
        assert!(json["rawText"].is_null());
    }

    struct SlowClient;

    #[async_trait::async_trait]
    impl GenerationClient for SlowClient {
        async fn generate(&self, _prompt: &str, _model_id: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("[]".to_string())
        }
    }

    #[tokio::test]
    async fn generation_timeout_is_backend_unreachable() {
        let store = Arc::new(ExampleStore::new(Arc::new(HashingEmbedder::default())));
        let g = CaseGenerator::new(Retriever::new(store), Arc::new(SlowClient))
            .with_timeout(Duration::from_millis(50));
        let err = g.generate("User login", "mistral").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnreachable);
    }
}
