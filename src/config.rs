//! Runtime configuration, loaded from YAML
//!
//! Every field has a default, so an empty or absent file is a valid
//! configuration.

use crate::embedding::{EmbeddingBackend, DEFAULT_MAX_CHARS};
use crate::generation::DEFAULT_ENDPOINT;
use crate::retrieval::DEFAULT_K;
use crate::store::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A model the generation backend is expected to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
}

impl ModelInfo {
    fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation endpoint (`POST {model, prompt, stream}`).
    pub endpoint: String,
    pub default_model: String,
    /// Upper bound on one generation request.
    pub timeout_secs: u64,
    /// Examples retrieved per request.
    pub retrieval_k: usize,
    /// Embedder used for the example store. The default `hashing` backend
    /// matches on shared words only; semantic retrieval with
    /// all-MiniLM-L6-v2 needs a build with `--features embeddings` and
    /// `embedding_backend: fastembed`.
    pub embedding_backend: EmbeddingBackend,
    /// Longest feature text accepted for embedding, in characters.
    pub max_embed_chars: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub models: Vec<ModelInfo>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_model: "mistral".to_string(),
            timeout_secs: 120,
            retrieval_k: DEFAULT_K,
            embedding_backend: EmbeddingBackend::default(),
            max_embed_chars: DEFAULT_MAX_CHARS,
            duplicate_policy: DuplicatePolicy::default(),
            models: default_models(),
        }
    }
}

fn default_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new(
            "mistral",
            "Lightweight and fast open-source model suited to structured reasoning",
        ),
        ModelInfo::new(
            "llama2",
            "General-purpose model with balanced natural language generation",
        ),
        ModelInfo::new("gemma", "Open-weight model, strong on logical tasks and alignment"),
        ModelInfo::new(
            "dolphin-mixtral",
            "Creative and structured, good for step-by-step reasoning",
        ),
    ]
}

impl Config {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a map
        let config: Config = if raw.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Load from `path` if given, otherwise from the default location,
    /// falling back to defaults when no default file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => match default_config_path() {
                Some(p) if p.exists() => Self::load(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        if self.retrieval_k == 0 {
            return Err(ConfigError::Invalid("retrieval_k must be at least 1".into()));
        }
        if self.max_embed_chars == 0 {
            return Err(ConfigError::Invalid("max_embed_chars must be at least 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Catalogue entry for `model_id`, if known.
    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

/// Get the default config path (~/.config/casegen/config.yaml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("casegen").join("config.yaml"))
}
