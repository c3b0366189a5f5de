use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole question-answering pipeline.
///
/// Every section has a default, so a partial `config.yaml` is enough.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Configuration for the generation model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
}

/// Configuration for the query embedding model.
///
/// Must be the same model the index vectors were produced with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
}

/// Location of the persisted index (a directory holding `metadata.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub path: String,
}

/// Retrieval behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of documents requested from the retriever
    #[serde(default = "default_k")]
    pub k: usize,
    /// Re-rank with maximal marginal relevance instead of plain similarity
    #[serde(default)]
    pub use_mmr: bool,
    /// MMR lambda: 1.0 ranks by relevance only, 0.0 by novelty only
    #[serde(default = "default_mmr_diversity")]
    pub mmr_diversity: f32,
    /// Documents kept per retrieval round before relevance check and generation
    #[serde(default = "default_max_context_docs")]
    pub max_context_docs: usize,
}

/// State machine behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Route retrieval through the relevance check; otherwise a straight line
    #[serde(default)]
    pub enable_branching: bool,
    #[serde(default = "default_reretrieve_threshold")]
    pub reretrieve_threshold: f32,
    #[serde(default = "default_max_reretrieves")]
    pub max_reretrieves: usize,
    /// Average document length (in characters) at which the default
    /// relevance score saturates at 1.0
    #[serde(default = "default_relevance_saturation_chars")]
    pub relevance_saturation_chars: f32,
    /// Ordered keyword templates; the first keyword found in the question wins
    #[serde(default)]
    pub keyword_prompts: Vec<KeywordPrompt>,
}

/// A keyword and the instruction used when the question contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPrompt {
    pub keyword: String,
    pub template: String,
}

impl KeywordPrompt {
    pub fn new(keyword: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            template: template.into(),
        }
    }
}

fn default_k() -> usize {
    5
}

fn default_mmr_diversity() -> f32 {
    0.5
}

fn default_max_context_docs() -> usize {
    4
}

fn default_reretrieve_threshold() -> f32 {
    0.3
}

fn default_max_reretrieves() -> usize {
    1
}

fn default_relevance_saturation_chars() -> f32 {
    100.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:1.5b".to_string(),
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.0,
            top_p: None,
            top_k: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm".to_string(),
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "./data/processed/index".to_string(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            use_mmr: false,
            mmr_diversity: default_mmr_diversity(),
            max_context_docs: default_max_context_docs(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enable_branching: false,
            reretrieve_threshold: default_reretrieve_threshold(),
            max_reretrieves: default_max_reretrieves(),
            relevance_saturation_chars: default_relevance_saturation_chars(),
            keyword_prompts: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }
}
