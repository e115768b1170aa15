//! Configuration file parsing for the server.
//!
//! One TOML file carries the bind address, every component's settings and
//! the endpoints of the external services. Secrets never appear in the file;
//! the file names the environment variables holding them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use veritas_extractor::PreprocessConfig;
use veritas_gatekeeper::FilterConfig;
use veritas_graph::GraphConfig;
use veritas_llm::RetryPolicy;
use veritas_orchestrator::OrchestratorConfig;
use veritas_synthesizer::SynthesizerConfig;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which service generates text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationBackend {
    /// OpenAI-compatible chat completions (Groq)
    #[default]
    Groq,
    /// Local Ollama server
    Ollama,
}

/// Text generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend kind
    pub backend: GenerationBackend,
    /// Base URL of the API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Environment variable holding the API key (Groq only)
    pub api_key_env: String,
    /// Timeout for one HTTP request
    pub request_timeout_ms: u64,
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            request_timeout_ms: 15_000,
            max_attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl GenerationConfig {
    /// Timeout for one HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry policy handed to the provider
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Local embedding endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama endpoint
    pub endpoint: String,
    /// Embedding model
    pub model: String,
    /// Vector length the model produces
    pub dimension: usize,
    /// Timeout for one HTTP request
    pub request_timeout_ms: u64,
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub retry_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            request_timeout_ms: 8_000,
            max_attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl EmbeddingConfig {
    /// Timeout for one HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry policy handed to the embedder
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Reliability rating service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// OAuth2 token endpoint; `None` keeps the client's default
    pub token_url: Option<String>,
    /// Rating API base; `None` keeps the client's default
    pub api_url: Option<String>,
    /// Environment variable holding the client id
    pub client_id_env: String,
    /// Environment variable holding the client secret
    pub client_secret_env: String,
    /// Timeout for one HTTP request
    pub request_timeout_ms: u64,
    /// Check attempts per lookup, including the first
    pub max_attempts: u32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            token_url: None,
            api_url: None,
            client_id_env: "NEWSGUARD_CLIENT_ID".to_string(),
            client_secret_env: "NEWSGUARD_CLIENT_SECRET".to_string(),
            request_timeout_ms: 2_000,
            max_attempts: 3,
        }
    }
}

impl RatingConfig {
    /// Timeout for one HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Longest one lookup can take, retries and re-authentication included
    pub fn lookup_budget(&self) -> Duration {
        veritas_sources::lookup_budget(self.request_timeout(), self.max_attempts)
    }
}

/// Web search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search endpoint; `None` keeps the client's default
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: "TAVILY_API_KEY".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Page crawling and extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Agent name matched against robots.txt groups
    pub user_agent: String,
    /// Longest body kept per article, in characters
    pub max_body_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: veritas_sources::robots::DEFAULT_CRAWLER_AGENT.to_string(),
            max_body_chars: 20_000,
        }
    }
}

/// Verified-claim history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Keep a history at all
    pub enabled: bool,
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("veritas-history.db"),
        }
    }
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ListenConfig,
    /// Per-claim pipeline settings
    #[serde(default)]
    pub pipeline: OrchestratorConfig,
    /// Source funnel
    #[serde(default)]
    pub filter: FilterConfig,
    /// Claim and source preprocessing
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Graph backend and ingestion
    #[serde(default)]
    pub graph: GraphConfig,
    /// Verdict generation
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,
    /// Text generation endpoint
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Embedding endpoint
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Rating service
    #[serde(default)]
    pub rating: RatingConfig,
    /// Search service
    #[serde(default)]
    pub search: SearchConfig,
    /// Crawling and extraction
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// History database
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Bind address and port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,
    /// Bind port (e.g., 8080)
    pub bind_port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::MissingField("server.bind_address".to_string()));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::MissingField("generation.model".to_string()));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::MissingField("embedding.model".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.history.enabled && self.history.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("history.path".to_string()));
        }

        self.pipeline
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.filter
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.preprocess
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.graph
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.synthesizer
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.validate_retry_budgets()
    }

    /// Every stage deadline must leave room for the retries of the client
    /// it wraps, or the first hung attempt uses up the whole stage
    fn validate_retry_budgets(&self) -> Result<(), ConfigError> {
        for (name, ms) in [
            ("generation.request_timeout_ms", self.generation.request_timeout_ms),
            ("embedding.request_timeout_ms", self.embedding.request_timeout_ms),
            ("rating.request_timeout_ms", self.rating.request_timeout_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        let generation = self
            .generation
            .retry_policy()
            .worst_case(self.generation.request_timeout());
        stage_fits("preprocess.llm_timeout_secs", self.preprocess.llm_timeout(), generation)?;
        stage_fits(
            "filter.correlation_timeout_ms",
            Duration::from_millis(self.filter.correlation_timeout_ms),
            generation,
        )?;
        stage_fits(
            "graph.resolve_timeout_ms",
            Duration::from_millis(self.graph.resolve_timeout_ms),
            generation,
        )?;
        stage_fits(
            "synthesizer.generation_timeout_ms",
            Duration::from_millis(self.synthesizer.generation_timeout_ms),
            generation,
        )?;

        let embedding = self
            .embedding
            .retry_policy()
            .worst_case(self.embedding.request_timeout());
        stage_fits(
            "graph.embed_timeout_ms",
            Duration::from_millis(self.graph.embed_timeout_ms),
            embedding,
        )?;
        stage_fits(
            "synthesizer.embed_timeout_ms",
            Duration::from_millis(self.synthesizer.embed_timeout_ms),
            embedding,
        )?;

        if self.filter.rating_enabled {
            stage_fits(
                "filter.rating_timeout_ms",
                Duration::from_millis(self.filter.rating_timeout_ms),
                self.rating.lookup_budget(),
            )?;
        }
        Ok(())
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
    }
}

fn stage_fits(stage: &str, deadline: Duration, needed: Duration) -> Result<(), ConfigError> {
    if deadline < needed {
        return Err(ConfigError::Invalid(format!(
            "{} allows {:?} but the client may need {:?} to exhaust its retries",
            stage, deadline, needed
        )));
    }
    Ok(())
}
