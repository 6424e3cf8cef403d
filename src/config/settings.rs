//! Configuration settings for Plotline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the OpenAI API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding an alternate OpenAI-compatible base URL.
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
/// Environment variable holding the Postgres connection string.
pub const ENV_DB_CONNECTION: &str = "DB_CONNECTION";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub embedding: EmbeddingSettings,
    pub database: DatabaseSettings,
    pub vector_store: VectorStoreSettings,
    pub dataset: DatasetSettings,
    pub query: QuerySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// OpenAI API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Normally supplied through `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Alternate API base URL (OpenAI-compatible servers).
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_secs: 300,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Maximum inputs per embeddings request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string. Normally supplied through `DB_CONNECTION`.
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// Database that bootstrap ensures exists.
    pub name: String,
    /// Administrative database used while bootstrapping.
    pub admin_database: String,
    /// Connection pool size for the vector store.
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            name: "movies".to_string(),
            admin_database: "postgres".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    /// The configured connection string, or a config error.
    pub fn connection_url(&self) -> crate::error::Result<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                crate::error::PlotlineError::Config(
                    "DB_CONNECTION not set. Set it in your environment or .env file".to_string(),
                )
            })
    }

    /// Connection string pointing at the administrative database on the same server.
    pub fn admin_url(&self) -> crate::error::Result<String> {
        let mut url = url::Url::parse(self.connection_url()?).map_err(|e| {
            crate::error::PlotlineError::Config(format!("Invalid DB_CONNECTION: {}", e))
        })?;
        url.set_path(&format!("/{}", self.admin_database));
        Ok(url.to_string())
    }
}

/// How stored record ids are derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// SHA-256 of the normalized document text; re-ingestion is idempotent.
    #[default]
    ContentHash,
    /// "1".."N" by position in the batch.
    Sequential,
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "content_hash" | "content-hash" | "hash" => Ok(IdStrategy::ContentHash),
            "sequential" => Ok(IdStrategy::Sequential),
            _ => Err(format!("Unknown id strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdStrategy::ContentHash => write!(f, "content_hash"),
            IdStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Collection holding the movie embeddings.
    pub collection: String,
    /// Record id derivation.
    pub id_strategy: IdStrategy,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            collection: "movies".to_string(),
            id_strategy: IdStrategy::ContentHash,
        }
    }
}

/// Dataset ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Path to the movie plots CSV.
    pub path: String,
    /// Number of rows sampled for ingestion.
    pub sample_size: usize,
    /// Seed for row sampling.
    pub seed: u64,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: "wiki_movie_plots_deduped.csv".to_string(),
            sample_size: 1000,
            seed: 42,
        }
    }
}

/// What the query pipeline produces from retrieved documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One schema-constrained recommendation per retrieved movie.
    #[default]
    Structured,
    /// One free-text summary across all retrieved movies.
    Summary,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "recommend" => Ok(OutputMode::Structured),
            "summary" | "summarize" => Ok(OutputMode::Summary),
            _ => Err(format!("Unknown output mode: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Structured => write!(f, "structured"),
            OutputMode::Summary => write!(f, "summary"),
        }
    }
}

/// Query pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Number of movies retrieved per query.
    pub k: usize,
    /// Default output mode.
    pub mode: OutputMode,
    /// Model producing structured recommendations.
    pub recommend_model: String,
    /// Model producing summaries.
    pub summary_model: String,
    /// Sampling temperature for both models.
    pub temperature: f32,
    /// Where `--save` writes the query result.
    pub output_file: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            k: 5,
            mode: OutputMode::Structured,
            recommend_model: "gpt-4.1-nano".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            output_file: "query_result.json".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default file and the process environment.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path (or the default location) and the
    /// process environment.
    ///
    /// This is the only place Plotline reads environment variables.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let mut settings = Self::read_file(path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Read the TOML settings file, falling back to defaults when it is absent.
    pub fn read_file(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Apply environment overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_OPENAI_API_KEY) {
            self.openai.api_key = Some(key);
        }
        if let Some(base_url) = non_empty(ENV_OPENAI_BASE_URL) {
            self.openai.base_url = Some(base_url);
        }
        if let Some(url) = non_empty(ENV_DB_CONNECTION) {
            self.database.url = Some(url);
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PlotlineError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plotline")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded dataset path.
    pub fn dataset_path(&self) -> PathBuf {
        Self::expand_path(&self.dataset.path)
    }
}
