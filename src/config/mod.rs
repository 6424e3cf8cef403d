//! Configuration module for Plotline.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RecommendPrompts, SummarizePrompts};
pub use settings::{
    DatabaseSettings, DatasetSettings, EmbeddingSettings, GeneralSettings, IdStrategy,
    OpenAISettings, OutputMode, PromptSettings, QuerySettings, Settings, VectorStoreSettings,
    ENV_DB_CONNECTION, ENV_OPENAI_API_KEY, ENV_OPENAI_BASE_URL,
};
