//! Dataset loading and preprocessing.
//!
//! Reads the movie plots CSV, samples a deterministic subset of rows and turns
//! each row into a [`Document`] ready for embedding.

mod preprocess;
mod sample;
mod table;

pub use preprocess::{create_documents, REQUIRED_COLUMNS};
pub use sample::{load_sample, sample_rows, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED};
pub use table::Table;

use crate::error::{PlotlineError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed metadata attached to every movie document.
///
/// All keys are always present when serialized; missing values are `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub origin: Option<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
}

impl MovieMetadata {
    /// Metadata keys, in schema order.
    pub const KEYS: [&'static str; 5] = ["title", "genre", "origin", "year", "url"];

    /// Metadata as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "genre": self.genre,
            "origin": self.origin,
            "year": self.year,
            "url": self.url,
        })
    }

    /// Display title, falling back to a placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// A movie plot with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    text: String,
    metadata: MovieMetadata,
}

impl Document {
    /// Create a document. The text must contain something other than whitespace.
    pub fn new(text: impl Into<String>, metadata: MovieMetadata) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PlotlineError::Data(format!(
                "Document text is empty (title: {})",
                metadata.display_title()
            )));
        }
        Ok(Self { text, metadata })
    }

    /// Primary content (the plot).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &MovieMetadata {
        &self.metadata
    }

    /// Text with whitespace runs collapsed, trimmed and lower-cased.
    pub fn normalized_text(&self) -> String {
        self.text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Content-derived identifier: hex SHA-256 of the normalized text.
    pub fn content_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized_text().as_bytes());
        hex::encode(hasher.finalize())
    }
}
