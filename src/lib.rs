//! Plotline - movie plot search and recommendations
//!
//! Samples a movie plot dataset, embeds each plot, stores the vectors in
//! Postgres with pgvector and answers natural-language searches with
//! language-model written recommendations or summaries.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `data` - CSV loading, sampling and document building
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `bootstrap` - Database creation
//! - `llm` - Chat model access
//! - `query` - Retrieval and formatting
//! - `schema` - Query response types
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use plotline::config::Settings;
//! use plotline::orchestrator::{IngestOptions, Orchestrator};
//! use plotline::vector_store::MetadataFilter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::connect(settings).await?;
//!
//!     let report = orchestrator
//!         .ingest(&IngestOptions::from_settings(orchestrator.settings()))
//!         .await?;
//!     println!("Indexed {} movies", report.documents);
//!
//!     let request = orchestrator.request("a heist that goes wrong", None, None, MetadataFilter::new());
//!     println!("{}", orchestrator.query(&request).await?.to_json()?);
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod data;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod query;
pub mod schema;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PlotlineError, Result};
