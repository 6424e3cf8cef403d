//! CLI command implementations.

mod config;
mod ingest;
mod init;
mod query;
mod search;
mod serve;

pub use config::run_config;
pub use ingest::{run_ingest, IngestArgs};
pub use init::run_init;
pub use query::run_query;
pub use search::run_search;
pub use serve::run_serve;
