//! CLI module for Plotline.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Plotline - movie plot search and recommendations
///
/// Samples a movie plot dataset into Postgres with pgvector and answers
/// natural-language searches with language-model recommendations.
#[derive(Parser, Debug)]
#[command(name = "plotline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database if needed and prepare the collection
    Init,

    /// Sample the dataset, embed the plots and store them
    Ingest {
        /// Movie plots CSV (defaults to dataset.path)
        #[arg(long)]
        csv: Option<String>,

        /// Number of rows to sample
        #[arg(short = 'n', long)]
        sample_size: Option<usize>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,

        /// Use ids 1..N instead of content hashes
        #[arg(long)]
        sequential_ids: bool,

        /// Do not create the database first
        #[arg(long)]
        skip_bootstrap: bool,

        /// Replace everything in the collection (cleared once the first batch is embedded)
        #[arg(long)]
        replace: bool,
    },

    /// Find movies and explain why they match
    Query {
        /// What to look for
        query: String,

        /// Number of movies to retrieve
        #[arg(short, long = "top-k")]
        k: Option<usize>,

        /// Output mode (structured, summary)
        #[arg(short, long)]
        mode: Option<String>,

        /// Metadata constraint as key=value (repeatable)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Also write the result to a file, given as --save=PATH (defaults to query.output_file)
        #[arg(short, long, num_args = 0..=1, require_equals = true, default_missing_value = "")]
        save: Option<String>,
    },

    /// Search for similar movies without calling a language model
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long = "top-k")]
        k: Option<usize>,

        /// Metadata constraint as key=value (repeatable)
        #[arg(short, long)]
        filter: Vec<String>,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets omitted)
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}
