//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// An autonomous data-analysis agent for Kaggle datasets
///
/// Wires an LLM to three tools (dataset acquisition, web search and local
/// Python execution) to download a dataset, analyze it and chart the
/// findings. Individual tools can also be invoked directly.
#[derive(Parser, Debug)]
#[command(name = "datapilot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Endpoint name to use (overrides the configured default)
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// Path to a configuration file (overrides the default lookup)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log intermediate steps (thoughts, observations)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full analysis agent against a dataset
    Run {
        /// URL of the Kaggle dataset to analyze
        #[arg(long, default_value = "https://www.kaggle.com/datasets/jacksoncrow/stock-market-dataset")]
        dataset_link: String,

        /// The analysis task for the agent (a sensible default is built in)
        #[arg(long)]
        task: Option<String>,

        /// Times a failed run is re-submitted before giving up
        #[arg(long)]
        max_attempts: Option<usize>,
    },

    /// Download a dataset and print its structured acquisition report
    Fetch {
        /// URL of the Kaggle dataset
        link: String,

        /// Local directory the dataset is unpacked into
        #[arg(long, default_value = "./datasets")]
        download_path: String,
    },

    /// Run a one-shot web search and print the JSON result
    Search {
        /// The search query
        query: String,

        /// Number of results to return
        #[arg(short, default_value_t = 1)]
        k: usize,
    },

    /// Execute a Python file (or inline code) and print the structured result
    Exec {
        /// Path to a Python file to execute
        file: Option<PathBuf>,

        /// Inline code to execute instead of a file
        #[arg(short, long)]
        code: Option<String>,
    },

    /// List available endpoints
    Endpoints,
}
