//! `datapilot` - an autonomous data-analysis agent for Kaggle datasets
//!
//! This binary provides a CLI for running the full analysis agent or for
//! invoking its individual tools (dataset fetch, web search, Python
//! execution) directly.

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::Style;

use crate::cli::{Cli, Commands};
use datapilot_core::agent::tools::{ExecutePythonTool, FetchDatasetTool, WebSearchTool};
use datapilot_core::agent::Tool;
use datapilot_core::config::Config;

mod cli;
mod logging;
mod runner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    logging::init(cli.verbose || config.verbose);

    match cli.command {
        Commands::Run {
            dataset_link,
            task,
            max_attempts,
        } => {
            let answer = runner::run_task(
                &config,
                cli.endpoint.as_deref(),
                &dataset_link,
                task.as_deref(),
                max_attempts,
            )
            .await?;

            let heading = Style::new().green().bold();
            println!("{}", heading.apply_to("=== Final Answer ==="));
            println!("{answer}");
        }

        Commands::Fetch {
            link,
            download_path,
        } => {
            let tool = FetchDatasetTool::new(config.kaggle.clone());
            let args = serde_json::json!({
                "kaggle_link": link,
                "download_path": download_path,
            })
            .to_string();
            println!("{}", tool.call(&args).await?);
        }

        Commands::Search { query, k } => {
            let tool = WebSearchTool::new(config.web_search.clone());
            let args = serde_json::json!({"query": query, "k": k}).to_string();
            println!("{}", tool.call(&args).await?);
        }

        Commands::Exec { file, code } => {
            let source = match (file, code) {
                (Some(path), None) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(code)) => code,
                _ => bail!("Provide either a Python file path or --code"),
            };
            let tool = ExecutePythonTool::new(config.executor.clone());
            let args = serde_json::json!({"code": source}).to_string();
            println!("{}", tool.call(&args).await?);
        }

        Commands::Endpoints => {
            let bold = Style::new().bold();
            for endpoint in &config.endpoints {
                let marker = if endpoint.name == config.default_endpoint {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {} ({}) {} [{}]",
                    bold.apply_to(&endpoint.name),
                    endpoint.provider,
                    endpoint.base_url,
                    endpoint.model
                );
            }
        }
    }

    Ok(())
}
