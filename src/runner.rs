//! Task runner.
//!
//! Builds the agent with its three tools, submits the analysis task and
//! re-invokes the agent a bounded number of times on failure. Retrying is a
//! caller concern: the tools themselves never raise, so an error here means
//! the loop itself went wrong (LLM failure, iteration cap, repeated calls).

use anyhow::{Context, Result};
use datapilot_core::agent::tools::{ExecutePythonTool, FetchDatasetTool, WebSearchTool};
use datapilot_core::agent::{Agent, Tool};
use datapilot_core::config::Config;
use datapilot_core::llm::{ChatMessage, LlmClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Default analysis task, mirroring the stock-market demo.
pub const DEFAULT_TASK: &str = "Extract the data from the Kaggle dataset and generate 1-3 \
graphs that highlight the most important trends. Save the generated Python code and the \
graphs in a ./graphs directory. Generate a summary text file explaining your graph choices \
and findings.";

const SYSTEM_PROMPT_PREFIX: &str = "You are an autonomous data-analysis agent. You download \
datasets, inspect their schemas, write Python code to analyze them and produce charts, and \
summarize your findings. Prefer the provided tools over guessing; always inspect a dataset's \
schema before writing analysis code against it.";

/// Run the analysis task to completion and return the agent's final answer.
pub async fn run_task(
    config: &Config,
    endpoint: Option<&str>,
    dataset_link: &str,
    task: Option<&str>,
    max_attempts: Option<usize>,
) -> Result<String> {
    let endpoint = config.get_endpoint(endpoint)?;
    info!(endpoint = %endpoint.name, model = %endpoint.model, "starting analysis task");

    let client = Arc::new(LlmClient::new(endpoint.to_llm_config()?)?);

    let payload = serde_json::json!({
        "task": task.unwrap_or(DEFAULT_TASK),
        "dataset_link": dataset_link,
    })
    .to_string();

    let max_attempts = max_attempts.unwrap_or(config.agent.max_attempts).max(1);

    let mut attempt = 0;
    loop {
        attempt += 1;

        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(WebSearchTool::new(config.web_search.clone())),
            Box::new(FetchDatasetTool::new(config.kaggle.clone())),
            Box::new(ExecutePythonTool::new(config.executor.clone())),
        ];
        let mut agent = Agent::with_max_iterations(
            client.clone(),
            tools,
            SYSTEM_PROMPT_PREFIX.to_string(),
            config.agent.max_iterations,
        );

        match agent.run(vec![ChatMessage::user(payload.clone())]).await {
            Ok((answer, usage)) => {
                info!(%usage, "task complete");
                return Ok(answer);
            }
            Err(err) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "attempt failed, retrying");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("task failed after {attempt} attempt(s)"));
            }
        }
    }
}
