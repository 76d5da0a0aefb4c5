//! Dataset acquisition tool.
//!
//! Wraps [`crate::dataset::acquire`] for the agent: the blocking download
//! pipeline runs on a blocking task, and whatever happens (including a
//! credential failure before a client even exists) the observation handed
//! back to the model is the JSON-serialized [`AcquisitionResult`].

use crate::agent::tool::Tool;
use crate::config::KaggleConfig;
use crate::dataset::{self, AcquisitionResult, ErrorStep, KaggleClient, DEFAULT_DOWNLOAD_PATH};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A tool that downloads a Kaggle dataset and reports its CSV schemas.
pub struct FetchDatasetTool {
    config: KaggleConfig,
}

impl FetchDatasetTool {
    pub fn new(config: KaggleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Tool for FetchDatasetTool {
    fn name(&self) -> &str {
        "fetch_dataset"
    }

    fn description(&self) -> &str {
        "Download a Kaggle dataset, extract it locally and report the schema of every CSV file found."
    }

    fn usage(&self) -> &str {
        r#"Pass the dataset URL directly, or JSON: {"kaggle_link": "https://www.kaggle.com/datasets/owner/name", "download_path": "./datasets"}."#
    }

    async fn call(&self, args: &str) -> Result<String> {
        let (link, download_path) = parse_args(args);
        let credentials = self.config.credentials();
        let api_base = self.config.api_base.clone();

        let result = tokio::task::spawn_blocking(move || {
            match KaggleClient::resolve(credentials, api_base) {
                Ok(client) => dataset::acquire(&client, &link, &download_path),
                Err(err) => AcquisitionResult::error(
                    format!("Kaggle authentication failed: {err}"),
                    ErrorStep::Auth,
                    None,
                    Some(PathBuf::from(download_path)),
                ),
            }
        })
        .await?;

        Ok(serde_json::to_string_pretty(&result)?)
    }
}

fn parse_args(args: &str) -> (String, String) {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(args) {
        if let Some(link) = value.get("kaggle_link").and_then(|v| v.as_str()) {
            let path = value
                .get("download_path")
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_DOWNLOAD_PATH);
            return (link.to_string(), path.to_string());
        }
    }
    (args.trim().to_string(), DEFAULT_DOWNLOAD_PATH.to_string())
}
