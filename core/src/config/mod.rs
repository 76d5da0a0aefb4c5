//! Configuration management
//!
//! YAML configuration with multiple LLM endpoints and per-tool settings.
//! Secrets can be left out of the file; the tools fall back to the usual
//! environment variables (`GEMINI_API_KEY`, `GOOGLE_API_KEY`/`GOOGLE_CSE_ID`,
//! `KAGGLE_USERNAME`/`KAGGLE_KEY`, `VENV_PYTHON`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub mod endpoints;

pub use endpoints::EndpointConfig;

use crate::dataset::KaggleCredentials;

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "datapilot.yaml";

/// Default config directory name
const CONFIG_DIR_NAME: &str = "datapilot";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default endpoint to use when none specified
    #[serde(default = "default_endpoint")]
    pub default_endpoint: String,

    /// List of configured LLM endpoints
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,

    /// Web search configuration
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Kaggle credentials and API location
    #[serde(default)]
    pub kaggle: KaggleConfig,

    /// Python execution configuration
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Whether to log intermediate steps (thoughts/actions) verbosely
    #[serde(default)]
    pub verbose: bool,
}

fn default_endpoint() -> String {
    "gemini".to_string()
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::gemini_default(),
        EndpointConfig::openai_default(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_endpoint: default_endpoint(),
            endpoints: default_endpoints(),
            web_search: WebSearchConfig::default(),
            kaggle: KaggleConfig::default(),
            executor: ExecutorConfig::default(),
            agent: AgentConfig::default(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration: `DATAPILOT_CONFIG` override, then the platform
    /// config dir, then built-in defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var("DATAPILOT_CONFIG") {
            return Self::load_from_file(&path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Get endpoint configuration by name
    pub fn get_endpoint(&self, name: Option<&str>) -> Result<&EndpointConfig> {
        let name = name.unwrap_or(&self.default_endpoint);
        self.endpoints
            .iter()
            .find(|e| e.name == name)
            .with_context(|| format!("Endpoint '{}' not found in configuration", name))
    }
}

/// Web search configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebSearchConfig {
    /// Whether web search is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Google API key; falls back to GOOGLE_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom Search Engine id; falls back to GOOGLE_CSE_ID
    #[serde(default)]
    pub cse_id: Option<String>,
    /// Results returned when the model does not ask for a count
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            cse_id: None,
            max_results: default_max_results(),
        }
    }
}

impl WebSearchConfig {
    pub fn api_key(&self) -> Option<String> {
        non_empty(self.api_key.clone()).or_else(|| env::var("GOOGLE_API_KEY").ok())
    }

    pub fn cse_id(&self) -> Option<String> {
        non_empty(self.cse_id.clone()).or_else(|| env::var("GOOGLE_CSE_ID").ok())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    1
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Kaggle credentials and API location
///
/// All fields are optional: anything missing here is resolved from the
/// environment at client construction time.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct KaggleConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    /// Override of the API base URL (used by tests; leave unset in production)
    #[serde(default)]
    pub api_base: Option<String>,
}

impl KaggleConfig {
    /// Explicit credentials, when both halves are present
    pub fn credentials(&self) -> Option<KaggleCredentials> {
        match (&self.username, &self.key) {
            (Some(username), Some(key)) if !username.is_empty() && !key.is_empty() => {
                Some(KaggleCredentials::new(username.clone(), key.clone()))
            }
            _ => None,
        }
    }
}

/// Python execution configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Interpreter to run generated code with; falls back to VENV_PYTHON,
    /// then plain `python3`
    #[serde(default)]
    pub python_bin: Option<String>,
    /// Wall-clock limit for a single execution
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python_bin: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ExecutorConfig {
    pub fn python_bin(&self) -> String {
        non_empty(self.python_bin.clone())
            .or_else(|| env::var("VENV_PYTHON").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "python3".to_string())
    }
}

fn default_timeout_secs() -> u64 {
    120
}

/// Agent configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Maximum number of iterations for the agent loop
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Maximum times a failed task run is re-submitted
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

fn default_max_attempts() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn default_config_has_a_usable_endpoint() {
        let config = Config::default();
        let endpoint = config.get_endpoint(None).expect("default endpoint");
        assert_eq!(endpoint.name, "gemini");
        assert_eq!(config.agent.max_attempts, 3);
        assert_eq!(config.executor.timeout_secs, 120);
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let config = Config::default();
        assert!(config.get_endpoint(Some("missing")).is_err());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "\
default_endpoint: local
endpoints:
  - name: local
    provider: ollama
    base_url: http://localhost:11434/v1
    model: llama3.2
kaggle:
  username: someone
  key: s3cret
";
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write");

        let config = Config::load_from_file(file.path()).expect("load");
        assert_eq!(config.default_endpoint, "local");
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.get_endpoint(None).expect("local").provider, "ollama");
        assert!(config.web_search.enabled);
        assert_eq!(config.agent.max_iterations, 10);

        let credentials = config.kaggle.credentials().expect("credentials");
        assert_eq!(credentials.username, "someone");
        assert_eq!(credentials.key, "s3cret");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(Config::load_from_file("/nonexistent/datapilot.yaml").is_err());
    }

    #[test]
    fn blank_credential_halves_do_not_count() {
        let config = KaggleConfig {
            username: Some("user".to_string()),
            key: Some(String::new()),
            api_base: None,
        };
        assert!(config.credentials().is_none());
    }

    #[test]
    fn executor_prefers_the_configured_interpreter() {
        let config = ExecutorConfig {
            python_bin: Some("/opt/venv/bin/python".to_string()),
            timeout_secs: 30,
        };
        assert_eq!(config.python_bin(), "/opt/venv/bin/python");
    }
}
