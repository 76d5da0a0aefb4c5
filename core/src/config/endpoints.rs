//! LLM endpoint configuration
//!
//! Defines the structure for LLM endpoints: Google Gemini or any
//! OpenAI-compatible API (OpenAI, Ollama, LM Studio, local models).

use crate::llm::{LlmConfig, LlmProvider};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for an LLM endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Unique name for this endpoint (used for selection)
    pub name: String,

    /// Provider family: "gemini" or any OpenAI-compatible alias
    /// ("openai", "ollama", "lmstudio", "local")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the API endpoint (including /v1 suffix for OpenAI-compatible)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier to use
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for authentication
    ///
    /// Use "none" or empty string to fall back to the environment
    /// (GEMINI_API_KEY/GOOGLE_API_KEY for Gemini, OPENAI_API_KEY otherwise).
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_api_key() -> String {
    "none".to_string()
}

impl EndpointConfig {
    /// Get the API key, falling back to provider-appropriate environment variables
    pub fn get_api_key(&self) -> Option<String> {
        if self.api_key != "none" && !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }

        let candidates: &[&str] = match self.provider.as_str() {
            "gemini" | "google" | "google-ai" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            _ => &["OPENAI_API_KEY"],
        };
        for var in candidates {
            if let Ok(key) = env::var(var) {
                if !key.is_empty() {
                    return Some(key);
                }
            }
        }

        // Local models run without auth
        None
    }

    /// Translate into the client-level configuration
    pub fn to_llm_config(&self) -> Result<LlmConfig> {
        let provider: LlmProvider = self.provider.parse().map_err(|e| anyhow!("{e}"))?;
        Ok(LlmConfig::new(
            provider,
            self.base_url.clone(),
            self.model.clone(),
            self.get_api_key(),
        ))
    }

    /// Create the default Gemini configuration
    pub fn gemini_default() -> Self {
        Self {
            name: "gemini".to_string(),
            provider: "gemini".to_string(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: "none".to_string(),
        }
    }

    /// Create the default OpenAI configuration
    pub fn openai_default() -> Self {
        Self {
            name: "openai".to_string(),
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: "none".to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::gemini_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_config_defaults() {
        let endpoint = EndpointConfig::default();
        assert_eq!(endpoint.name, "gemini");
        assert_eq!(endpoint.provider, "gemini");
        assert!(endpoint.base_url.contains("generativelanguage"));
        assert_eq!(endpoint.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_get_api_key_from_config() {
        let endpoint = EndpointConfig {
            api_key: "test-key-123".to_string(),
            ..EndpointConfig::gemini_default()
        };
        assert_eq!(endpoint.get_api_key().as_deref(), Some("test-key-123"));
    }

    #[test]
    fn test_get_api_key_env_fallback() {
        env::set_var("GEMINI_API_KEY", "env-key-456");

        let endpoint = EndpointConfig::gemini_default();
        assert_eq!(endpoint.get_api_key().as_deref(), Some("env-key-456"));

        env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    fn test_to_llm_config() {
        let endpoint = EndpointConfig {
            api_key: "key".to_string(),
            ..EndpointConfig::openai_default()
        };
        let config = endpoint.to_llm_config().expect("config");
        assert_eq!(config.provider, LlmProvider::OpenAiCompatible);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_key.as_deref(), Some("key"));

        let bad = EndpointConfig {
            provider: "carrier-pigeon".to_string(),
            ..EndpointConfig::default()
        };
        assert!(bad.to_llm_config().is_err());
    }

    #[test]
    fn test_yaml_deserialization_fills_defaults() {
        let yaml = "name: local\nprovider: ollama\nbase_url: http://localhost:11434/v1\nmodel: llama3.2\n";
        let endpoint: EndpointConfig = serde_yml::from_str(yaml).expect("parse");
        assert_eq!(endpoint.name, "local");
        assert_eq!(endpoint.api_key, "none");
    }
}
