//! Ticket diagnosis.
//!
//! The relay only sees the [`DiagnosisOracle`] trait; [`create_oracle`]
//! builds the LLM-backed implementation for the configured provider.

pub mod llm;
mod llm_oracle;
mod types;

use std::sync::Arc;
use std::time::Duration;

pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError,
    LlmUsage, OllamaClient,
};
pub use llm_oracle::{parse_verdict, LlmOracle};
pub use types::*;

use crate::config::{OracleConfig, OracleProvider};

/// Create a diagnosis oracle from configuration.
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<dyn DiagnosisOracle>, OracleError> {
    let timeout = Duration::from_secs(config.timeout_secs as u64);
    let api_key = || {
        config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OracleError::NotConfigured(format!(
                    "{} requires an API key",
                    config.provider.as_str()
                ))
            })
    };

    let client: Arc<dyn LlmClient> = match config.provider {
        OracleProvider::Anthropic => {
            let mut client = AnthropicClient::new(api_key()?, &config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
        OracleProvider::Gemini => {
            let mut client = GeminiClient::new(api_key()?, &config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
        OracleProvider::Ollama => {
            let mut client = OllamaClient::new(&config.model).with_timeout(timeout);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(client)
        }
    };

    Ok(Arc::new(
        LlmOracle::new(client).with_max_tokens(config.max_tokens),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_config(provider: OracleProvider, api_key: Option<&str>) -> OracleConfig {
        OracleConfig {
            provider,
            model: "test-model".to_string(),
            api_key: api_key.map(str::to_string),
            api_base: None,
            timeout_secs: 5,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_create_hosted_oracle() {
        let oracle = create_oracle(&oracle_config(OracleProvider::Gemini, Some("key"))).unwrap();
        assert_eq!(oracle.name(), "gemini");

        let oracle =
            create_oracle(&oracle_config(OracleProvider::Anthropic, Some("key"))).unwrap();
        assert_eq!(oracle.name(), "anthropic");
    }

    #[test]
    fn test_create_ollama_without_key() {
        let oracle = create_oracle(&oracle_config(OracleProvider::Ollama, None)).unwrap();
        assert_eq!(oracle.name(), "ollama");
    }

    #[test]
    fn test_hosted_oracle_requires_key() {
        let result = create_oracle(&oracle_config(OracleProvider::Gemini, Some("")));
        assert!(matches!(result, Err(OracleError::NotConfigured(_))));
    }
}
