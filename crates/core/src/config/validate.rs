use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Backend URL is an http(s) URL
/// - Login credentials exist unless a session token is supplied
/// - Session TTL and timeouts are non-zero
/// - Hosted oracle providers have an API key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let base_url = config.znuny.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "znuny.base_url must be an http(s) URL, got '{}'",
            base_url
        )));
    }

    let has_session_override = config
        .znuny
        .session_id
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    if !has_session_override
        && (config.znuny.user.is_empty() || config.znuny.password.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "znuny.user and znuny.password are required when no session_id is supplied"
                .to_string(),
        ));
    }

    if config.znuny.session_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "znuny.session_ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.znuny.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "znuny.timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(oracle) = &config.oracle {
        if oracle.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "oracle.model cannot be empty".to_string(),
            ));
        }
        let has_key = oracle.api_key.as_ref().is_some_and(|k| !k.is_empty());
        if oracle.provider.requires_api_key() && !has_key {
            return Err(ConfigError::ValidationError(format!(
                "oracle.api_key is required for provider '{}'",
                oracle.provider.as_str()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OracleConfig, OracleProvider};

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.znuny.user = "agent".to_string();
        config.znuny.password = "secret".to_string();
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_bad_base_url_fails() {
        let mut config = valid_config();
        config.znuny.base_url = "localhost:8080".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_missing_credentials_fails() {
        let mut config = valid_config();
        config.znuny.password.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_session_override_allows_missing_credentials() {
        let mut config = Config::default();
        config.znuny.session_id = Some("token".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_blank_session_override_still_needs_credentials() {
        let mut config = Config::default();
        config.znuny.session_id = Some(String::new());
        assert!(validate_config(&config).is_err());

        config.znuny.session_id = Some("   ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_ttl_fails() {
        let mut config = valid_config();
        config.znuny.session_ttl_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_hosted_oracle_without_key_fails() {
        let mut config = valid_config();
        config.oracle = Some(OracleConfig {
            provider: OracleProvider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            api_base: None,
            timeout_secs: 30,
            max_tokens: 1024,
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_ollama_without_key_passes() {
        let mut config = valid_config();
        config.oracle = Some(OracleConfig {
            provider: OracleProvider::Ollama,
            model: "llama3".to_string(),
            api_key: None,
            api_base: None,
            timeout_secs: 30,
            max_tokens: 1024,
        });
        assert!(validate_config(&config).is_ok());
    }
}
