use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variables that predate the `TICKETLENS_` prefix and still
/// carry a session token override, checked in order.
const LEGACY_SESSION_VARS: [&str; 2] = ["ZNUNY_SESSION_ID", "SESSION_ID"];

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TICKETLENS_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    apply_legacy_env(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Fill the session override from legacy variables when the file left it
/// unset. A blank token counts as unset.
fn apply_legacy_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    config.znuny.session_id = config
        .znuny
        .session_id
        .take()
        .filter(|s| !s.trim().is_empty());
    if config.znuny.session_id.is_some() {
        return;
    }
    config.znuny.session_id = LEGACY_SESSION_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty());
}
