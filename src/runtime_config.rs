//! # Runtime Configuration Module
//!
//! Settings that change how requests are validated and where endpoints mount.
//!
//! ## Environment Variables
//!
//! ### `SIGBIND_TRUTHY` / `SIGBIND_FALSY`
//!
//! Comma-separated tokens accepted as `true` / `false` by boolean parameters.
//! Matching is case-sensitive. An empty entry is allowed, so `SIGBIND_FALSY=0,no,`
//! makes the empty string false.
//!
//! Default: `1,true,yes,on` and `0,false,no,off,` (the trailing empty token)
//!
//! ### `SIGBIND_UNKNOWN_FIELDS`
//!
//! `raise` reports request keys the schema does not declare as field failures;
//! `exclude` drops them.
//!
//! Default: `raise`
//!
//! ### `SIGBIND_API_PREFIX`
//!
//! First path segment of every mounted endpoint.
//!
//! Default: `api`
//!
//! ## YAML File
//!
//! The same settings can come from a file; missing keys keep their defaults
//! and the environment overrides the file:
//!
//! ```yaml
//! bool_tokens:
//!   truthy: ["1", "true", "yes", "on"]
//!   falsy: ["0", "false", "no", "off", ""]
//! unknown_fields: exclude
//! api_prefix: api
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sigbind::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Endpoints mount under /{}/", config.api_prefix);
//! ```

use crate::caster::BoolTokens;
use crate::schema::UnknownFields;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::warn;

pub const ENV_TRUTHY: &str = "SIGBIND_TRUTHY";
pub const ENV_FALSY: &str = "SIGBIND_FALSY";
pub const ENV_UNKNOWN_FIELDS: &str = "SIGBIND_UNKNOWN_FIELDS";
pub const ENV_API_PREFIX: &str = "SIGBIND_API_PREFIX";

/// Validation and routing settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bool_tokens: BoolTokens,
    pub unknown_fields: UnknownFields,
    pub api_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bool_tokens: BoolTokens::default(),
            unknown_fields: UnknownFields::default(),
            api_prefix: "api".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the environment. Unparsable values are logged
    /// and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Read a YAML file; keys it omits keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// The file (if any) with environment overrides on top.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from any key/value source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let truthy = lookup(ENV_TRUTHY).map(|v| split_tokens(&v));
        let falsy = lookup(ENV_FALSY).map(|v| split_tokens(&v));
        if truthy.is_some() || falsy.is_some() {
            self.bool_tokens = BoolTokens::new(
                truthy.unwrap_or_else(|| self.bool_tokens.truthy().iter().cloned().collect()),
                falsy.unwrap_or_else(|| self.bool_tokens.falsy().iter().cloned().collect()),
            );
        }

        if let Some(raw) = lookup(ENV_UNKNOWN_FIELDS) {
            match raw.parse() {
                Ok(policy) => self.unknown_fields = policy,
                Err(e) => warn!(variable = ENV_UNKNOWN_FIELDS, value = %raw, error = %e, "Ignoring invalid setting"),
            }
        }

        if let Some(prefix) = lookup(ENV_API_PREFIX) {
            self.api_prefix = prefix.trim().trim_matches('/').to_string();
        }
    }
}

fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(',').map(|t| t.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.bool_tokens.parse("on"), Some(true));
        assert_eq!(config.bool_tokens.parse(""), Some(false));
        assert_eq!(config.unknown_fields, UnknownFields::Raise);
        assert_eq!(config.api_prefix, "api");
    }

    #[test]
    fn environment_overrides() {
        let mut config = RuntimeConfig::default();
        config.apply_overrides(lookup(&[
            (ENV_TRUTHY, "y, si"),
            (ENV_UNKNOWN_FIELDS, "exclude"),
            (ENV_API_PREFIX, "/v1/"),
        ]));
        assert_eq!(config.bool_tokens.parse("si"), Some(true));
        assert_eq!(config.bool_tokens.parse("yes"), None);
        assert_eq!(config.bool_tokens.parse("no"), Some(false));
        assert_eq!(config.unknown_fields, UnknownFields::Exclude);
        assert_eq!(config.api_prefix, "v1");
    }

    #[test]
    fn invalid_policy_keeps_previous() {
        let mut config = RuntimeConfig::default();
        config.apply_overrides(lookup(&[(ENV_UNKNOWN_FIELDS, "sometimes")]));
        assert_eq!(config.unknown_fields, UnknownFields::Raise);
    }

    #[test]
    fn yaml_file_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unknown_fields: exclude\napi_prefix: rpc").unwrap();
        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.unknown_fields, UnknownFields::Exclude);
        assert_eq!(config.api_prefix, "rpc");
        assert_eq!(config.bool_tokens, BoolTokens::default());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
