//! Runtime configuration for Snippetly clients.
//!
//! Values come from the process environment (or any lookup function in tests).
//! The remote service is optional: without `SUPABASE_URL` the client works
//! purely offline and sync is unavailable.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_TTL;
use crate::queue::DEFAULT_QUEUE_KEY;
use crate::remote::{RemoteResult, SupabaseDataClient};
use crate::search::SearchCache;
use crate::sync::DEFAULT_SETTLE_DELAY;
use crate::util::{is_http_url, normalize_text_option};

const MAX_SETTLE_MS: u64 = 60_000;
const MAX_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Supabase project credentials
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
}

impl RemoteConfig {
    /// Build a data client; the user access token is used when present
    pub fn client(&self) -> RemoteResult<SupabaseDataClient> {
        let client = SupabaseDataClient::new(&self.url, self.anon_key.clone())?;
        Ok(match &self.access_token {
            Some(token) => client.with_access_token(token.clone()),
            None => client,
        })
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetlyConfig {
    pub remote: Option<RemoteConfig>,
    pub queue_key: String,
    pub sync_settle_delay: Duration,
    pub cache_ttl: Duration,
    /// Explicit store location; callers fall back to their platform data dir
    pub store_path: Option<PathBuf>,
}

impl Default for SnippetlyConfig {
    fn default() -> Self {
        Self {
            remote: None,
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            sync_settle_delay: DEFAULT_SETTLE_DELAY,
            cache_ttl: DEFAULT_TTL,
            store_path: None,
        }
    }
}

impl SnippetlyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let remote = parse_remote_config(&lookup)?;

        let queue_key = value_or_default(&lookup, "SNIPPETLY_QUEUE_KEY", DEFAULT_QUEUE_KEY);

        let settle_ms = parse_bounded(
            &lookup,
            "SNIPPETLY_SYNC_SETTLE_MS",
            duration_millis(DEFAULT_SETTLE_DELAY),
            0,
            MAX_SETTLE_MS,
        )?;
        let cache_ttl_secs = parse_bounded(
            &lookup,
            "SNIPPETLY_CACHE_TTL_SECS",
            DEFAULT_TTL.as_secs(),
            1,
            MAX_CACHE_TTL_SECS,
        )?;

        let store_path = optional_trimmed(&lookup, "SNIPPETLY_STORE_PATH").map(PathBuf::from);

        Ok(Self {
            remote,
            queue_key,
            sync_settle_delay: Duration::from_millis(settle_ms),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            store_path,
        })
    }

    /// Remote credentials, or an error naming the first missing variable
    pub fn require_remote(&self) -> Result<&RemoteConfig, ConfigError> {
        self.remote
            .as_ref()
            .ok_or(ConfigError::MissingVar("SUPABASE_URL"))
    }

    /// Search cache using the configured TTL
    pub fn search_cache(&self) -> SearchCache {
        SearchCache::new(self.cache_ttl)
    }
}

fn parse_remote_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<RemoteConfig>, ConfigError> {
    let Some(url) = optional_trimmed(&lookup, "SUPABASE_URL") else {
        return Ok(None);
    };
    if !is_http_url(&url) {
        return Err(ConfigError::Invalid(
            "SUPABASE_URL must start with http:// or https://".to_string(),
        ));
    }
    let anon_key = required_trimmed(&lookup, "SUPABASE_ANON_KEY")?;
    let access_token = optional_trimmed(&lookup, "SUPABASE_ACCESS_TOKEN");

    Ok(Some(RemoteConfig {
        url: url.trim_end_matches('/').to_string(),
        anon_key,
        access_token,
    }))
}

fn parse_bounded(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be an integer between {min} and {max}"))
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<SnippetlyConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        SnippetlyConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_yields_offline_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, SnippetlyConfig::default());
        assert!(config.remote.is_none());
        assert!(matches!(
            config.require_remote(),
            Err(ConfigError::MissingVar("SUPABASE_URL"))
        ));
    }

    #[test]
    fn supabase_url_requires_anon_key() {
        let err = config_from(&[("SUPABASE_URL", "https://project.supabase.co")]).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn supabase_url_must_be_http() {
        let err = config_from(&[
            ("SUPABASE_URL", "project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn overrides_are_parsed_and_trimmed() {
        let config = config_from(&[
            ("SUPABASE_URL", " https://project.supabase.co/ "),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SNIPPETLY_QUEUE_KEY", "work_queue"),
            ("SNIPPETLY_SYNC_SETTLE_MS", "0"),
            ("SNIPPETLY_CACHE_TTL_SECS", "60"),
            ("SNIPPETLY_STORE_PATH", "/tmp/snippetly.db"),
        ])
        .unwrap();

        let remote = config.require_remote().unwrap();
        assert_eq!(remote.url, "https://project.supabase.co");
        assert_eq!(remote.access_token, None);
        assert_eq!(config.queue_key, "work_queue");
        assert_eq!(config.sync_settle_delay, Duration::ZERO);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/snippetly.db")));
        assert!(config.search_cache().get("anything").is_none());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(config_from(&[("SNIPPETLY_SYNC_SETTLE_MS", "60001")]).is_err());
        assert!(config_from(&[("SNIPPETLY_CACHE_TTL_SECS", "0")]).is_err());
        assert!(config_from(&[("SNIPPETLY_CACHE_TTL_SECS", "soon")]).is_err());
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "sensitive-anon-key"),
            ("SUPABASE_ACCESS_TOKEN", "sensitive-user-token"),
        ])
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-anon-key"));
        assert!(!debug_output.contains("sensitive-user-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn remote_config_builds_rest_client() {
        let remote = RemoteConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            access_token: Some("jwt".to_string()),
        };
        let client = remote.client().unwrap();
        assert_eq!(client.rest_url(), "https://project.supabase.co/rest/v1");
    }
}
