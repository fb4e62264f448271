//! Process configuration, loaded once at startup.
//!
//! Values come from the environment, optionally seeded from a `.env` file.
//! Missing API credentials are a startup failure, never a per-request one.

use crate::acquisition::custom_search::{DEFAULT_ENDPOINT, MAX_RESULTS};
use crate::acquisition::HarvestProfile;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default REST port.
pub const DEFAULT_PORT: u16 = 3000;

/// Read-only runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub engine_id: String,
    pub database_path: PathBuf,
    pub port: u16,
    pub search_endpoint: String,
    pub result_cap: u32,
    pub api_timeout: Duration,
    pub request_deadline: Duration,
    pub browser_enabled: bool,
    pub chromium_path: Option<PathBuf>,
    pub profile: HarvestProfile,
    pub screenshot_dir: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment after applying `.env`, if present.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;
        let engine_id = get("GOOGLE_CX").ok_or(ConfigError::Missing("GOOGLE_CX"))?;

        let database_path = get("SERP_DATABASE_PATH")
            .or_else(|| {
                get("DATABASE_URL").map(|url| {
                    url.strip_prefix("sqlite://")
                        .or_else(|| url.strip_prefix("sqlite:"))
                        .unwrap_or(&url)
                        .to_string()
                })
            })
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let profile = match get("SERP_PROFILE_FILE") {
            Some(path) => HarvestProfile::from_file(&PathBuf::from(path))?,
            None => HarvestProfile::default(),
        };

        Ok(Self {
            api_key,
            engine_id,
            database_path,
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            search_endpoint: get("SERP_SEARCH_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            result_cap: parse_or(get("SERP_RESULT_CAP"), "SERP_RESULT_CAP", MAX_RESULTS)?,
            api_timeout: Duration::from_millis(parse_or(
                get("SERP_API_TIMEOUT_MS"),
                "SERP_API_TIMEOUT_MS",
                15_000,
            )?),
            request_deadline: Duration::from_millis(parse_or(
                get("SERP_REQUEST_DEADLINE_MS"),
                "SERP_REQUEST_DEADLINE_MS",
                120_000,
            )?),
            browser_enabled: parse_flag(get("SERP_BROWSER"), "SERP_BROWSER", true)?,
            chromium_path: get("SERP_CHROMIUM_PATH").map(PathBuf::from),
            profile,
            screenshot_dir: get("SERP_SCREENSHOT_DIR").map(PathBuf::from),
        })
    }
}

/// `~/.serp-harvest/results.db`, or under `/tmp` without a home directory.
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".serp-harvest")
        .join("results.db")
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("{v:?}: {e}"),
        }),
    }
}

fn parse_flag(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            message: format!("{other:?} is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDS: [(&str, &str); 2] = [("GOOGLE_API_KEY", "key"), ("GOOGLE_CX", "cx")];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&CREDS)).unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.engine_id, "cx");
        assert_eq!(config.port, 3000);
        assert_eq!(config.result_cap, 10);
        assert_eq!(config.search_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_timeout, Duration::from_secs(15));
        assert!(config.browser_enabled);
        assert!(config.screenshot_dir.is_none());
        assert!(config.database_path.ends_with("results.db"));
    }

    #[test]
    fn test_missing_credentials_fail() {
        let err = Config::from_lookup(lookup(&[("GOOGLE_CX", "cx")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_API_KEY")));

        let err = Config::from_lookup(lookup(&[("GOOGLE_API_KEY", "key"), ("GOOGLE_CX", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_CX")));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = CREDS.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("SERP_BROWSER", "off"),
            ("DATABASE_URL", "sqlite:///var/lib/serp/results.db"),
            ("SERP_SCREENSHOT_DIR", "/tmp/shots"),
            ("SERP_REQUEST_DEADLINE_MS", "5000"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.browser_enabled);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/serp/results.db"));
        assert_eq!(config.screenshot_dir, Some(PathBuf::from("/tmp/shots")));
        assert_eq!(config.request_deadline, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let mut pairs = CREDS.to_vec();
        pairs.push(("SERP_BROWSER", "maybe"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_unreadable_profile_file_fails() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("SERP_PROFILE_FILE", "/nonexistent/profile.json"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Profile { .. }));
    }
}
