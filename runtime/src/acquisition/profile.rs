//! Harvest profile: the markup-dependent knobs of the browser tier.
//!
//! Engine markup drifts, so selectors, consent labels and challenge markers
//! are data rather than code. A JSON file can override any subset of the
//! built-in defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Selectors, labels and bounded waits for one search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestProfile {
    /// Result page URL; the keyword is appended as the `q` parameter.
    pub engine_url: String,
    /// Elements that may carry a consent label.
    pub consent_scope: String,
    /// Accepted consent labels, matched case-insensitively.
    pub consent_labels: Vec<String>,
    /// Any match means a bot challenge is being shown.
    pub block_markers: Vec<String>,
    /// Any match means results have rendered.
    pub ready_markers: Vec<String>,
    /// Anchors inside result containers.
    pub result_selectors: Vec<String>,
    /// Links whose host contains one of these are self-referential.
    pub excluded_host_fragments: Vec<String>,
    /// Links on the engine or page host whose path starts with one of these
    /// are in-page search links.
    pub excluded_path_prefixes: Vec<String>,
    pub navigation_timeout_ms: u64,
    pub consent_timeout_ms: u64,
    pub results_timeout_ms: u64,
    /// Interval between polls while waiting for result markers.
    pub poll_interval_ms: u64,
    pub screenshot_timeout_ms: u64,
}

impl Default for HarvestProfile {
    fn default() -> Self {
        Self {
            engine_url: "https://www.google.com/search".to_string(),
            consent_scope: "button, div[role='button'], input[type='submit']".to_string(),
            consent_labels: [
                "Accept all",
                "I agree",
                "Accept",
                "Alle akzeptieren",
                "Tout accepter",
                "Aceptar todo",
                "Accetta tutto",
                "Alles accepteren",
                "Aceitar tudo",
                "Zaakceptuj wszystko",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            block_markers: vec![
                "form#captcha-form".to_string(),
                "#captcha-form".to_string(),
                "div#recaptcha".to_string(),
            ],
            ready_markers: vec!["#search".to_string(), "#rso".to_string()],
            result_selectors: vec![
                "div.g a[href]".to_string(),
                "div.yuRUbf a[href]".to_string(),
                "#rso a[jsname][href]".to_string(),
            ],
            excluded_host_fragments: vec!["google.".to_string(), "gstatic.com".to_string()],
            excluded_path_prefixes: vec!["/search".to_string()],
            navigation_timeout_ms: 30_000,
            consent_timeout_ms: 15_000,
            results_timeout_ms: 15_000,
            poll_interval_ms: 250,
            screenshot_timeout_ms: 10_000,
        }
    }
}

impl HarvestProfile {
    /// Load a profile from JSON. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let err = |message: String| ConfigError::Profile {
            path: path.display().to_string(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        let profile: Self = serde_json::from_str(&raw).map_err(|e| err(e.to_string()))?;
        profile.validate().map_err(err)?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), String> {
        Url::parse(&self.engine_url).map_err(|e| format!("engine_url: {e}"))?;
        if self.result_selectors.is_empty() {
            return Err("result_selectors must not be empty".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be positive".to_string());
        }
        Ok(())
    }

    /// Result page URL for a keyword, with the keyword form-encoded.
    pub fn search_url(&self, keyword: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(&self.engine_url, &[("q", keyword)])
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_millis(self.results_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn screenshot_timeout(&self) -> Duration {
        Duration::from_millis(self.screenshot_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_keyword() {
        let profile = HarvestProfile::default();
        let url = profile.search_url("trail running & hiking").unwrap();
        assert_eq!(url.host_str(), Some("www.google.com"));
        assert_eq!(
            url.query_pairs().find(|(k, _)| k == "q").map(|(_, v)| v.into_owned()),
            Some("trail running & hiking".to_string())
        );
        assert!(url.as_str().contains("trail+running+%26+hiking"));
    }

    #[test]
    fn test_default_waits() {
        let profile = HarvestProfile::default();
        assert_eq!(profile.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(profile.consent_timeout(), Duration::from_secs(15));
        assert_eq!(profile.results_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_override_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(
            &path,
            r#"{"engine_url": "https://search.example/find", "consent_labels": ["Okay"]}"#,
        )
        .unwrap();

        let profile = HarvestProfile::from_file(&path).unwrap();
        assert_eq!(profile.engine_url, "https://search.example/find");
        assert_eq!(profile.consent_labels, vec!["Okay".to_string()]);
        assert_eq!(profile.navigation_timeout_ms, 30_000);
        assert!(!profile.result_selectors.is_empty());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, r#"{"engine_url": "not a url"}"#).unwrap();
        assert!(matches!(
            HarvestProfile::from_file(&path),
            Err(ConfigError::Profile { .. })
        ));

        let missing = dir.path().join("missing.json");
        assert!(HarvestProfile::from_file(&missing).is_err());
    }
}
