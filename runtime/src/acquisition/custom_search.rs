//! Structured-search tier: a keyword search API over plain HTTP.
//!
//! Not a browser. One GET per search with a single retry on 5xx or 429;
//! transport errors and anything beyond that are the caller's business.

use super::ResultSource;
use crate::error::UpstreamError;
use crate::model::{Candidate, Tier, TierReport};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Google Custom Search JSON API.
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The provider accepts at most this many results per call.
pub const MAX_RESULTS: u32 = 10;

/// Longest `Retry-After` we are willing to honour.
const MAX_RETRY_AFTER_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: Option<String>,
}

/// Client for the structured search API.
#[derive(Clone)]
pub struct CustomSearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    result_cap: u32,
}

impl CustomSearchClient {
    /// Create a client against the default endpoint.
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            result_cap: MAX_RESULTS,
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the per-call result cap, clamped to what the provider accepts.
    pub fn with_result_cap(mut self, cap: u32) -> Self {
        self.result_cap = cap.clamp(1, MAX_RESULTS);
        self
    }

    pub fn result_cap(&self) -> u32 {
        self.result_cap
    }

    /// Search for `keyword` and map every linked item into a candidate.
    ///
    /// Zero items is a successful empty result.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Candidate>, UpstreamError> {
        let body = self.get_with_retry(keyword).await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let candidates: Vec<Candidate> = parsed
            .items
            .into_iter()
            .filter_map(|item| item.link)
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
            .map(|link| Candidate::new(keyword, link))
            .collect();

        debug!(keyword, count = candidates.len(), "search API returned candidates");
        Ok(candidates)
    }

    async fn get_with_retry(&self, keyword: &str) -> Result<String, UpstreamError> {
        let num = self.result_cap.to_string();
        let params = [
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", keyword),
            ("num", num.as_str()),
        ];

        let mut retried = false;
        loop {
            let resp = self.client.get(&self.endpoint).query(&params).send().await?;

            let status = resp.status().as_u16();

            if !retried && status >= 500 {
                retried = true;
                warn!(keyword, status, "search API server error, retrying once");
                tokio::time::sleep(Duration::from_millis(500)).await;
                continue;
            }

            if !retried && status == 429 {
                retried = true;
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(keyword, retry_after, "search API rate limited, backing off once");
                tokio::time::sleep(Duration::from_secs(retry_after.min(MAX_RETRY_AFTER_SECS)))
                    .await;
                continue;
            }

            let body = resp.text().await?;
            if !(200..300).contains(&status) {
                return Err(UpstreamError::Status {
                    status,
                    body: truncate(&body, 512),
                });
            }
            return Ok(body);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[async_trait]
impl ResultSource for CustomSearchClient {
    fn tier(&self) -> Tier {
        Tier::Api
    }

    async fn fetch(&self, keyword: &str) -> TierReport {
        match self.search(keyword).await {
            Ok(candidates) => TierReport::from_candidates(Tier::Api, candidates),
            Err(e) => TierReport::error(Tier::Api, e),
        }
    }
}
