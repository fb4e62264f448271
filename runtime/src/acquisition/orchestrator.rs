//! Acquisition orchestrator: browser first, API fallback, one batch write.

use super::ResultSource;
use crate::error::AcquireError;
use crate::model::{Candidate, Outcome, SearchResult, TierReport};
use crate::store::ResultStore;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Composes the two tiers with the fallback policy and persists the result.
///
/// The browser tier is optional; without it every call goes straight to
/// the API tier.
pub struct Acquirer {
    store: Arc<dyn ResultStore>,
    browser: Option<Arc<dyn ResultSource>>,
    fallback: Arc<dyn ResultSource>,
}

impl Acquirer {
    /// Create an API-only acquirer.
    pub fn new(store: Arc<dyn ResultStore>, fallback: Arc<dyn ResultSource>) -> Self {
        Self {
            store,
            browser: None,
            fallback,
        }
    }

    /// Enable the browser tier.
    pub fn with_browser_tier(mut self, browser: Arc<dyn ResultSource>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn has_browser_tier(&self) -> bool {
        self.browser.is_some()
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Full flow: browser tier, then the API tier unless the browser
    /// produced results.
    pub async fn acquire(&self, keyword: &str) -> Result<Vec<SearchResult>, AcquireError> {
        self.run(keyword, true).await
    }

    /// Skip the browser tier entirely.
    pub async fn acquire_api_only(&self, keyword: &str) -> Result<Vec<SearchResult>, AcquireError> {
        self.run(keyword, false).await
    }

    /// Like [`Acquirer::acquire`] (or the API-only variant), abandoned with
    /// `Cancelled` if `cancel` resolves while the tiers are still running.
    /// Abandoning drops any live browser session, which tears it down.
    ///
    /// Once the batch write has started it runs to completion, so a
    /// `Cancelled` result never hides persisted rows.
    pub async fn acquire_until<F>(
        &self,
        keyword: &str,
        use_browser: bool,
        cancel: F,
    ) -> Result<Vec<SearchResult>, AcquireError>
    where
        F: Future<Output = ()> + Send,
    {
        let keyword = validate(keyword)?;
        let candidates = tokio::select! {
            biased;
            () = cancel => {
                warn!(keyword, "acquisition cancelled");
                return Err(AcquireError::Cancelled);
            }
            candidates = self.gather(keyword, use_browser) => candidates,
        };
        self.persist(keyword, candidates).await
    }

    /// [`Acquirer::acquire_until`] with a deadline.
    pub async fn acquire_with_deadline(
        &self,
        keyword: &str,
        use_browser: bool,
        deadline: Duration,
    ) -> Result<Vec<SearchResult>, AcquireError> {
        self.acquire_until(keyword, use_browser, tokio::time::sleep(deadline))
            .await
    }

    async fn run(&self, keyword: &str, use_browser: bool) -> Result<Vec<SearchResult>, AcquireError> {
        let keyword = validate(keyword)?;
        let candidates = self.gather(keyword, use_browser).await;
        self.persist(keyword, candidates).await
    }

    /// Tier phase: browser first when enabled, then the API unless the
    /// browser produced results. Upstream failures degrade to no candidates.
    async fn gather(&self, keyword: &str, use_browser: bool) -> Vec<Candidate> {
        let browser = self.browser.as_ref().filter(|_| use_browser);
        let report = match browser {
            Some(browser) => {
                let report = attempt(browser.as_ref(), keyword).await;
                if report.outcome == Outcome::Results {
                    report
                } else {
                    info!(
                        keyword,
                        outcome = report.outcome.label(),
                        "browser tier gave nothing usable, falling back to API"
                    );
                    attempt(self.fallback.as_ref(), keyword).await
                }
            }
            None => attempt(self.fallback.as_ref(), keyword).await,
        };

        match report.outcome {
            Outcome::Error(ref message) => {
                warn!(keyword, tier = %report.tier, "API tier failed, returning no results: {message}");
                Vec::new()
            }
            _ => report.candidates,
        }
    }

    async fn persist(
        &self,
        keyword: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<SearchResult>, AcquireError> {
        let saved = self.store.save(candidates).await?;
        info!(keyword, saved = saved.len(), "acquisition complete");
        Ok(saved)
    }
}

fn validate(keyword: &str) -> Result<&str, AcquireError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AcquireError::InvalidKeyword);
    }
    Ok(keyword)
}

/// Run one tier and log the attempt.
async fn attempt(source: &dyn ResultSource, keyword: &str) -> TierReport {
    let start = Instant::now();
    let mut report = source.fetch(keyword).await;
    // Every record must carry the query keyword, whatever the tier emitted.
    for c in &mut report.candidates {
        if c.keyword != keyword {
            c.keyword = keyword.to_string();
        }
    }
    info!(
        keyword,
        tier = %report.tier,
        outcome = report.outcome.label(),
        candidates = report.candidates.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "tier attempt finished"
    );
    report
}
