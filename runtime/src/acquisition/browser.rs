//! Browser tier: harvest result links from a live search page.
//!
//! One harvest is one isolated browser session that walks a fixed sequence:
//! launch, navigate, consent, block check, extraction, then a best-effort
//! screenshot. The session is released on every exit path.

use super::links;
use super::profile::HarvestProfile;
use super::ResultSource;
use crate::error::HarvestError;
use crate::model::{Candidate, Tier, TierReport};
use crate::renderer::{RenderContext, Renderer};
use anyhow::Context;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// User-agents rotated per session.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

/// Pick a user-agent at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Reduce a keyword to a safe file stem.
pub fn screenshot_stem(keyword: &str) -> String {
    let stem: String = keyword
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .take(80)
        .collect();
    if stem.is_empty() {
        "keyword".to_string()
    } else {
        stem
    }
}

/// What the page-level steps concluded before teardown.
enum PageOutcome {
    Blocked,
    Links(Vec<String>),
}

/// Owns a live session and guarantees it is released.
///
/// `release` closes it in an orderly way. If the guard is dropped instead
/// (cancellation, panic) the session's own `Drop` kills the browser.
struct SessionGuard {
    session: Option<Box<dyn RenderContext>>,
}

impl SessionGuard {
    fn new(session: Box<dyn RenderContext>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn release(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("browser session close failed: {e:#}");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("browser session dropped before orderly close; tearing down");
        }
    }
}

/// Harvests result links with a headless browser.
pub struct BrowserHarvester {
    renderer: Arc<dyn Renderer>,
    profile: HarvestProfile,
    screenshot_dir: Option<PathBuf>,
}

impl BrowserHarvester {
    pub fn new(renderer: Arc<dyn Renderer>, profile: HarvestProfile) -> Self {
        Self {
            renderer,
            profile,
            screenshot_dir: None,
        }
    }

    /// Write a diagnostic screenshot per harvest into `dir`.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Run one harvest for `keyword`.
    pub async fn harvest(&self, keyword: &str) -> TierReport {
        let start = Instant::now();
        let user_agent = random_user_agent();

        let session = match self.renderer.launch(user_agent).await {
            Ok(s) => s,
            Err(e) => {
                let err = HarvestError::Launch(e);
                warn!(keyword, "{err}");
                return TierReport::error(Tier::Browser, err);
            }
        };
        let mut guard = SessionGuard::new(session);

        let result = match guard.session.as_deref_mut() {
            Some(session) => self.drive(session, keyword).await,
            None => Err(HarvestError::Launch(anyhow::anyhow!("session released early"))),
        };
        guard.release().await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(PageOutcome::Blocked) => {
                info!(keyword, elapsed_ms, "bot challenge detected, skipping extraction");
                TierReport::blocked(Tier::Browser)
            }
            Ok(PageOutcome::Links(links)) => {
                debug!(keyword, elapsed_ms, count = links.len(), "browser harvest finished");
                let candidates = links
                    .into_iter()
                    .map(|url| Candidate::new(keyword, url))
                    .collect();
                TierReport::from_candidates(Tier::Browser, candidates)
            }
            Err(err) => {
                warn!(keyword, elapsed_ms, "{err}");
                TierReport::error(Tier::Browser, err)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut dyn RenderContext,
        keyword: &str,
    ) -> Result<PageOutcome, HarvestError> {
        let profile = &self.profile;
        let url = profile
            .search_url(keyword)
            .context("invalid engine URL")
            .map_err(HarvestError::Navigation)?;

        let nav = session
            .navigate(url.as_str(), profile.navigation_timeout())
            .await
            .map_err(HarvestError::Navigation)?;
        if !nav.settled {
            debug!(keyword, load_time_ms = nav.load_time_ms, "navigation did not settle, continuing");
        }

        self.accept_consent(session, keyword).await;

        let html = session
            .get_html()
            .await
            .map_err(HarvestError::Extraction)?;
        if links::any_match(&html, &profile.block_markers) {
            self.capture(session, keyword).await;
            return Ok(PageOutcome::Blocked);
        }

        let html = self.wait_for_results(session, html).await?;
        let page_url = session
            .get_url()
            .await
            .unwrap_or_else(|_| nav.final_url.clone());
        let found = links::extract_result_links(&html, &page_url, profile);

        self.capture(session, keyword).await;
        Ok(PageOutcome::Links(found))
    }

    /// Click through a consent wall if one is showing. Absence is normal.
    async fn accept_consent(&self, session: &mut dyn RenderContext, keyword: &str) {
        let profile = &self.profile;
        if profile.consent_labels.is_empty() {
            return;
        }
        match session
            .click_by_label(&profile.consent_scope, &profile.consent_labels)
            .await
        {
            Ok(true) => {
                debug!(keyword, "consent control clicked");
                match session.wait_for_navigation(profile.consent_timeout()).await {
                    Ok(true) => {}
                    Ok(false) => debug!(keyword, "no navigation after consent, continuing"),
                    Err(e) => debug!(keyword, "consent navigation wait failed: {e:#}"),
                }
            }
            Ok(false) => {}
            Err(e) => debug!(keyword, "consent probe failed, treating as absent: {e:#}"),
        }
    }

    /// Poll until a ready or result marker shows up, or the wait runs out.
    /// Returns the freshest snapshot either way.
    async fn wait_for_results(
        &self,
        session: &mut dyn RenderContext,
        mut html: String,
    ) -> Result<String, HarvestError> {
        let profile = &self.profile;
        let deadline = tokio::time::Instant::now() + profile.results_timeout();
        loop {
            if links::any_match(&html, &profile.ready_markers)
                || links::any_match(&html, &profile.result_selectors)
            {
                return Ok(html);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("result markers did not appear in time, extracting anyway");
                return Ok(html);
            }
            tokio::time::sleep(profile.poll_interval()).await;
            html = session
                .get_html()
                .await
                .map_err(HarvestError::Extraction)?;
        }
    }

    /// Best-effort full-page screenshot keyed by keyword.
    async fn capture(&self, session: &mut dyn RenderContext, keyword: &str) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(keyword, "screenshot directory unavailable: {e}");
            return;
        }
        let path = dir.join(format!("{}.png", screenshot_stem(keyword)));
        match tokio::time::timeout(self.profile.screenshot_timeout(), session.screenshot(&path)).await
        {
            Ok(Ok(())) => debug!(keyword, path = %path.display(), "screenshot saved"),
            Ok(Err(e)) => warn!(keyword, "screenshot failed: {e:#}"),
            Err(_) => warn!(keyword, "screenshot timed out"),
        }
    }
}

#[async_trait]
impl ResultSource for BrowserHarvester {
    fn tier(&self) -> Tier {
        Tier::Browser
    }

    async fn fetch(&self, keyword: &str) -> TierReport {
        self.harvest(keyword).await
    }
}
