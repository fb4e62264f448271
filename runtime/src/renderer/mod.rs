//! Renderer abstraction for browser-based harvesting.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). Each context
//! is a fully isolated browser session owned by a single harvest.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The URL the page reports after navigation.
    pub final_url: String,
    /// False when the load did not settle before the timeout.
    pub settled: bool,
    /// Time spent waiting in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that launches isolated sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch a fresh session presenting the given user-agent.
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn RenderContext>>;
    /// Number of currently live sessions.
    fn active_contexts(&self) -> usize;
}

/// A single live browser session.
///
/// Dropping a context without calling [`RenderContext::close`] must still
/// release the underlying browser process.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate and wait for the load to settle.
    ///
    /// A timeout is reported through [`NavigationResult::settled`]; only hard
    /// navigation failures are errors.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Wait for an in-flight navigation. Returns false on timeout.
    async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<bool>;
    /// Click the first element under `scope` whose visible text matches one
    /// of `labels` (case-insensitive). Returns whether anything was clicked.
    async fn click_by_label(&mut self, scope: &str, labels: &[String]) -> Result<bool>;
    /// Get the current DOM serialized as HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Write a full-page PNG screenshot to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;
    /// Close the session and its browser process.
    async fn close(self: Box<Self>) -> Result<()>;
}
