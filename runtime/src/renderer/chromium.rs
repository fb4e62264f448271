//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::debug;

/// Upper bound on an orderly browser shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Find the Chromium binary path.
///
/// An explicit path wins when it exists; otherwise the usual binary names
/// are looked up on `PATH`.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }

    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer. Every launch starts its own browser process.
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Create a renderer for the given Chromium binary.
    pub fn new(chrome_path: PathBuf) -> Self {
        Self {
            chrome_path,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Locate Chromium and create a renderer for it.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let path = find_chromium(explicit)
            .context("Chromium not found. Install Chrome/Chromium or set SERP_CHROMIUM_PATH.")?;
        Ok(Self::new(path))
    }

    pub fn chrome_path(&self) -> &Path {
        &self.chrome_path
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn RenderContext>> {
        // A throwaway profile keeps concurrent sessions from sharing locks
        // and cookies.
        let profile = tempfile::Builder::new()
            .prefix("serp-harvest-profile-")
            .tempdir()
            .context("failed to create browser profile directory")?;

        let config = BrowserConfig::builder()
            .chrome_executable(&self.chrome_path)
            .user_data_dir(profile.path())
            .window_size(1366, 768)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error (continuing): {e}");
                }
            }
        });

        // From here on the context owns the browser, so any early return
        // below still tears it down through Drop.
        self.active_count.fetch_add(1, Ordering::Relaxed);
        let mut ctx = ChromiumContext {
            browser,
            page: None,
            handler,
            _profile: profile,
            active_count: Arc::clone(&self.active_count),
        };

        let page = ctx
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        ctx.page = Some(page);

        Ok(Box::new(ctx))
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium session: one browser process with one page.
pub struct ChromiumContext {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    _profile: TempDir,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("browser page not open")
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        // The Browser handle kills its child process when dropped; the CDP
        // handler task would otherwise outlive it.
        self.handler.abort();
        self.active_count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();
        let page = self.page()?;

        let settled = match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => false,
        };

        let final_url = page
            .url()
            .await
            .unwrap_or_default()
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            settled,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<bool> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => bail!("navigation wait failed: {e}"),
            Err(_) => Ok(false),
        }
    }

    async fn click_by_label(&mut self, scope: &str, labels: &[String]) -> Result<bool> {
        let labels: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
        let script = format!(
            r#"(() => {{
                const labels = {labels};
                for (const el of document.querySelectorAll({scope})) {{
                    const text = (el.innerText || el.value || el.getAttribute('aria-label') || '')
                        .trim().toLowerCase();
                    if (labels.includes(text)) {{ el.click(); return true; }}
                }}
                return false;
            }})()"#,
            labels = serde_json::to_string(&labels)?,
            scope = serde_json::to_string(scope)?,
        );

        let result = self
            .page()?
            .evaluate(script)
            .await
            .context("consent probe failed")?;
        result
            .into_value::<bool>()
            .map_err(|e| anyhow::anyhow!("failed to convert consent probe result: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        self.page()?.content().await.context("failed to get HTML")
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page()?
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page()?
            .save_screenshot(params, path)
            .await
            .with_context(|| format!("failed to save screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = self;
        if let Some(page) = this.page.take() {
            let _ = page.close().await;
        }
        match tokio::time::timeout(CLOSE_TIMEOUT, this.browser.close()).await {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, this.browser.wait()).await;
            }
            Ok(Err(e)) => debug!("browser close error (process killed on drop): {e}"),
            Err(_) => debug!("browser close timed out (process killed on drop)"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_chromium_ignores_missing_explicit_path() {
        let missing = Path::new("/definitely/not/a/chrome/binary");
        if let Some(found) = find_chromium(Some(missing)) {
            assert_ne!(found, missing);
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_launch_navigate_and_close() {
        let renderer = ChromiumRenderer::discover(None).expect("chromium not found");
        let mut ctx = renderer
            .launch("Mozilla/5.0 (X11; Linux x86_64) serp-harvest-test")
            .await
            .expect("failed to launch");
        assert_eq!(renderer.active_contexts(), 1);

        let nav = ctx
            .navigate(
                "data:text/html,<button>Accept all</button><a href='https://a.example'>A</a>",
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");
        assert!(nav.settled);

        let clicked = ctx
            .click_by_label("button", &["accept all".to_string()])
            .await
            .expect("click failed");
        assert!(clicked);

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("https://a.example"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);
    }
}
