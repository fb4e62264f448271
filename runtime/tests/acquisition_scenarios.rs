//! End-to-end acquisition scenarios.
//!
//! Wires the real orchestrator, the real SQLite store and the real search
//! API client (against a wiremock provider) with a static-page renderer
//! standing in for Chromium.

use async_trait::async_trait;
use serp_harvest::acquisition::{Acquirer, BrowserHarvester, CustomSearchClient, HarvestProfile};
use serp_harvest::error::{AcquireError, PersistenceError};
use serp_harvest::model::{Candidate, SearchResult};
use serp_harvest::renderer::{NavigationResult, RenderContext, Renderer};
use serp_harvest::store::{ResultStore, SqliteResultStore};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Fixtures ──

const CAPTCHA_PAGE: &str = r#"<html><body>
    <form id="captcha-form" action="/sorry/index"><div id="recaptcha"></div></form>
</body></html>"#;

const EMPTY_RESULTS_PAGE: &str = r#"<html><body>
    <div id="search"><div id="rso"></div></div>
</body></html>"#;

const RESULTS_PAGE: &str = r#"<html><body><div id="search"><div id="rso">
    <div class="g"><a href="https://trails.example/guide">Trail guide</a></div>
    <div class="g"><a href="/url-relative/boots">Boots</a></div>
    <div class="g"><a href="https://www.google.com/search?q=hiking+near+me">More</a></div>
    <div class="g"><a href="https://trails.example/guide">Trail guide again</a></div>
</div></div></body></html>"#;

/// Renderer that serves one fixed page and counts session teardown.
struct StaticPage {
    html: &'static str,
    closed: Arc<AtomicUsize>,
}

impl StaticPage {
    fn new(html: &'static str) -> Self {
        Self {
            html,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Renderer for StaticPage {
    async fn launch(&self, _user_agent: &str) -> anyhow::Result<Box<dyn RenderContext>> {
        Ok(Box::new(StaticContext {
            html: self.html,
            url: String::new(),
            closed: Arc::clone(&self.closed),
        }))
    }

    fn active_contexts(&self) -> usize {
        0
    }
}

struct StaticContext {
    html: &'static str,
    url: String,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for StaticContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> anyhow::Result<NavigationResult> {
        self.url = url.to_string();
        Ok(NavigationResult {
            final_url: self.url.clone(),
            settled: true,
            load_time_ms: 1,
        })
    }

    async fn wait_for_navigation(&mut self, _timeout: Duration) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn click_by_label(&mut self, _scope: &str, _labels: &[String]) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn get_html(&self) -> anyhow::Result<String> {
        Ok(self.html.to_string())
    }

    async fn get_url(&self) -> anyhow::Result<String> {
        Ok(self.url.clone())
    }

    async fn screenshot(&self, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store whose writes always violate the schema, so the batch rolls back.
struct RejectingStore(SqliteResultStore);

#[async_trait]
impl ResultStore for RejectingStore {
    async fn save(&self, mut candidates: Vec<Candidate>) -> Result<Vec<SearchResult>, PersistenceError> {
        candidates.push(Candidate::new("hiking", ""));
        self.0.save(candidates).await
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<SearchResult>, PersistenceError> {
        self.0.list_recent(limit).await
    }
}

fn fast_profile() -> HarvestProfile {
    HarvestProfile {
        results_timeout_ms: 50,
        poll_interval_ms: 5,
        ..HarvestProfile::default()
    }
}

fn api_client(server: &MockServer) -> Arc<CustomSearchClient> {
    Arc::new(
        CustomSearchClient::new("test-key", "test-cx", Duration::from_secs(5))
            .with_endpoint(format!("{}/customsearch/v1", server.uri())),
    )
}

fn open_store(dir: &TempDir) -> SqliteResultStore {
    SqliteResultStore::open(&dir.path().join("results.db")).unwrap()
}

async fn mount_items(server: &MockServer, links: &[&str], calls: u64) {
    let items: Vec<serde_json::Value> = links
        .iter()
        .map(|l| serde_json::json!({ "link": l, "title": "t" }))
        .collect();
    let body = if items.is_empty() {
        serde_json::json!({ "searchInformation": { "totalResults": "0" } })
    } else {
        serde_json::json!({ "items": items })
    };
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

// ── Scenarios ──

#[tokio::test]
async fn test_api_only_persists_every_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "hiking"))
        .and(query_param("num", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"link": "https://a.example"}, {"link": "https://b.example"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let acquirer = Acquirer::new(store.clone(), api_client(&server));

    let saved = acquirer.acquire_api_only("hiking").await.unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|r| r.keyword == "hiking"));
    let urls: Vec<&str> = saved.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example", "https://b.example"]);

    let listed = store.list_recent(None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_blocked_browser_falls_back_to_api() {
    let server = MockServer::start().await;
    mount_items(&server, &["https://fallback.example/hiking"], 1).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let page = StaticPage::new(CAPTCHA_PAGE);
    let closed = Arc::clone(&page.closed);
    let harvester = BrowserHarvester::new(Arc::new(page), fast_profile());
    let acquirer = Acquirer::new(store.clone(), api_client(&server))
        .with_browser_tier(Arc::new(harvester));

    let saved = acquirer.acquire("hiking").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].keyword, "hiking");
    assert_eq!(saved[0].url, "https://fallback.example/hiking");
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_both_tiers_empty_writes_nothing() {
    let server = MockServer::start().await;
    mount_items(&server, &[], 1).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let harvester = BrowserHarvester::new(Arc::new(StaticPage::new(EMPTY_RESULTS_PAGE)), fast_profile());
    let acquirer = Acquirer::new(store.clone(), api_client(&server))
        .with_browser_tier(Arc::new(harvester));

    let saved = acquirer.acquire("hiking").await.unwrap();
    assert!(saved.is_empty());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_write_failure_surfaces_and_leaves_nothing() {
    let server = MockServer::start().await;
    mount_items(&server, &["https://a.example", "https://b.example"], 1).await;

    let dir = TempDir::new().unwrap();
    let inner = open_store(&dir);
    let acquirer = Acquirer::new(Arc::new(RejectingStore(inner.clone())), api_client(&server));

    let err = acquirer.acquire_api_only("hiking").await.unwrap_err();
    assert!(matches!(err, AcquireError::Persistence(_)));
    assert_eq!(err.code(), "E_PERSISTENCE");
    assert_eq!(inner.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_browser_results_skip_api() {
    let server = MockServer::start().await;
    mount_items(&server, &["https://never.example"], 0).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let page = StaticPage::new(RESULTS_PAGE);
    let closed = Arc::clone(&page.closed);
    let harvester = BrowserHarvester::new(Arc::new(page), fast_profile());
    let acquirer = Acquirer::new(store.clone(), api_client(&server))
        .with_browser_tier(Arc::new(harvester));

    let saved = acquirer.acquire("hiking").await.unwrap();
    let urls: Vec<&str> = saved.iter().map(|r| r.url.as_str()).collect();
    // The relative link resolves onto the engine host and is dropped with
    // the other self-links.
    assert_eq!(urls, vec!["https://trails.example/guide"]);
    assert!(saved.iter().all(|r| r.keyword == "hiking"));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_failure_after_block_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let harvester = BrowserHarvester::new(Arc::new(StaticPage::new(CAPTCHA_PAGE)), fast_profile());
    let acquirer = Acquirer::new(store.clone(), api_client(&server))
        .with_browser_tier(Arc::new(harvester));

    let saved = acquirer.acquire("hiking").await.unwrap();
    assert!(saved.is_empty());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_history_accumulates_newest_first() {
    let server = MockServer::start().await;
    mount_items(&server, &["https://a.example"], 2).await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir));
    let acquirer = Acquirer::new(store.clone(), api_client(&server));

    let first = acquirer.acquire_api_only("first").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = acquirer.acquire_api_only("second").await.unwrap();

    let listed = store.list_recent(None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second[0].id);
    assert_eq!(listed[1].id, first[0].id);
    assert!(listed[0].created_at >= listed[1].created_at);
    // Same URL under two keywords is two records.
    assert_eq!(listed[0].url, listed[1].url);
}
