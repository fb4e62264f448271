//! HTML probing and result-link extraction for the browser tier.
//!
//! Everything here works on a DOM snapshot, so it is pure and testable
//! without a browser. Selectors that fail to parse count as misses.

use crate::acquisition::profile::HarvestProfile;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::debug!(selector = raw, "ignoring unparseable selector");
            None
        }
    }
}

/// True if any of `selectors` matches at least one element.
pub fn any_match(html: &str, selectors: &[String]) -> bool {
    let document = Html::parse_document(html);
    selectors
        .iter()
        .filter_map(|s| parse_selector(s))
        .any(|sel| document.select(&sel).next().is_some())
}

/// Decide whether an absolute link is a genuine outbound result.
pub fn is_result_link(url: &Url, profile: &HarvestProfile) -> bool {
    is_outbound(url, profile, &search_hosts(profile, None))
}

/// Hosts on which the in-page path prefixes apply: the engine's own host
/// and the host of the page being read.
fn search_hosts(profile: &HarvestProfile, page: Option<&Url>) -> Vec<String> {
    Url::parse(&profile.engine_url)
        .ok()
        .as_ref()
        .into_iter()
        .chain(page)
        .filter_map(|u| u.host_str().map(str::to_ascii_lowercase))
        .collect()
}

fn is_outbound(url: &Url, profile: &HarvestProfile, search_hosts: &[String]) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    if profile
        .excluded_host_fragments
        .iter()
        .any(|frag| host.contains(&frag.to_ascii_lowercase()))
    {
        return false;
    }
    if !search_hosts.contains(&host) {
        return true;
    }
    let path = url.path();
    !profile.excluded_path_prefixes.iter().any(|prefix| {
        path == prefix.as_str() || path.starts_with(&format!("{}/", prefix.trim_end_matches('/')))
    })
}

/// Collect result links in document order, resolved against `page_url`,
/// filtered and de-duplicated by exact URL.
pub fn extract_result_links(html: &str, page_url: &str, profile: &HarvestProfile) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let hosts = search_hosts(profile, base.as_ref());
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for sel in profile.result_selectors.iter().filter_map(|s| parse_selector(s)) {
        for element in document.select(&sel) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') {
                continue;
            }
            let resolved = match &base {
                Some(b) => b.join(href),
                None => Url::parse(href),
            };
            let Ok(url) = resolved else {
                continue;
            };
            if !is_outbound(&url, profile, &hosts) {
                continue;
            }
            let url = url.to_string();
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    }

    links
}
