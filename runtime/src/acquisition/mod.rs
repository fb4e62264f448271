//! Result acquisition: the two tiers and the orchestrator that composes them.
//!
//! The browser tier ([`browser::BrowserHarvester`]) drives a live search page.
//! The API tier ([`custom_search::CustomSearchClient`]) calls a structured
//! search endpoint. Both implement [`ResultSource`], and
//! [`orchestrator::Acquirer`] applies the fallback policy and persists the
//! accepted batch.

pub mod browser;
pub mod custom_search;
pub mod links;
pub mod orchestrator;
pub mod profile;

use crate::model::{Tier, TierReport};
use async_trait::async_trait;

pub use browser::BrowserHarvester;
pub use custom_search::CustomSearchClient;
pub use orchestrator::Acquirer;
pub use profile::HarvestProfile;

/// One way of turning a keyword into candidate links.
///
/// Implementations never fail outright: failures are reported through
/// the returned report's outcome so the orchestrator can decide what to do.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Which tier this source represents.
    fn tier(&self) -> Tier;
    /// Fetch candidates for `keyword`. Every candidate carries `keyword`.
    async fn fetch(&self, keyword: &str) -> TierReport;
}
