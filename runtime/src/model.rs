//! Records that flow through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An unsaved keyword/URL pair emitted by one of the tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub keyword: String,
    pub url: String,
    /// Filled by the store at write time when absent.
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(keyword: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            url: url.into(),
            created_at: None,
        }
    }

    /// Pin the creation timestamp instead of letting the store assign it.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A persisted search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub keyword: String,
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Which acquisition path produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Browser,
    Api,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => f.write_str("browser"),
            Self::Api => f.write_str("api"),
        }
    }
}

/// How a single tier attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One or more candidates were produced.
    Results,
    /// The tier ran cleanly and found nothing.
    Empty,
    /// A bot challenge was detected; no extraction was attempted.
    Blocked,
    /// The tier failed. Carries the rendered error for diagnostics.
    Error(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Results => "success-with-results",
            Self::Empty => "success-empty",
            Self::Blocked => "blocked",
            Self::Error(_) => "error",
        }
    }
}

/// Transient record of one tier attempt within an acquisition call.
#[derive(Debug, Clone)]
pub struct TierReport {
    pub tier: Tier,
    pub outcome: Outcome,
    pub candidates: Vec<Candidate>,
}

impl TierReport {
    /// Build a report whose outcome follows from the candidate count.
    pub fn from_candidates(tier: Tier, candidates: Vec<Candidate>) -> Self {
        let outcome = if candidates.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Results
        };
        Self {
            tier,
            outcome,
            candidates,
        }
    }

    pub fn blocked(tier: Tier) -> Self {
        Self {
            tier,
            outcome: Outcome::Blocked,
            candidates: Vec::new(),
        }
    }

    pub fn error(tier: Tier, err: impl fmt::Display) -> Self {
        Self {
            tier,
            outcome: Outcome::Error(err.to_string()),
            candidates: Vec::new(),
        }
    }
}
