//! Remote source payload model.
//!
//! # Responsibility
//! - Describe one page of items returned by the remote posts endpoint.
//! - Describe how a page is requested (unpaged vs limit/skip window).
//!
//! # Invariants
//! - `Page::items` keeps remote order.
//! - `Page::total` is the remote-reported total, not the page length.

use serde::{Deserialize, Serialize};

/// One content item received from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Numeric id reported by the remote source, when present.
    #[serde(rename = "id", default)]
    pub external_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Tag names in remote order.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RemoteItem {
    /// Creates an item without a remote id.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            external_id: None,
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
        }
    }

    /// Sets the remote id.
    pub fn with_external_id(mut self, external_id: i64) -> Self {
        self.external_id = Some(external_id);
        self
    }

    /// Replaces the tag list.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// One batch of remote results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<RemoteItem>,
    /// Total number of items the remote source reports across all pages.
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// How a page is requested from the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Bare endpoint, server-side default window.
    Unpaged,
    /// Explicit `limit`/`skip` window.
    Window { limit: u64, skip: u64 },
}

impl PageRequest {
    /// Returns the requested `skip`, `0` for unpaged requests.
    pub fn skip(self) -> u64 {
        match self {
            Self::Unpaged => 0,
            Self::Window { skip, .. } => skip,
        }
    }
}
