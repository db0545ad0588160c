//! Remote source client contract and payload decoding.
//!
//! # Responsibility
//! - Define how the pipelines obtain one page of remote items.
//! - Build paginated request URLs and decode `{ posts, total }` payloads.
//!
//! # Invariants
//! - A page with no items is reported as `SourceError::EmptyResult`, never
//!   as an empty `Page`.
//! - No retry happens here; callers decide whether a failure is terminal.

pub mod http;

use crate::model::remote::{Page, PageRequest, RemoteItem};
use reqwest::Url;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use http::HttpPostSource;

/// Transport or payload failure against a remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    Client(String),
    Transport { url: String, message: String },
    Status { url: String, status: u16 },
    Decode(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(message) => write!(f, "failed to build HTTP client: {message}"),
            Self::Transport { url, message } => write!(f, "request to `{url}` failed: {message}"),
            Self::Status { url, status } => write!(f, "`{url}` responded with status {status}"),
            Self::Decode(message) => write!(f, "failed to decode remote payload: {message}"),
        }
    }
}

impl Error for FetchError {}

/// Outcome of a page fetch that produced no usable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Fetch(FetchError),
    /// The payload decoded but held no items.
    EmptyResult,
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "{err}"),
            Self::EmptyResult => write!(f, "no items found"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::EmptyResult => None,
        }
    }
}

impl From<FetchError> for SourceError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

/// Provider of remote item pages.
pub trait RemoteSource {
    fn fetch_page(&self, request: PageRequest) -> Result<Page, SourceError>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for &T {
    fn fetch_page(&self, request: PageRequest) -> Result<Page, SourceError> {
        (**self).fetch_page(request)
    }
}

/// Appends `limit`/`skip` query parameters for windowed requests.
pub fn page_url(base: &Url, request: PageRequest) -> Url {
    let mut url = base.clone();
    if let PageRequest::Window { limit, skip } = request {
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("skip", &skip.to_string());
    }
    url
}

#[derive(Debug, Deserialize)]
struct PostsPayload {
    #[serde(default)]
    posts: Option<Vec<Option<RemoteItem>>>,
    total: Option<u64>,
    skip: Option<u64>,
    limit: Option<u64>,
}

/// Decodes a posts payload into a `Page`.
///
/// `null` entries inside `posts` are dropped. Missing `total`/`skip`/`limit`
/// fall back to the item count and the requested window.
pub fn decode_page(body: &[u8], request: PageRequest) -> Result<Page, SourceError> {
    let payload: PostsPayload =
        serde_json::from_slice(body).map_err(|err| FetchError::Decode(err.to_string()))?;

    let items: Vec<RemoteItem> = payload.posts.unwrap_or_default().into_iter().flatten().collect();
    if items.is_empty() {
        return Err(SourceError::EmptyResult);
    }

    let item_count = items.len() as u64;
    let (requested_limit, requested_skip) = match request {
        PageRequest::Unpaged => (item_count, 0),
        PageRequest::Window { limit, skip } => (limit, skip),
    };

    Ok(Page {
        total: payload.total.unwrap_or(item_count),
        skip: payload.skip.unwrap_or(requested_skip),
        limit: payload.limit.unwrap_or(requested_limit),
        items,
    })
}
