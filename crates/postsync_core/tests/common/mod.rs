#![allow(dead_code)]

use postsync_core::model::remote::{Page, PageRequest, RemoteItem};
use postsync_core::source::{FetchError, RemoteSource, SourceError};
use postsync_core::ImageSource;
use reqwest::Url;
use std::cell::{Cell, RefCell};

pub const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFFfake-jpeg";

/// Serves windows over a fixed item list and records every request.
pub struct ScriptedSource {
    items: Vec<RemoteItem>,
    /// Remote-reported total; may differ from `items.len()`.
    total: u64,
    /// Window size used for unpaged requests.
    unpaged_limit: usize,
    fail_at_skip: Option<u64>,
    requests: RefCell<Vec<PageRequest>>,
}

impl ScriptedSource {
    pub fn new(items: Vec<RemoteItem>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            total,
            unpaged_limit: 30,
            fail_at_skip: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    pub fn failing_at_skip(mut self, skip: u64) -> Self {
        self.fail_at_skip = Some(skip);
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.borrow().clone()
    }
}

impl RemoteSource for ScriptedSource {
    fn fetch_page(&self, request: PageRequest) -> Result<Page, SourceError> {
        self.requests.borrow_mut().push(request);

        if self.fail_at_skip == Some(request.skip()) {
            return Err(SourceError::Fetch(FetchError::Status {
                url: format!("https://remote.test/posts?skip={}", request.skip()),
                status: 503,
            }));
        }

        let (limit, skip) = match request {
            PageRequest::Unpaged => (self.unpaged_limit, 0),
            PageRequest::Window { limit, skip } => (limit as usize, skip as usize),
        };
        let items: Vec<RemoteItem> = self.items.iter().skip(skip).take(limit).cloned().collect();
        if items.is_empty() {
            return Err(SourceError::EmptyResult);
        }

        Ok(Page {
            items,
            total: self.total,
            skip: skip as u64,
            limit: limit as u64,
        })
    }
}

/// Returns fixed bytes, or a fixed failure, for every image request.
pub struct StaticImages {
    fail: bool,
    fetched: RefCell<Vec<Url>>,
    calls: Cell<usize>,
}

impl StaticImages {
    pub fn ok() -> Self {
        Self {
            fail: false,
            fetched: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn fetched(&self) -> Vec<Url> {
        self.fetched.borrow().clone()
    }
}

impl ImageSource for StaticImages {
    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.fetched.borrow_mut().push(url.clone());
        if self.fail {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(IMAGE_BYTES.to_vec())
    }
}

pub fn item(id: i64, title: &str, tags: &[&str]) -> RemoteItem {
    RemoteItem::new(title, format!("{title} body"))
        .with_external_id(id)
        .with_tags(tags.iter().copied())
}

/// `count` items with ids `1..=count` and titles `Post N`.
pub fn numbered_items(count: usize) -> Vec<RemoteItem> {
    (1..=count)
        .map(|n| item(n as i64, &format!("Post {n}"), &["bulk"]))
        .collect()
}
