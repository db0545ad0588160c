//! Blocking HTTP implementation of `RemoteSource`.

use crate::model::remote::{Page, PageRequest};
use crate::source::{decode_page, page_url, FetchError, RemoteSource, SourceError};
use log::{error, info};
use reqwest::blocking::Client;
use reqwest::Url;
use std::time::{Duration, Instant};

/// Fetches post pages from a fixed JSON endpoint.
#[derive(Debug, Clone)]
pub struct HttpPostSource {
    client: Client,
    endpoint: Url,
}

impl HttpPostSource {
    /// Builds a source for `endpoint` with a per-request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl RemoteSource for HttpPostSource {
    fn fetch_page(&self, request: PageRequest) -> Result<Page, SourceError> {
        let url = page_url(&self.endpoint, request);
        let started_at = Instant::now();
        info!("event=fetch_page module=source status=start url={url}");

        let response = self.client.get(url.clone()).send().map_err(|err| {
            error!("event=fetch_page module=source status=error url={url} error={err}");
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "event=fetch_page module=source status=error url={url} http_status={}",
                status.as_u16()
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().map_err(|err| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        let page = decode_page(&body, request)?;

        info!(
            "event=fetch_page module=source status=ok url={url} items={} total={} duration_ms={}",
            page.items.len(),
            page.total,
            started_at.elapsed().as_millis()
        );
        Ok(page)
    }
}
