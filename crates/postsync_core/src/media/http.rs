//! Blocking HTTP implementation of `ImageSource`.

use crate::media::ImageSource;
use crate::source::FetchError;
use log::warn;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Downloads images, following a bounded number of redirects.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(max_redirects: usize, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(Policy::limited(max_redirects))
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    /// Only a final `200 OK` counts as success.
    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self.client.get(url.clone()).send().map_err(transport)?;
        if response.status() != StatusCode::OK {
            warn!(
                "event=image_fetch module=media status=error url={url} http_status={}",
                response.status().as_u16()
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().map_err(transport)?;
        Ok(bytes.to_vec())
    }
}
