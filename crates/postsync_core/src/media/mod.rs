//! Placeholder image attachment.
//!
//! # Responsibility
//! - Fetch a random placeholder image and sideload it into the store as the
//!   featured image of a freshly created record.
//!
//! # Invariants
//! - Attachment is best-effort; every failure is returned as a
//!   `MediaAttachError` and never touches the owning record.
//! - Image bytes are staged in a scoped temporary file that is removed on
//!   every exit path, including failures.
//! - The random seed only busts caches; it never identifies content.
//!
//! # See also
//! - docs/architecture/sync-pipeline.md

pub mod http;

use crate::config::SyncConfig;
use crate::model::record::{AuthorId, MediaId, MediaUpdate, RecordId};
use crate::source::FetchError;
use crate::store::{ContentStore, MediaUpload, StoreError};
use log::{debug, info};
use rand::Rng;
use reqwest::Url;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use tempfile::NamedTempFile;

pub use http::HttpImageSource;

/// Provider of raw image bytes.
pub trait ImageSource {
    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_image(url)
    }
}

/// Builds `<host>/<width>/<height>?random=<seed>`.
pub fn placeholder_image_url(host: &Url, width: u32, height: u32, seed: u32) -> Url {
    let mut url = host.clone();
    let path = format!("{}/{width}/{height}", host.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.query_pairs_mut().append_pair("random", &seed.to_string());
    url
}

/// Input for one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub record_id: RecordId,
    pub title: String,
    pub author_id: AuthorId,
    pub alt_text: String,
    pub caption: String,
}

/// Stage at which an attachment gave up.
#[derive(Debug)]
pub enum MediaAttachError {
    Fetch(FetchError),
    TempFile(std::io::Error),
    Sideload(StoreError),
    /// The asset exists but metadata or featured-image linking failed.
    Finalize { media_id: MediaId, source: StoreError },
}

impl Display for MediaAttachError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "failed to fetch placeholder image: {err}"),
            Self::TempFile(err) => write!(f, "failed to stage image in temporary file: {err}"),
            Self::Sideload(err) => write!(f, "failed to sideload image: {err}"),
            Self::Finalize { media_id, source } => {
                write!(f, "failed to finalize media {media_id}: {source}")
            }
        }
    }
}

impl Error for MediaAttachError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::TempFile(err) => Some(err),
            Self::Sideload(err) => Some(err),
            Self::Finalize { source, .. } => Some(source),
        }
    }
}

/// Fetches placeholder images and attaches them as featured images.
pub struct MediaAttacher<I: ImageSource> {
    images: I,
    host: Url,
    width: u32,
    height: u32,
    seed_max: u32,
}

impl<I: ImageSource> MediaAttacher<I> {
    pub fn new(images: I, host: Url, width: u32, height: u32, seed_max: u32) -> Self {
        Self {
            images,
            host,
            width,
            height,
            seed_max: seed_max.max(1),
        }
    }

    /// Builds an attacher from validated config.
    pub fn from_config(images: I, config: &SyncConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(
            images,
            config.image_host_url()?,
            config.image_width,
            config.image_height,
            config.seed_max,
        ))
    }

    /// Fetches a placeholder image and makes it the record's featured image.
    ///
    /// # Contract
    /// - Sets the asset author, caption and excerpt (excerpt = caption).
    /// - Sets alt text only when it is non-blank after sanitizing.
    /// - The staged temp file is gone when this returns.
    pub fn attach_placeholder_image<S: ContentStore + ?Sized>(
        &self,
        store: &mut S,
        request: &AttachRequest,
    ) -> Result<MediaId, MediaAttachError> {
        let seed = rand::thread_rng().gen_range(1..=self.seed_max);
        let url = placeholder_image_url(&self.host, self.width, self.height, seed);
        debug!(
            "event=media_attach module=media status=start record_id={} url={url}",
            request.record_id
        );

        let bytes = self
            .images
            .fetch_image(&url)
            .map_err(MediaAttachError::Fetch)?;
        let staged = stage_bytes(&bytes).map_err(MediaAttachError::TempFile)?;

        let file_name = format!("picsum-{seed}.jpg");
        let sideloaded = store.sideload_media(&MediaUpload {
            record_id: request.record_id,
            source_path: staged.path(),
            file_name: &file_name,
            title: &request.title,
        });
        drop(staged);
        let media_id = sideloaded.map_err(MediaAttachError::Sideload)?;

        let alt_text = sanitize_alt_text(&request.alt_text);
        let update = MediaUpdate {
            author_id: Some(request.author_id),
            caption: Some(request.caption.clone()),
            excerpt: Some(request.caption.clone()),
            alt_text: (!alt_text.is_empty()).then_some(alt_text),
        };
        store
            .update_media(media_id, &update)
            .and_then(|()| store.set_featured_media(request.record_id, media_id))
            .map_err(|source| MediaAttachError::Finalize { media_id, source })?;

        info!(
            "event=media_attach module=media status=ok record_id={} media_id={media_id} bytes={}",
            request.record_id,
            bytes.len()
        );
        Ok(media_id)
    }
}

fn stage_bytes(bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix("postsync-")
        .suffix(".jpg")
        .tempfile()?;
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}

/// Collapses whitespace and control characters into single spaces.
fn sanitize_alt_text(value: &str) -> String {
    value
        .split(|ch: char| ch.is_whitespace() || ch.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{placeholder_image_url, sanitize_alt_text};
    use reqwest::Url;

    #[test]
    fn placeholder_url_uses_dimensions_and_seed() {
        let host = Url::parse("https://picsum.photos").unwrap();
        assert_eq!(
            placeholder_image_url(&host, 1200, 800, 42).as_str(),
            "https://picsum.photos/1200/800?random=42"
        );

        let nested = Url::parse("http://localhost:8080/images/").unwrap();
        assert_eq!(
            placeholder_image_url(&nested, 10, 20, 1).as_str(),
            "http://localhost:8080/images/10/20?random=1"
        );
    }

    #[test]
    fn sanitize_alt_text_collapses_whitespace() {
        assert_eq!(sanitize_alt_text("  A\n title\t here "), "A title here");
        assert_eq!(sanitize_alt_text(" \n "), "");
    }
}
