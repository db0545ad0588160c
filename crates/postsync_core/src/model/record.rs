//! Local content records, taxonomy terms and media assets.
//!
//! # Responsibility
//! - Define the store-owned shapes the orchestrators read and write.
//! - Provide db string mappings for enum columns.
//!
//! # Invariants
//! - A `NewRecord` with both blank title and blank body is rejected.
//! - `TermRef` identity is `(taxonomy, id)`; names are informational.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RecordId = i64;
pub type MediaId = i64;
pub type TermId = i64;
pub type AuthorId = i64;

/// Content kind constraint for record lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Post,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            _ => None,
        }
    }
}

/// Lifecycle status of a local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    Pending,
    Private,
    Published,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "private" => Some(Self::Private),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// Taxonomy a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    Category,
    Tag,
}

impl Taxonomy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "category" => Some(Self::Category),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// Reference to a taxonomy term shared across records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermRef {
    pub id: TermId,
    pub taxonomy: Taxonomy,
    pub name: String,
}

/// A unit of content owned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub title: String,
    pub body: String,
    pub status: RecordStatus,
    pub author_id: AuthorId,
    /// Remote source id this record was imported from, when known.
    pub external_id: Option<i64>,
    pub featured_media_id: Option<MediaId>,
}

/// Creation input for a local record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub title: String,
    pub body: String,
    pub status: RecordStatus,
    pub author_id: AuthorId,
    pub external_id: Option<i64>,
}

impl NewRecord {
    /// Creates a published post owned by `author_id`.
    pub fn published_post(
        title: impl Into<String>,
        body: impl Into<String>,
        author_id: AuthorId,
    ) -> Self {
        Self {
            kind: RecordKind::Post,
            title: title.into(),
            body: body.into(),
            status: RecordStatus::Published,
            author_id,
            external_id: None,
        }
    }

    /// Validates creation input before it reaches persistence.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.title.trim().is_empty() && self.body.trim().is_empty() {
            return Err(RecordValidationError::EmptyContent);
        }
        if self.author_id <= 0 {
            return Err(RecordValidationError::InvalidAuthor(self.author_id));
        }
        Ok(())
    }
}

/// Validation failures for `NewRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    EmptyContent,
    InvalidAuthor(AuthorId),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "record title and body are both empty"),
            Self::InvalidAuthor(id) => write!(f, "invalid author id {id}"),
        }
    }
}

impl Error for RecordValidationError {}

/// Lookup key for an existence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    /// Exact, case-sensitive title match.
    Title(String),
    /// Exact title match restricted to records without a remote id.
    UntrackedTitle(String),
    ExternalId(i64),
}

/// Existence query: kind constraint plus one key, any lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLookup {
    pub kind: RecordKind,
    pub key: RecordKey,
}

impl RecordLookup {
    pub fn post_titled(title: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Post,
            key: RecordKey::Title(title.into()),
        }
    }

    pub fn untracked_post_titled(title: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Post,
            key: RecordKey::UntrackedTitle(title.into()),
        }
    }

    pub fn post_with_external_id(external_id: i64) -> Self {
        Self {
            kind: RecordKind::Post,
            key: RecordKey::ExternalId(external_id),
        }
    }
}

/// A file ingested into the store's media library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub id: MediaId,
    pub owner_record_id: RecordId,
    pub author_id: AuthorId,
    pub file_name: String,
    pub title: String,
    pub alt_text: String,
    pub caption: String,
    pub excerpt: String,
    pub byte_len: u64,
}

/// Metadata written to a media asset after sideloading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaUpdate {
    pub author_id: Option<AuthorId>,
    pub caption: Option<String>,
    pub excerpt: Option<String>,
    pub alt_text: Option<String>,
}
