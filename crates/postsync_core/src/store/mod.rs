//! Content store contract and implementations.
//!
//! # Responsibility
//! - Define the narrow capability set the sync and cleanup pipelines need
//!   from the local content store.
//! - Provide a SQLite-backed store and an in-memory store with the same
//!   contract.
//!
//! # Invariants
//! - `find_record` ignores lifecycle status and returns at most one record.
//! - `delete_record` is a hard delete; attached media are not touched.
//! - `set_record_terms` replaces the record's terms for one taxonomy.
//! - Term names are normalized with `normalize_term_names` before assignment.
//!
//! # See also
//! - docs/architecture/sync-pipeline.md

pub mod memory;
pub mod sqlite;

use crate::db::DbError;
use crate::model::record::{
    LocalRecord, MediaAsset, MediaId, MediaUpdate, NewRecord, RecordId, RecordKind, RecordLookup,
    RecordValidationError, Taxonomy, TermId, TermRef,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub use memory::InMemoryContentStore;
pub use sqlite::SqliteContentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Content store failure.
#[derive(Debug)]
pub enum StoreError {
    Validation(RecordValidationError),
    Db(DbError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    RecordNotFound(RecordId),
    MediaNotFound(MediaId),
    TermNotFound(TermId),
    InvalidData(String),
    /// The store refused the operation.
    Rejected(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::MediaNotFound(id) => write!(f, "media not found: {id}"),
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Rejected(message) => write!(f, "store rejected operation: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for StoreError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// A staged file handed to `ContentStore::sideload_media`.
#[derive(Debug, Clone, Copy)]
pub struct MediaUpload<'a> {
    pub record_id: RecordId,
    /// Staged file; the store copies it and never takes ownership.
    pub source_path: &'a Path,
    pub file_name: &'a str,
    pub title: &'a str,
}

/// Capability set required from the local content store.
pub trait ContentStore {
    /// Returns the first record matching kind + key, any status.
    fn find_record(&self, lookup: &RecordLookup) -> StoreResult<Option<LocalRecord>>;
    fn get_record(&self, id: RecordId) -> StoreResult<Option<LocalRecord>>;
    fn create_record(&mut self, record: &NewRecord) -> StoreResult<RecordId>;
    /// Permanently deletes a record and its term relationships.
    fn delete_record(&mut self, id: RecordId) -> StoreResult<()>;
    fn attached_media(&self, record_id: RecordId) -> StoreResult<Vec<MediaAsset>>;
    /// Ingests a staged file into the media library, owned by `record_id`.
    fn sideload_media(&mut self, upload: &MediaUpload<'_>) -> StoreResult<MediaId>;
    fn update_media(&mut self, id: MediaId, update: &MediaUpdate) -> StoreResult<()>;
    fn set_featured_media(&mut self, record_id: RecordId, media_id: MediaId) -> StoreResult<()>;
    /// Permanently deletes a media asset and its stored file.
    fn delete_media(&mut self, id: MediaId) -> StoreResult<()>;
    /// Replaces the record's terms in `taxonomy`, creating missing terms.
    fn set_record_terms(
        &mut self,
        record_id: RecordId,
        taxonomy: Taxonomy,
        names: &[String],
    ) -> StoreResult<Vec<TermRef>>;
    fn record_terms(&self, record_id: RecordId, taxonomy: Taxonomy) -> StoreResult<Vec<TermRef>>;
    /// Lists records of `kind` (any status) referencing `term`.
    fn records_with_term(&self, term: &TermRef, kind: RecordKind) -> StoreResult<Vec<RecordId>>;
    fn delete_term(&mut self, term: &TermRef) -> StoreResult<()>;
}

impl<S: ContentStore + ?Sized> ContentStore for &mut S {
    fn find_record(&self, lookup: &RecordLookup) -> StoreResult<Option<LocalRecord>> {
        (**self).find_record(lookup)
    }

    fn get_record(&self, id: RecordId) -> StoreResult<Option<LocalRecord>> {
        (**self).get_record(id)
    }

    fn create_record(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        (**self).create_record(record)
    }

    fn delete_record(&mut self, id: RecordId) -> StoreResult<()> {
        (**self).delete_record(id)
    }

    fn attached_media(&self, record_id: RecordId) -> StoreResult<Vec<MediaAsset>> {
        (**self).attached_media(record_id)
    }

    fn sideload_media(&mut self, upload: &MediaUpload<'_>) -> StoreResult<MediaId> {
        (**self).sideload_media(upload)
    }

    fn update_media(&mut self, id: MediaId, update: &MediaUpdate) -> StoreResult<()> {
        (**self).update_media(id, update)
    }

    fn set_featured_media(&mut self, record_id: RecordId, media_id: MediaId) -> StoreResult<()> {
        (**self).set_featured_media(record_id, media_id)
    }

    fn delete_media(&mut self, id: MediaId) -> StoreResult<()> {
        (**self).delete_media(id)
    }

    fn set_record_terms(
        &mut self,
        record_id: RecordId,
        taxonomy: Taxonomy,
        names: &[String],
    ) -> StoreResult<Vec<TermRef>> {
        (**self).set_record_terms(record_id, taxonomy, names)
    }

    fn record_terms(&self, record_id: RecordId, taxonomy: Taxonomy) -> StoreResult<Vec<TermRef>> {
        (**self).record_terms(record_id, taxonomy)
    }

    fn records_with_term(&self, term: &TermRef, kind: RecordKind) -> StoreResult<Vec<RecordId>> {
        (**self).records_with_term(term, kind)
    }

    fn delete_term(&mut self, term: &TermRef) -> StoreResult<()> {
        (**self).delete_term(term)
    }
}

/// Trims term names, drops blanks and de-duplicates case-insensitively.
///
/// The first spelling of a name wins; input order is preserved.
pub fn normalize_term_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}
