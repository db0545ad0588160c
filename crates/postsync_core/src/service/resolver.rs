//! Existence resolution for remote items.
//!
//! # Responsibility
//! - Decide whether a remote item already has a local record.
//!
//! # Invariants
//! - Resolution never mutates the store.
//! - An item carrying a remote id matches by that id first; its title only
//!   matches records that have no remote id of their own.
//! - Title matching is exact and case-sensitive.

use crate::model::record::{LocalRecord, RecordId, RecordKind, RecordLookup};
use crate::model::remote::RemoteItem;
use crate::store::{ContentStore, StoreResult};

/// Which key produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    ExternalId,
    Title,
}

/// Result of an existence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    Present {
        record: LocalRecord,
        matched_by: MatchedBy,
    },
    Absent,
}

impl Existence {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::Present { record, .. } => Some(record.id),
            Self::Absent => None,
        }
    }
}

/// Resolves remote items against records of one kind.
#[derive(Debug, Clone, Copy)]
pub struct ExistenceResolver {
    kind: RecordKind,
}

impl Default for ExistenceResolver {
    fn default() -> Self {
        Self::new(RecordKind::Post)
    }
}

impl ExistenceResolver {
    pub fn new(kind: RecordKind) -> Self {
        Self { kind }
    }

    /// Single exact-title query, any status, at most one result.
    pub fn find_by_title<S: ContentStore + ?Sized>(
        &self,
        store: &S,
        title: &str,
    ) -> StoreResult<Existence> {
        let lookup = RecordLookup {
            kind: self.kind,
            ..RecordLookup::post_titled(title)
        };
        Ok(match store.find_record(&lookup)? {
            Some(record) => Existence::Present {
                record,
                matched_by: MatchedBy::Title,
            },
            None => Existence::Absent,
        })
    }

    /// Resolves by remote id when the item has one, else by title.
    pub fn resolve<S: ContentStore + ?Sized>(
        &self,
        store: &S,
        item: &RemoteItem,
    ) -> StoreResult<Existence> {
        let Some(external_id) = item.external_id else {
            return self.find_by_title(store, &item.title);
        };

        let lookup = RecordLookup {
            kind: self.kind,
            ..RecordLookup::post_with_external_id(external_id)
        };
        if let Some(record) = store.find_record(&lookup)? {
            return Ok(Existence::Present {
                record,
                matched_by: MatchedBy::ExternalId,
            });
        }

        let untracked = RecordLookup {
            kind: self.kind,
            ..RecordLookup::untracked_post_titled(&item.title)
        };
        Ok(match store.find_record(&untracked)? {
            Some(record) => Existence::Present {
                record,
                matched_by: MatchedBy::Title,
            },
            None => Existence::Absent,
        })
    }
}
