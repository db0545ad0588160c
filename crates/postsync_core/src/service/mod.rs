//! Sync and cleanup use-case services.
//!
//! # Responsibility
//! - Drive the fetch -> resolve -> create/skip -> attach -> tag loop.
//! - Drive the fetch -> resolve -> prune terms -> delete media -> delete
//!   record loop.
//! - Report per-item outcomes as values instead of log text.
//!
//! # Invariants
//! - Only page fetch failures and store lookup failures abort a run.
//! - Nothing is rolled back; partially imported items stay as they are.
//!
//! # See also
//! - docs/architecture/sync-pipeline.md

pub mod cleanup_service;
pub mod resolver;
pub mod sync_service;

use crate::source::FetchError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure that aborts an import or cleanup run.
#[derive(Debug)]
pub enum SyncError {
    /// A page could not be fetched; later pages were not attempted.
    Fetch {
        skip: u64,
        processed: usize,
        source: FetchError,
    },
    /// The existence lookup failed, so idempotence cannot be guaranteed.
    Store {
        title: String,
        processed: usize,
        source: StoreError,
    },
}

impl SyncError {
    /// Items processed before the run aborted.
    pub fn processed(&self) -> usize {
        match self {
            Self::Fetch { processed, .. } | Self::Store { processed, .. } => *processed,
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch {
                skip,
                processed,
                source,
            } => write!(
                f,
                "failed to fetch page at skip={skip} after {processed} items: {source}"
            ),
            Self::Store {
                title,
                processed,
                source,
            } => write!(
                f,
                "failed to look up `{title}` after {processed} items: {source}"
            ),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
        }
    }
}
