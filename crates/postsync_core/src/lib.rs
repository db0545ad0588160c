//! Core domain logic for PostSync.
//! Pulls paginated remote posts into a local content store, idempotently.

pub mod config;
pub mod db;
pub mod logging;
pub mod media;
pub mod model;
pub mod service;
pub mod source;
pub mod store;

pub use config::{ConfigError, SyncConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use media::{HttpImageSource, ImageSource, MediaAttachError, MediaAttacher};
pub use model::record::{LocalRecord, RecordId, RecordKind, RecordStatus, Taxonomy, TermRef};
pub use model::remote::{Page, PageRequest, RemoteItem};
pub use service::cleanup_service::{
    CleanupOptions, CleanupOrchestrator, CleanupOutcome, CleanupReport,
};
pub use service::resolver::{Existence, ExistenceResolver, MatchedBy};
pub use service::sync_service::{ImportOptions, ImportOutcome, ImportReport, SyncOrchestrator};
pub use service::SyncError;
pub use source::{FetchError, HttpPostSource, RemoteSource, SourceError};
pub use store::{ContentStore, InMemoryContentStore, SqliteContentStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
