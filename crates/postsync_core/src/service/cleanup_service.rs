//! Cleanup orchestration for previously imported records.
//!
//! # Responsibility
//! - Walk the remote source like the import does and permanently delete the
//!   matching local records.
//! - Remove attached media and, when enabled, taxonomy terms no other
//!   record uses.
//!
//! # Invariants
//! - Term reference counts are read live while the record still exists.
//! - A term is deleted only when the record being deleted is its sole
//!   referencing record; shared terms survive.
//! - Terms and media are handled before the record delete is issued.

use crate::config::SyncConfig;
use crate::model::record::{MediaId, RecordId, RecordKind, Taxonomy, TermRef};
use crate::model::remote::{Page, PageRequest, RemoteItem};
use crate::service::resolver::{Existence, ExistenceResolver};
use crate::service::SyncError;
use crate::source::{RemoteSource, SourceError};
use crate::store::{ContentStore, StoreError};
use log::{info, warn};

const PRUNED_TAXONOMIES: [Taxonomy; 2] = [Taxonomy::Category, Taxonomy::Tag];

/// Per-run cleanup settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Delete categories/tags exclusively owned by deleted records.
    pub prune_terms: bool,
    pub page_limit: u64,
}

impl CleanupOptions {
    /// Media and record only, matching the single-batch command.
    pub fn batch(config: &SyncConfig) -> Self {
        Self {
            prune_terms: false,
            page_limit: config.page_limit,
        }
    }

    /// Also prunes exclusively-owned terms, matching the paginated command.
    pub fn paginated(config: &SyncConfig) -> Self {
        Self {
            prune_terms: true,
            ..Self::batch(config)
        }
    }
}

/// What happened to the terms of one deleted record.
#[derive(Debug, Default)]
pub struct TermCleanup {
    pub deleted: Vec<TermRef>,
    /// Still referenced by other records.
    pub retained: Vec<TermRef>,
    pub failed: Vec<(TermRef, StoreError)>,
}

/// Outcome of cleaning up one remote item.
#[derive(Debug)]
pub enum CleanupOutcome {
    Deleted {
        title: String,
        record_id: RecordId,
        terms: TermCleanup,
        media_deleted: Vec<MediaId>,
        media_failed: Vec<(MediaId, StoreError)>,
    },
    NotFound {
        title: String,
    },
    DeleteFailed {
        title: String,
        record_id: RecordId,
        error: StoreError,
    },
}

impl CleanupOutcome {
    pub fn title(&self) -> &str {
        match self {
            Self::Deleted { title, .. }
            | Self::NotFound { title }
            | Self::DeleteFailed { title, .. } => title,
        }
    }
}

/// Counters and outcomes for one cleanup run.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Every item seen, whatever its outcome.
    pub total_deleted: usize,
    pub removed: usize,
    pub missing: usize,
    pub failed: usize,
    pub pages: usize,
    pub outcomes: Vec<CleanupOutcome>,
}

impl CleanupReport {
    fn record(&mut self, outcome: CleanupOutcome) {
        self.total_deleted += 1;
        match &outcome {
            CleanupOutcome::Deleted { .. } => self.removed += 1,
            CleanupOutcome::NotFound { .. } => self.missing += 1,
            CleanupOutcome::DeleteFailed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Drives deletion of records matching the remote source.
pub struct CleanupOrchestrator<R: RemoteSource, S: ContentStore> {
    source: R,
    store: S,
    resolver: ExistenceResolver,
    options: CleanupOptions,
}

impl<R: RemoteSource, S: ContentStore> CleanupOrchestrator<R, S> {
    pub fn new(source: R, store: S, options: CleanupOptions) -> Self {
        Self {
            source,
            store,
            resolver: ExistenceResolver::default(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Deletes records matching the unpaged batch.
    pub fn delete_batch(&mut self) -> Result<CleanupReport, SyncError> {
        let mut report = CleanupReport::default();
        info!("event=delete_batch module=cleanup status=start");

        let page = match self.source.fetch_page(PageRequest::Unpaged) {
            Ok(page) => page,
            Err(SourceError::EmptyResult) => {
                warn!("event=delete_batch module=cleanup status=skip reason=no_items");
                return Ok(report);
            }
            Err(SourceError::Fetch(source)) => {
                return Err(SyncError::Fetch {
                    skip: 0,
                    processed: 0,
                    source,
                })
            }
        };

        self.delete_page(&page, &mut report)?;
        info!(
            "event=delete_batch module=cleanup status=ok processed={} removed={} missing={}",
            report.total_deleted, report.removed, report.missing
        );
        Ok(report)
    }

    /// Deletes records matching every remote page.
    pub fn delete_all(&mut self) -> Result<CleanupReport, SyncError> {
        let limit = self.options.page_limit.max(1);
        let mut skip = 0;
        let mut report = CleanupReport::default();

        loop {
            info!("event=delete_page module=cleanup status=start skip={skip} limit={limit}");
            let page = match self.source.fetch_page(PageRequest::Window { limit, skip }) {
                Ok(page) => page,
                Err(SourceError::EmptyResult) => {
                    info!(
                        "event=delete_all module=cleanup status=ok reason=no_more_items processed={}",
                        report.total_deleted
                    );
                    break;
                }
                Err(SourceError::Fetch(source)) => {
                    return Err(SyncError::Fetch {
                        skip,
                        processed: report.total_deleted,
                        source,
                    })
                }
            };

            self.delete_page(&page, &mut report)?;

            skip += limit;
            if skip >= page.total {
                info!(
                    "event=delete_all module=cleanup status=ok reason=all_fetched processed={} removed={}",
                    report.total_deleted, report.removed
                );
                break;
            }
        }

        Ok(report)
    }

    fn delete_page(&mut self, page: &Page, report: &mut CleanupReport) -> Result<(), SyncError> {
        report.pages += 1;
        for item in &page.items {
            let outcome = self.delete_item(item).map_err(|source| SyncError::Store {
                title: item.title.clone(),
                processed: report.total_deleted,
                source,
            })?;
            report.record(outcome);
        }
        Ok(())
    }

    /// Deletes the record matching one item; only the lookup can fail the call.
    pub fn delete_item(&mut self, item: &RemoteItem) -> Result<CleanupOutcome, StoreError> {
        let record = match self.resolver.resolve(&self.store, item)? {
            Existence::Present { record, .. } => record,
            Existence::Absent => {
                warn!(
                    "event=delete_item module=cleanup status=skip reason=not_found title={:?}",
                    item.title
                );
                return Ok(CleanupOutcome::NotFound {
                    title: item.title.clone(),
                });
            }
        };

        let terms = if self.options.prune_terms {
            self.prune_terms(record.id)
        } else {
            TermCleanup::default()
        };
        let (media_deleted, media_failed) = self.delete_media(record.id);

        if let Err(error) = self.store.delete_record(record.id) {
            warn!(
                "event=delete_item module=cleanup status=warn stage=record record_id={} error={error}",
                record.id
            );
            return Ok(CleanupOutcome::DeleteFailed {
                title: item.title.clone(),
                record_id: record.id,
                error,
            });
        }

        info!(
            "event=delete_item module=cleanup status=ok record_id={} terms_deleted={} terms_retained={} media_deleted={}",
            record.id,
            terms.deleted.len(),
            terms.retained.len(),
            media_deleted.len()
        );
        Ok(CleanupOutcome::Deleted {
            title: item.title.clone(),
            record_id: record.id,
            terms,
            media_deleted,
            media_failed,
        })
    }

    fn prune_terms(&mut self, record_id: RecordId) -> TermCleanup {
        let mut cleanup = TermCleanup::default();
        for taxonomy in PRUNED_TAXONOMIES {
            let terms = match self.store.record_terms(record_id, taxonomy) {
                Ok(terms) => terms,
                Err(err) => {
                    warn!(
                        "event=delete_item module=cleanup status=warn stage=terms taxonomy={} record_id={record_id} error={err}",
                        taxonomy.as_str()
                    );
                    continue;
                }
            };

            for term in terms {
                match self.prune_term(record_id, &term) {
                    Ok(true) => cleanup.deleted.push(term),
                    Ok(false) => cleanup.retained.push(term),
                    Err(err) => {
                        warn!(
                            "event=delete_item module=cleanup status=warn stage=terms term_id={} error={err}",
                            term.id
                        );
                        cleanup.failed.push((term, err));
                    }
                }
            }
        }
        cleanup
    }

    /// Returns whether the term was deleted.
    fn prune_term(&mut self, record_id: RecordId, term: &TermRef) -> Result<bool, StoreError> {
        let referencing = self.store.records_with_term(term, RecordKind::Post)?;
        if referencing != [record_id] {
            return Ok(false);
        }
        self.store.delete_term(term)?;
        Ok(true)
    }

    fn delete_media(&mut self, record_id: RecordId) -> (Vec<MediaId>, Vec<(MediaId, StoreError)>) {
        let attached = match self.store.attached_media(record_id) {
            Ok(attached) => attached,
            Err(err) => {
                warn!(
                    "event=delete_item module=cleanup status=warn stage=media record_id={record_id} error={err}"
                );
                return (Vec::new(), Vec::new());
            }
        };

        let mut deleted = Vec::with_capacity(attached.len());
        let mut failed = Vec::new();
        for asset in attached {
            match self.store.delete_media(asset.id) {
                Ok(()) => deleted.push(asset.id),
                Err(err) => {
                    warn!(
                        "event=delete_item module=cleanup status=warn stage=media media_id={} error={err}",
                        asset.id
                    );
                    failed.push((asset.id, err));
                }
            }
        }
        (deleted, failed)
    }
}
