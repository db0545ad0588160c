//! Import orchestration.
//!
//! # Responsibility
//! - Import one unpaged batch or every page of the remote source.
//! - Skip items that already exist, create the rest, then attach a
//!   placeholder image and assign taxonomy terms.
//!
//! # Invariants
//! - `total_processed` counts every item seen, whatever its outcome.
//! - Pagination advances `skip` by `limit` and stops once `skip >= total`
//!   or the source reports an empty page.
//! - Media and term failures never undo the created record.

use crate::config::SyncConfig;
use crate::media::{AttachRequest, ImageSource, MediaAttachError, MediaAttacher};
use crate::model::record::{AuthorId, MediaId, NewRecord, RecordId, Taxonomy, TermRef};
use crate::model::remote::{Page, PageRequest, RemoteItem};
use crate::service::resolver::{Existence, ExistenceResolver};
use crate::service::SyncError;
use crate::source::{RemoteSource, SourceError};
use crate::store::{ContentStore, StoreError};
use log::{info, warn};

/// Per-run import settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Taxonomies the remote tags are assigned to, in order.
    pub taxonomies: Vec<Taxonomy>,
    pub attach_media: bool,
    pub author_id: AuthorId,
    pub page_limit: u64,
}

impl ImportOptions {
    /// Tags only, matching the single-batch command.
    pub fn batch(config: &SyncConfig) -> Self {
        Self {
            taxonomies: vec![Taxonomy::Tag],
            attach_media: true,
            author_id: config.author_id,
            page_limit: config.page_limit,
        }
    }

    /// Categories and tags, matching the paginated command.
    pub fn paginated(config: &SyncConfig) -> Self {
        Self {
            taxonomies: vec![Taxonomy::Category, Taxonomy::Tag],
            ..Self::batch(config)
        }
    }
}

/// Outcome of the featured-image step.
#[derive(Debug)]
pub enum MediaOutcome {
    Attached(MediaId),
    Failed(MediaAttachError),
    Disabled,
}

/// Outcome of assigning tags to one taxonomy.
#[derive(Debug)]
pub enum TermOutcome {
    Assigned {
        taxonomy: Taxonomy,
        terms: Vec<TermRef>,
    },
    Failed {
        taxonomy: Taxonomy,
        error: StoreError,
    },
}

/// Outcome of importing one remote item.
#[derive(Debug)]
pub enum ImportOutcome {
    Created {
        title: String,
        record_id: RecordId,
        media: MediaOutcome,
        /// Empty when the item has no tags.
        terms: Vec<TermOutcome>,
    },
    Skipped {
        title: String,
        existing_id: RecordId,
    },
    CreateFailed {
        title: String,
        error: StoreError,
    },
}

impl ImportOutcome {
    pub fn title(&self) -> &str {
        match self {
            Self::Created { title, .. }
            | Self::Skipped { title, .. }
            | Self::CreateFailed { title, .. } => title,
        }
    }
}

/// Counters and outcomes for one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub total_processed: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pages: usize,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    fn record(&mut self, outcome: ImportOutcome) {
        self.total_processed += 1;
        match &outcome {
            ImportOutcome::Created { .. } => self.created += 1,
            ImportOutcome::Skipped { .. } => self.skipped += 1,
            ImportOutcome::CreateFailed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Drives imports from a remote source into a content store.
pub struct SyncOrchestrator<R, S, I>
where
    R: RemoteSource,
    S: ContentStore,
    I: ImageSource,
{
    source: R,
    store: S,
    attacher: MediaAttacher<I>,
    resolver: ExistenceResolver,
    options: ImportOptions,
}

impl<R, S, I> SyncOrchestrator<R, S, I>
where
    R: RemoteSource,
    S: ContentStore,
    I: ImageSource,
{
    pub fn new(source: R, store: S, attacher: MediaAttacher<I>, options: ImportOptions) -> Self {
        Self {
            source,
            store,
            attacher,
            resolver: ExistenceResolver::default(),
            options,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Imports the unpaged batch returned by the bare endpoint.
    ///
    /// An empty batch is reported as a zero-item run, not an error.
    pub fn import_batch(&mut self) -> Result<ImportReport, SyncError> {
        let mut report = ImportReport::default();
        info!("event=import_batch module=sync status=start");

        let page = match self.source.fetch_page(PageRequest::Unpaged) {
            Ok(page) => page,
            Err(SourceError::EmptyResult) => {
                warn!("event=import_batch module=sync status=skip reason=no_items");
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

        self.import_page(&page, &mut report)?;
        info!(
            "event=import_batch module=sync status=ok processed={} created={} skipped={} failed={}",
            report.total_processed, report.created, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Imports every page using `limit`/`skip` pagination.
    pub fn import_all(&mut self) -> Result<ImportReport, SyncError> {
        let limit = self.options.page_limit.max(1);
        let mut skip = 0;
        let mut report = ImportReport::default();

        loop {
            info!("event=import_page module=sync status=start skip={skip} limit={limit}");
            let page = match self.source.fetch_page(PageRequest::Window { limit, skip }) {
                Ok(page) => page,
                Err(SourceError::EmptyResult) => {
                    info!(
                        "event=import_all module=sync status=ok reason=no_more_items processed={}",
                        report.total_processed
                    );
                    break;
                }
                Err(SourceError::Fetch(source)) => {
                    return Err(SyncError::Fetch {
                        skip,
                        processed: report.total_processed,
                        source,
                    })
                }
            };

            self.import_page(&page, &mut report)?;

            skip += limit;
            if skip >= page.total {
                info!(
                    "event=import_all module=sync status=ok reason=all_fetched processed={} pages={}",
                    report.total_processed, report.pages
                );
                break;
            }
        }

        Ok(report)
    }

    fn import_page(&mut self, page: &Page, report: &mut ImportReport) -> Result<(), SyncError> {
        report.pages += 1;
        for item in &page.items {
            let outcome = self.import_item(item).map_err(|source| SyncError::Store {
                title: item.title.clone(),
                processed: report.total_processed,
                source,
            })?;
            report.record(outcome);
        }
        Ok(())
    }

    /// Imports one item; only the existence lookup can fail the call.
    pub fn import_item(&mut self, item: &RemoteItem) -> Result<ImportOutcome, StoreError> {
        if let Existence::Present { record, matched_by } = self.resolver.resolve(&self.store, item)? {
            warn!(
                "event=import_item module=sync status=skip reason=exists record_id={} matched_by={:?} title={:?}",
                record.id, matched_by, item.title
            );
            return Ok(ImportOutcome::Skipped {
                title: item.title.clone(),
                existing_id: record.id,
            });
        }

        info!("event=import_item module=sync status=start title={:?}", item.title);
        let mut new_record =
            NewRecord::published_post(&item.title, &item.body, self.options.author_id);
        new_record.external_id = item.external_id;

        let record_id = match self.store.create_record(&new_record) {
            Ok(record_id) => record_id,
            Err(error) => {
                warn!(
                    "event=import_item module=sync status=warn stage=create title={:?} error={error}",
                    item.title
                );
                return Ok(ImportOutcome::CreateFailed {
                    title: item.title.clone(),
                    error,
                });
            }
        };

        let media = self.attach_media(record_id, item);
        let terms = self.assign_terms(record_id, item);

        info!(
            "event=import_item module=sync status=ok record_id={record_id} title={:?}",
            item.title
        );
        Ok(ImportOutcome::Created {
            title: item.title.clone(),
            record_id,
            media,
            terms,
        })
    }

    fn attach_media(&mut self, record_id: RecordId, item: &RemoteItem) -> MediaOutcome {
        if !self.options.attach_media {
            return MediaOutcome::Disabled;
        }

        let request = AttachRequest {
            record_id,
            title: item.title.clone(),
            author_id: self.options.author_id,
            alt_text: item.title.clone(),
            caption: item.title.clone(),
        };
        match self
            .attacher
            .attach_placeholder_image(&mut self.store, &request)
        {
            Ok(media_id) => MediaOutcome::Attached(media_id),
            Err(err) => {
                warn!(
                    "event=import_item module=sync status=warn stage=media record_id={record_id} error={err}"
                );
                MediaOutcome::Failed(err)
            }
        }
    }

    fn assign_terms(&mut self, record_id: RecordId, item: &RemoteItem) -> Vec<TermOutcome> {
        if item.tags.is_empty() {
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(self.options.taxonomies.len());
        for &taxonomy in &self.options.taxonomies {
            match self.store.set_record_terms(record_id, taxonomy, &item.tags) {
                Ok(terms) => outcomes.push(TermOutcome::Assigned { taxonomy, terms }),
                Err(error) => {
                    warn!(
                        "event=import_item module=sync status=warn stage=terms taxonomy={} record_id={record_id} error={error}",
                        taxonomy.as_str()
                    );
                    outcomes.push(TermOutcome::Failed { taxonomy, error });
                }
            }
        }
        outcomes
    }
}
