//! In-memory content store.
//!
//! # Responsibility
//! - Implement the `ContentStore` contract without any database.
//! - Let callers inject store-side failures to exercise non-fatal paths.
//!
//! # Invariants
//! - Identifiers are allocated monotonically per entity and never reused.
//! - Sideloading reads the staged file eagerly; the file may vanish afterwards.

use crate::model::record::{
    LocalRecord, MediaAsset, MediaId, MediaUpdate, NewRecord, RecordId, RecordKey, RecordKind,
    RecordLookup, Taxonomy, TermId, TermRef,
};
use crate::store::{normalize_term_names, ContentStore, MediaUpload, StoreError, StoreResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;

#[derive(Debug, Clone)]
struct StoredMedia {
    asset: MediaAsset,
    bytes: Vec<u8>,
}

/// Content store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    records: BTreeMap<RecordId, LocalRecord>,
    media: BTreeMap<MediaId, StoredMedia>,
    terms: BTreeMap<TermId, TermRef>,
    record_terms: BTreeSet<(RecordId, TermId)>,
    next_record_id: RecordId,
    next_media_id: MediaId,
    next_term_id: TermId,
    failing_titles: HashSet<String>,
    fail_term_assignment: bool,
    fail_sideload: bool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_record` reject records with this exact title.
    pub fn fail_create_for(&mut self, title: impl Into<String>) {
        self.failing_titles.insert(title.into());
    }

    /// Makes `set_record_terms` fail for every record.
    pub fn set_fail_term_assignment(&mut self, enabled: bool) {
        self.fail_term_assignment = enabled;
    }

    /// Makes `sideload_media` fail for every upload.
    pub fn set_fail_sideload(&mut self, enabled: bool) {
        self.fail_sideload = enabled;
    }

    /// All records in id order.
    pub fn records(&self) -> Vec<&LocalRecord> {
        self.records.values().collect()
    }

    /// All media assets in id order.
    pub fn media(&self) -> Vec<&MediaAsset> {
        self.media.values().map(|stored| &stored.asset).collect()
    }

    /// Bytes ingested for one media asset.
    pub fn media_bytes(&self, id: MediaId) -> Option<&[u8]> {
        self.media.get(&id).map(|stored| stored.bytes.as_slice())
    }

    /// All terms of one taxonomy in id order.
    pub fn terms(&self, taxonomy: Taxonomy) -> Vec<&TermRef> {
        self.terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .collect()
    }

    /// Finds a term by taxonomy and case-insensitive name.
    pub fn term_named(&self, taxonomy: Taxonomy, name: &str) -> Option<&TermRef> {
        self.terms
            .values()
            .find(|term| term.taxonomy == taxonomy && term.name.eq_ignore_ascii_case(name))
    }

    fn allocate_term(&mut self, taxonomy: Taxonomy, name: &str) -> TermId {
        if let Some(existing) = self.term_named(taxonomy, name) {
            return existing.id;
        }
        self.next_term_id += 1;
        let id = self.next_term_id;
        self.terms.insert(
            id,
            TermRef {
                id,
                taxonomy,
                name: name.to_string(),
            },
        );
        id
    }
}

impl ContentStore for InMemoryContentStore {
    fn find_record(&self, lookup: &RecordLookup) -> StoreResult<Option<LocalRecord>> {
        let found = self.records.values().find(|record| {
            record.kind == lookup.kind
                && match &lookup.key {
                    RecordKey::Title(title) => record.title == *title,
                    RecordKey::UntrackedTitle(title) => {
                        record.external_id.is_none() && record.title == *title
                    }
                    RecordKey::ExternalId(external_id) => record.external_id == Some(*external_id),
                }
        });
        Ok(found.cloned())
    }

    fn get_record(&self, id: RecordId) -> StoreResult<Option<LocalRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn create_record(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        record.validate()?;
        if self.failing_titles.contains(&record.title) {
            return Err(StoreError::Rejected(format!(
                "create refused for `{}`",
                record.title
            )));
        }

        self.next_record_id += 1;
        let id = self.next_record_id;
        self.records.insert(
            id,
            LocalRecord {
                id,
                kind: record.kind,
                title: record.title.clone(),
                body: record.body.clone(),
                status: record.status,
                author_id: record.author_id,
                external_id: record.external_id,
                featured_media_id: None,
            },
        );
        Ok(id)
    }

    fn delete_record(&mut self, id: RecordId) -> StoreResult<()> {
        if self.records.remove(&id).is_none() {
            return Err(StoreError::RecordNotFound(id));
        }
        self.record_terms.retain(|(record_id, _)| *record_id != id);
        Ok(())
    }

    fn attached_media(&self, record_id: RecordId) -> StoreResult<Vec<MediaAsset>> {
        Ok(self
            .media
            .values()
            .filter(|stored| stored.asset.owner_record_id == record_id)
            .map(|stored| stored.asset.clone())
            .collect())
    }

    fn sideload_media(&mut self, upload: &MediaUpload<'_>) -> StoreResult<MediaId> {
        if self.fail_sideload {
            return Err(StoreError::Rejected(format!(
                "sideload refused for `{}`",
                upload.file_name
            )));
        }
        let author_id = self
            .records
            .get(&upload.record_id)
            .map(|record| record.author_id)
            .ok_or(StoreError::RecordNotFound(upload.record_id))?;
        let bytes = fs::read(upload.source_path).map_err(|source| StoreError::Io {
            path: upload.source_path.to_path_buf(),
            source,
        })?;

        self.next_media_id += 1;
        let id = self.next_media_id;
        let asset = MediaAsset {
            id,
            owner_record_id: upload.record_id,
            author_id,
            file_name: upload.file_name.to_string(),
            title: upload.title.to_string(),
            alt_text: String::new(),
            caption: String::new(),
            excerpt: String::new(),
            byte_len: bytes.len() as u64,
        };
        self.media.insert(id, StoredMedia { asset, bytes });
        Ok(id)
    }

    fn update_media(&mut self, id: MediaId, update: &MediaUpdate) -> StoreResult<()> {
        let stored = self.media.get_mut(&id).ok_or(StoreError::MediaNotFound(id))?;
        let asset = &mut stored.asset;
        if let Some(author_id) = update.author_id {
            asset.author_id = author_id;
        }
        if let Some(caption) = &update.caption {
            asset.caption = caption.clone();
        }
        if let Some(excerpt) = &update.excerpt {
            asset.excerpt = excerpt.clone();
        }
        if let Some(alt_text) = &update.alt_text {
            asset.alt_text = alt_text.clone();
        }
        Ok(())
    }

    fn set_featured_media(&mut self, record_id: RecordId, media_id: MediaId) -> StoreResult<()> {
        if !self.media.contains_key(&media_id) {
            return Err(StoreError::MediaNotFound(media_id));
        }
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(StoreError::RecordNotFound(record_id))?;
        record.featured_media_id = Some(media_id);
        Ok(())
    }

    fn delete_media(&mut self, id: MediaId) -> StoreResult<()> {
        if self.media.remove(&id).is_none() {
            return Err(StoreError::MediaNotFound(id));
        }
        for record in self.records.values_mut() {
            if record.featured_media_id == Some(id) {
                record.featured_media_id = None;
            }
        }
        Ok(())
    }

    fn set_record_terms(
        &mut self,
        record_id: RecordId,
        taxonomy: Taxonomy,
        names: &[String],
    ) -> StoreResult<Vec<TermRef>> {
        if self.fail_term_assignment {
            return Err(StoreError::Rejected(format!(
                "{} assignment refused for record {record_id}",
                taxonomy.as_str()
            )));
        }
        if !self.records.contains_key(&record_id) {
            return Err(StoreError::RecordNotFound(record_id));
        }

        let stale: Vec<TermId> = self
            .terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .map(|term| term.id)
            .collect();
        self.record_terms
            .retain(|(owner, term_id)| *owner != record_id || !stale.contains(term_id));

        for name in normalize_term_names(names) {
            let term_id = self.allocate_term(taxonomy, &name);
            self.record_terms.insert((record_id, term_id));
        }

        self.record_terms(record_id, taxonomy)
    }

    fn record_terms(&self, record_id: RecordId, taxonomy: Taxonomy) -> StoreResult<Vec<TermRef>> {
        Ok(self
            .record_terms
            .iter()
            .filter(|(owner, _)| *owner == record_id)
            .filter_map(|(_, term_id)| self.terms.get(term_id))
            .filter(|term| term.taxonomy == taxonomy)
            .cloned()
            .collect())
    }

    fn records_with_term(&self, term: &TermRef, kind: RecordKind) -> StoreResult<Vec<RecordId>> {
        Ok(self
            .record_terms
            .iter()
            .filter(|(_, term_id)| *term_id == term.id)
            .filter_map(|(record_id, _)| self.records.get(record_id))
            .filter(|record| record.kind == kind)
            .map(|record| record.id)
            .collect())
    }

    fn delete_term(&mut self, term: &TermRef) -> StoreResult<()> {
        match self.terms.get(&term.id) {
            Some(stored) if stored.taxonomy == term.taxonomy => {}
            _ => return Err(StoreError::TermNotFound(term.id)),
        }
        self.terms.remove(&term.id);
        self.record_terms.retain(|(_, term_id)| *term_id != term.id);
        Ok(())
    }
}
