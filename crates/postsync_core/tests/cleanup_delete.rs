mod common;

use common::{item, numbered_items, ScriptedSource, StaticImages};
use postsync_core::model::record::Taxonomy;
use postsync_core::model::remote::{PageRequest, RemoteItem};
use postsync_core::{
    CleanupOptions, CleanupOrchestrator, CleanupOutcome, ImportOptions, InMemoryContentStore,
    MediaAttacher, SyncConfig, SyncError, SyncOrchestrator,
};

fn seed_store(store: &mut InMemoryContentStore, items: Vec<RemoteItem>) {
    let source = ScriptedSource::new(items);
    let images = StaticImages::ok();
    let config = SyncConfig::default();
    let attacher = MediaAttacher::from_config(&images, &config).unwrap();
    let mut orchestrator =
        SyncOrchestrator::new(&source, store, attacher, ImportOptions::paginated(&config));
    orchestrator.import_all().unwrap();
}

#[test]
fn delete_all_prunes_exclusive_terms_and_keeps_shared_ones() {
    let mut store = InMemoryContentStore::new();
    seed_store(
        &mut store,
        vec![
            item(1, "Alpha", &["alpha-only", "shared"]),
            item(2, "Beta", &["shared"]),
        ],
    );
    assert_eq!(store.media().len(), 2);

    let source = ScriptedSource::new(vec![item(1, "Alpha", &["alpha-only", "shared"])]);
    let report = {
        let mut orchestrator = CleanupOrchestrator::new(
            &source,
            &mut store,
            CleanupOptions::paginated(&SyncConfig::default()),
        );
        orchestrator.delete_all().unwrap()
    };

    assert_eq!(report.total_deleted, 1);
    assert_eq!(report.removed, 1);
    match &report.outcomes[0] {
        CleanupOutcome::Deleted {
            terms,
            media_deleted,
            media_failed,
            ..
        } => {
            assert_eq!(terms.deleted.len(), 2);
            assert_eq!(terms.retained.len(), 2);
            assert!(terms.failed.is_empty());
            assert_eq!(media_deleted.len(), 1);
            assert!(media_failed.is_empty());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Beta");

    for taxonomy in [Taxonomy::Category, Taxonomy::Tag] {
        assert!(store.term_named(taxonomy, "alpha-only").is_none());
        assert!(store.term_named(taxonomy, "shared").is_some());
    }

    let media = store.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].owner_record_id, records[0].id);
}

#[test]
fn delete_batch_removes_media_and_record_but_keeps_terms() {
    let mut store = InMemoryContentStore::new();
    seed_store(&mut store, vec![item(1, "Solo", &["lonely"])]);

    let source = ScriptedSource::new(vec![item(1, "Solo", &["lonely"])]);
    let report = {
        let mut orchestrator = CleanupOrchestrator::new(
            &source,
            &mut store,
            CleanupOptions::batch(&SyncConfig::default()),
        );
        orchestrator.delete_batch().unwrap()
    };

    assert_eq!(source.requests(), vec![PageRequest::Unpaged]);
    assert_eq!(report.removed, 1);
    assert!(store.records().is_empty());
    assert!(store.media().is_empty());
    assert!(store.term_named(Taxonomy::Tag, "lonely").is_some());
    assert!(store.term_named(Taxonomy::Category, "lonely").is_some());
}

#[test]
fn missing_records_are_reported_as_not_found() {
    let mut store = InMemoryContentStore::new();
    seed_store(&mut store, vec![item(1, "Kept", &[])]);

    let source = ScriptedSource::new(vec![item(9, "Never imported", &[])]);
    let report = {
        let mut orchestrator = CleanupOrchestrator::new(
            &source,
            &mut store,
            CleanupOptions::paginated(&SyncConfig::default()),
        );
        orchestrator.delete_all().unwrap()
    };

    assert_eq!(report.total_deleted, 1);
    assert_eq!(report.missing, 1);
    assert!(matches!(
        &report.outcomes[0],
        CleanupOutcome::NotFound { title } if title == "Never imported"
    ));
    assert_eq!(store.records().len(), 1);
}

#[test]
fn delete_all_walks_every_window() {
    let mut store = InMemoryContentStore::new();
    seed_store(&mut store, numbered_items(65));

    let source = ScriptedSource::new(numbered_items(65));
    let report = {
        let mut orchestrator = CleanupOrchestrator::new(
            &source,
            &mut store,
            CleanupOptions::paginated(&SyncConfig::default()),
        );
        orchestrator.delete_all().unwrap()
    };

    assert_eq!(report.pages, 3);
    assert_eq!(report.removed, 65);
    assert!(store.records().is_empty());
    assert!(store.media().is_empty());
    assert!(store.terms(Taxonomy::Tag).is_empty());
    assert!(store.terms(Taxonomy::Category).is_empty());
}

#[test]
fn delete_all_aborts_on_fetch_failure() {
    let mut store = InMemoryContentStore::new();
    seed_store(&mut store, numbered_items(40));

    let source = ScriptedSource::new(numbered_items(40)).failing_at_skip(30);
    let err = {
        let mut orchestrator = CleanupOrchestrator::new(
            &source,
            &mut store,
            CleanupOptions::paginated(&SyncConfig::default()),
        );
        orchestrator.delete_all().unwrap_err()
    };

    assert!(matches!(err, SyncError::Fetch { skip: 30, .. }));
    assert_eq!(err.processed(), 30);
    assert_eq!(store.records().len(), 10);
}
