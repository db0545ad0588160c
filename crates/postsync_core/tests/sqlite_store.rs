mod common;

use common::{item, ScriptedSource, StaticImages, IMAGE_BYTES};
use postsync_core::db::open_db_in_memory;
use postsync_core::model::record::{
    MediaUpdate, NewRecord, RecordKind, RecordLookup, RecordStatus, Taxonomy,
};
use postsync_core::store::MediaUpload;
use postsync_core::{
    CleanupOptions, CleanupOrchestrator, ContentStore, ImportOptions, MediaAttacher,
    SqliteContentStore, StoreError, SyncConfig, SyncOrchestrator,
};
use std::io::Write;

fn stage_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn create_and_find_by_title_and_external_id() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();

    let mut draft = NewRecord::published_post("Hello", "World", 1);
    draft.status = RecordStatus::Draft;
    draft.external_id = Some(5);
    let id = store.create_record(&draft).unwrap();

    let by_title = store
        .find_record(&RecordLookup::post_titled("Hello"))
        .unwrap()
        .unwrap();
    assert_eq!(by_title.id, id);
    assert_eq!(by_title.status, RecordStatus::Draft);
    assert_eq!(by_title.kind, RecordKind::Post);

    let by_external = store
        .find_record(&RecordLookup::post_with_external_id(5))
        .unwrap()
        .unwrap();
    assert_eq!(by_external.id, id);

    assert!(store
        .find_record(&RecordLookup::post_titled("hello"))
        .unwrap()
        .is_none());
}

#[test]
fn untracked_title_lookup_ignores_records_with_external_ids() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();

    let mut tracked = NewRecord::published_post("Hello", "World", 1);
    tracked.external_id = Some(2);
    store.create_record(&tracked).unwrap();
    assert!(store
        .find_record(&RecordLookup::untracked_post_titled("Hello"))
        .unwrap()
        .is_none());

    let legacy_id = store
        .create_record(&NewRecord::published_post("Hello", "World", 1))
        .unwrap();
    let found = store
        .find_record(&RecordLookup::untracked_post_titled("Hello"))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, legacy_id);
    assert_eq!(found.external_id, None);
}

#[test]
fn create_rejects_invalid_records() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();

    let err = store
        .create_record(&NewRecord::published_post(" ", "", 1))
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = store
        .create_record(&NewRecord::published_post("Title", "", 0))
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn sideload_copies_file_and_delete_removes_it() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
    let record_id = store
        .create_record(&NewRecord::published_post("Pic", "", 3))
        .unwrap();

    let staged = stage_file(IMAGE_BYTES);
    let media_id = store
        .sideload_media(&MediaUpload {
            record_id,
            source_path: staged.path(),
            file_name: "picsum-7.jpg",
            title: "Pic",
        })
        .unwrap();
    drop(staged);

    let stored_path = store.media_file_path(media_id).unwrap().unwrap();
    assert!(stored_path.starts_with(media_dir.path()));
    assert_eq!(std::fs::read(&stored_path).unwrap(), IMAGE_BYTES);

    store
        .update_media(
            media_id,
            &MediaUpdate {
                caption: Some("Pic".to_string()),
                excerpt: Some("Pic".to_string()),
                ..MediaUpdate::default()
            },
        )
        .unwrap();
    store.set_featured_media(record_id, media_id).unwrap();

    let assets = store.attached_media(record_id).unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].author_id, 3);
    assert_eq!(assets[0].caption, "Pic");
    assert_eq!(assets[0].alt_text, "");
    assert_eq!(assets[0].byte_len, IMAGE_BYTES.len() as u64);
    assert_eq!(
        store.get_record(record_id).unwrap().unwrap().featured_media_id,
        Some(media_id)
    );

    store.delete_media(media_id).unwrap();
    assert!(!stored_path.exists());
    assert!(store.attached_media(record_id).unwrap().is_empty());
    assert_eq!(
        store.get_record(record_id).unwrap().unwrap().featured_media_id,
        None
    );
}

#[test]
fn failed_copy_leaves_no_row_or_file_and_names_the_failing_side() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
    let record_id = store
        .create_record(&NewRecord::published_post("Pic", "", 1))
        .unwrap();

    let staged = stage_file(IMAGE_BYTES);
    let missing_source = staged.path().to_path_buf();
    drop(staged);
    let err = store
        .sideload_media(&MediaUpload {
            record_id,
            source_path: &missing_source,
            file_name: "gone.jpg",
            title: "Pic",
        })
        .unwrap_err();
    match err {
        StoreError::Io { path, .. } => assert_eq!(path, missing_source),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read_dir(media_dir.path()).unwrap().count(), 0);

    // The rolled-back insert frees id 1 again, so the next target is `1-blocked.jpg`.
    let blocked_target = media_dir.path().join("1-blocked.jpg");
    std::fs::create_dir(&blocked_target).unwrap();
    let staged = stage_file(IMAGE_BYTES);
    let err = store
        .sideload_media(&MediaUpload {
            record_id,
            source_path: staged.path(),
            file_name: "blocked.jpg",
            title: "Pic",
        })
        .unwrap_err();
    match err {
        StoreError::Io { path, .. } => assert_eq!(path, blocked_target),
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.attached_media(record_id).unwrap().is_empty());
}

#[test]
fn set_record_terms_replaces_and_reuses_terms() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
    let first = store
        .create_record(&NewRecord::published_post("First", "", 1))
        .unwrap();
    let second = store
        .create_record(&NewRecord::published_post("Second", "", 1))
        .unwrap();

    let names = vec!["News".to_string(), " history ".to_string(), "news".to_string()];
    let assigned = store
        .set_record_terms(first, Taxonomy::Tag, &names)
        .unwrap();
    let assigned_names: Vec<_> = assigned.iter().map(|term| term.name.as_str()).collect();
    assert_eq!(assigned_names, vec!["News", "history"]);

    let reused = store
        .set_record_terms(second, Taxonomy::Tag, &["NEWS".to_string()])
        .unwrap();
    assert_eq!(reused[0].id, assigned[0].id);
    assert_eq!(
        store.records_with_term(&assigned[0], RecordKind::Post).unwrap(),
        vec![first, second]
    );

    let replaced = store
        .set_record_terms(first, Taxonomy::Tag, &["fresh".to_string()])
        .unwrap();
    assert_eq!(replaced.len(), 1);
    assert_eq!(
        store.records_with_term(&assigned[1], RecordKind::Post).unwrap(),
        Vec::<i64>::new()
    );
    assert!(store.record_terms(first, Taxonomy::Category).unwrap().is_empty());
}

#[test]
fn delete_record_drops_term_links_and_rejects_unknown_ids() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
    let id = store
        .create_record(&NewRecord::published_post("Gone", "", 1))
        .unwrap();
    let terms = store
        .set_record_terms(id, Taxonomy::Category, &["c".to_string()])
        .unwrap();

    store.delete_record(id).unwrap();
    assert!(store.get_record(id).unwrap().is_none());
    assert!(store
        .records_with_term(&terms[0], RecordKind::Post)
        .unwrap()
        .is_empty());

    assert!(matches!(
        store.delete_record(id).unwrap_err(),
        StoreError::RecordNotFound(missing) if missing == id
    ));

    store.delete_term(&terms[0]).unwrap();
    assert!(matches!(
        store.delete_term(&terms[0]).unwrap_err(),
        StoreError::TermNotFound(_)
    ));
}

#[test]
fn import_then_delete_all_round_trip_on_sqlite() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();
    let config = SyncConfig::default();
    let items = vec![
        item(1, "Alpha", &["alpha-only", "shared"]),
        item(2, "Beta", &["shared"]),
    ];

    {
        let store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
        let source = ScriptedSource::new(items.clone());
        let images = StaticImages::ok();
        let attacher = MediaAttacher::from_config(&images, &config).unwrap();
        let report = SyncOrchestrator::new(&source, store, attacher, ImportOptions::paginated(&config))
            .import_all()
            .unwrap();
        assert_eq!(report.created, 2);
    }
    assert_eq!(std::fs::read_dir(media_dir.path()).unwrap().count(), 2);

    {
        let store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
        let source = ScriptedSource::new(vec![items[0].clone()]);
        let report = CleanupOrchestrator::new(&source, store, CleanupOptions::paginated(&config))
            .delete_all()
            .unwrap();
        assert_eq!(report.removed, 1);
    }
    assert_eq!(std::fs::read_dir(media_dir.path()).unwrap().count(), 1);

    let store = SqliteContentStore::try_new(&mut conn, media_dir.path()).unwrap();
    assert!(store
        .find_record(&RecordLookup::post_titled("Alpha"))
        .unwrap()
        .is_none());
    assert!(store
        .find_record(&RecordLookup::post_titled("Beta"))
        .unwrap()
        .is_some());

    let beta = store
        .find_record(&RecordLookup::post_titled("Beta"))
        .unwrap()
        .unwrap();
    let remaining = store.record_terms(beta.id, Taxonomy::Tag).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "shared");
}

#[test]
fn store_requires_migrated_connection() {
    let media_dir = tempfile::tempdir().unwrap();
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteContentStore::try_new(&mut conn, media_dir.path())
        .err()
        .unwrap();
    assert!(matches!(err, StoreError::InvalidData(_)));
}
