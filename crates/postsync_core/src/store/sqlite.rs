//! SQLite-backed content store.
//!
//! # Responsibility
//! - Persist records, taxonomy terms and media metadata in SQLite.
//! - Keep sideloaded files under a dedicated media directory.
//!
//! # Invariants
//! - Term replacement runs in one immediate transaction.
//! - A media row and its stored file are created together; a failed copy
//!   rolls back the row.
//! - Title lookups are exact and case-sensitive (`BINARY` collation).

use crate::model::record::{
    LocalRecord, MediaAsset, MediaId, MediaUpdate, NewRecord, RecordId, RecordKey, RecordKind,
    RecordLookup, RecordStatus, Taxonomy, TermRef,
};
use crate::store::{normalize_term_names, ContentStore, MediaUpload, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    kind,
    title,
    body,
    status,
    author_id,
    external_id,
    featured_media_id
FROM records";

const MEDIA_SELECT_SQL: &str = "SELECT
    id,
    owner_record_id,
    author_id,
    file_name,
    title,
    alt_text,
    caption,
    excerpt,
    byte_len
FROM media";

const REQUIRED_TABLES: &[&str] = &["records", "media", "terms", "record_terms"];

/// Content store over a migrated SQLite connection and a media directory.
pub struct SqliteContentStore<'conn> {
    conn: &'conn mut Connection,
    media_dir: PathBuf,
}

impl<'conn> SqliteContentStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// Creates `media_dir` when missing.
    pub fn try_new(conn: &'conn mut Connection, media_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        let media_dir = media_dir.into();
        fs::create_dir_all(&media_dir).map_err(|source| StoreError::Io {
            path: media_dir.clone(),
            source,
        })?;
        Ok(Self { conn, media_dir })
    }

    /// Directory holding sideloaded files.
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Returns the stored file path of one media asset.
    pub fn media_file_path(&self, id: MediaId) -> StoreResult<Option<PathBuf>> {
        let path: Option<String> = self
            .conn
            .query_row(
                "SELECT file_path FROM media WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.map(PathBuf::from))
    }
}

impl ContentStore for SqliteContentStore<'_> {
    fn find_record(&self, lookup: &RecordLookup) -> StoreResult<Option<LocalRecord>> {
        let kind = lookup.kind.as_str();
        let mut rows = match &lookup.key {
            RecordKey::Title(title) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "{RECORD_SELECT_SQL} WHERE kind = ?1 AND title = ?2 ORDER BY id ASC LIMIT 1;"
                ))?;
                let found = collect_records(stmt.query(params![kind, title])?)?;
                found
            }
            RecordKey::UntrackedTitle(title) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "{RECORD_SELECT_SQL} WHERE kind = ?1 AND title = ?2 AND external_id IS NULL ORDER BY id ASC LIMIT 1;"
                ))?;
                let found = collect_records(stmt.query(params![kind, title])?)?;
                found
            }
            RecordKey::ExternalId(external_id) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "{RECORD_SELECT_SQL} WHERE kind = ?1 AND external_id = ?2 ORDER BY id ASC LIMIT 1;"
                ))?;
                let found = collect_records(stmt.query(params![kind, external_id])?)?;
                found
            }
        };
        Ok(rows.pop())
    }

    fn get_record(&self, id: RecordId) -> StoreResult<Option<LocalRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{RECORD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = collect_records(stmt.query([id])?)?;
        Ok(rows.pop())
    }

    fn create_record(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        record.validate()?;

        self.conn.execute(
            "INSERT INTO records (kind, title, body, status, author_id, external_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.kind.as_str(),
                record.title.as_str(),
                record.body.as_str(),
                record.status.as_str(),
                record.author_id,
                record.external_id,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn delete_record(&mut self, id: RecordId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(id));
        }
        Ok(())
    }

    fn attached_media(&self, record_id: RecordId) -> StoreResult<Vec<MediaAsset>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{MEDIA_SELECT_SQL} WHERE owner_record_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([record_id])?;
        let mut assets = Vec::new();
        while let Some(row) = rows.next()? {
            assets.push(parse_media_row(row)?);
        }
        Ok(assets)
    }

    fn sideload_media(&mut self, upload: &MediaUpload<'_>) -> StoreResult<MediaId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let author_id: i64 = tx
            .query_row(
                "SELECT author_id FROM records WHERE id = ?1;",
                [upload.record_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::RecordNotFound(upload.record_id))?;

        tx.execute(
            "INSERT INTO media (owner_record_id, author_id, file_name, file_path, title)
             VALUES (?1, ?2, ?3, '', ?4);",
            params![upload.record_id, author_id, upload.file_name, upload.title],
        )?;
        let media_id = tx.last_insert_rowid();

        let target = self
            .media_dir
            .join(format!("{media_id}-{}", sanitize_file_name(upload.file_name)));
        let byte_len = fs::copy(upload.source_path, &target).map_err(|source| {
            let _ = fs::remove_file(&target);
            // A missing staged file is a read failure; anything else failed on the write side.
            let path = if upload.source_path.exists() {
                target.clone()
            } else {
                upload.source_path.to_path_buf()
            };
            StoreError::Io { path, source }
        })?;

        let committed = tx
            .execute(
                "UPDATE media SET file_path = ?2, byte_len = ?3 WHERE id = ?1;",
                params![media_id, target.to_string_lossy(), byte_len as i64],
            )
            .and_then(|_| tx.commit());
        if let Err(err) = committed {
            let _ = fs::remove_file(&target);
            return Err(err.into());
        }

        Ok(media_id)
    }

    fn update_media(&mut self, id: MediaId, update: &MediaUpdate) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE media
             SET
                author_id = COALESCE(?2, author_id),
                caption = COALESCE(?3, caption),
                excerpt = COALESCE(?4, excerpt),
                alt_text = COALESCE(?5, alt_text)
             WHERE id = ?1;",
            params![
                id,
                update.author_id,
                update.caption.as_deref(),
                update.excerpt.as_deref(),
                update.alt_text.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::MediaNotFound(id));
        }
        Ok(())
    }

    fn set_featured_media(&mut self, record_id: RecordId, media_id: MediaId) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        if !media_exists_in_tx(&tx, media_id)? {
            return Err(StoreError::MediaNotFound(media_id));
        }
        let changed = tx.execute(
            "UPDATE records SET featured_media_id = ?2 WHERE id = ?1;",
            params![record_id, media_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(record_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_media(&mut self, id: MediaId) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let file_path: String = tx
            .query_row("SELECT file_path FROM media WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(StoreError::MediaNotFound(id))?;

        tx.execute(
            "UPDATE records SET featured_media_id = NULL WHERE featured_media_id = ?1;",
            [id],
        )?;
        tx.execute("DELETE FROM media WHERE id = ?1;", [id])?;
        tx.commit()?;

        if !file_path.is_empty() {
            match fs::remove_file(&file_path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        path: PathBuf::from(file_path),
                        source,
                    })
                }
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
        let names = normalize_term_names(names);
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !record_exists_in_tx(&tx, record_id)? {
            return Err(StoreError::RecordNotFound(record_id));
        }

        tx.execute(
            "DELETE FROM record_terms
             WHERE record_id = ?1
               AND term_id IN (SELECT id FROM terms WHERE taxonomy = ?2);",
            params![record_id, taxonomy.as_str()],
        )?;

        for name in &names {
            tx.execute(
                "INSERT OR IGNORE INTO terms (taxonomy, name) VALUES (?1, ?2);",
                params![taxonomy.as_str(), name.as_str()],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO record_terms (record_id, term_id)
                 SELECT ?1, id
                 FROM terms
                 WHERE taxonomy = ?2 AND name = ?3;",
                params![record_id, taxonomy.as_str(), name.as_str()],
            )?;
        }

        let terms = load_record_terms(&tx, record_id, taxonomy)?;
        tx.commit()?;
        Ok(terms)
    }

    fn record_terms(&self, record_id: RecordId, taxonomy: Taxonomy) -> StoreResult<Vec<TermRef>> {
        load_record_terms(&*self.conn, record_id, taxonomy)
    }

    fn records_with_term(&self, term: &TermRef, kind: RecordKind) -> StoreResult<Vec<RecordId>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT r.id
             FROM record_terms rt
             INNER JOIN records r ON r.id = rt.record_id
             INNER JOIN terms t ON t.id = rt.term_id
             WHERE rt.term_id = ?1
               AND t.taxonomy = ?2
               AND r.kind = ?3
             ORDER BY r.id ASC;",
        )?;
        let mut rows = stmt.query(params![term.id, term.taxonomy.as_str(), kind.as_str()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn delete_term(&mut self, term: &TermRef) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM terms WHERE id = ?1 AND taxonomy = ?2;",
            params![term.id, term.taxonomy.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::TermNotFound(term.id));
        }
        Ok(())
    }
}

fn collect_records(mut rows: rusqlite::Rows<'_>) -> StoreResult<Vec<LocalRecord>> {
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse_record_row(row)?);
    }
    Ok(records)
}

fn parse_record_row(row: &Row<'_>) -> StoreResult<LocalRecord> {
    let kind_text: String = row.get("kind")?;
    let kind = RecordKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid record kind `{kind_text}` in records.kind"))
    })?;

    let status_text: String = row.get("status")?;
    let status = RecordStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid record status `{status_text}` in records.status"
        ))
    })?;

    Ok(LocalRecord {
        id: row.get("id")?,
        kind,
        title: row.get("title")?,
        body: row.get("body")?,
        status,
        author_id: row.get("author_id")?,
        external_id: row.get("external_id")?,
        featured_media_id: row.get("featured_media_id")?,
    })
}

fn parse_media_row(row: &Row<'_>) -> StoreResult<MediaAsset> {
    let byte_len: i64 = row.get("byte_len")?;
    let byte_len = u64::try_from(byte_len).map_err(|_| {
        StoreError::InvalidData(format!("negative byte_len `{byte_len}` in media.byte_len"))
    })?;

    Ok(MediaAsset {
        id: row.get("id")?,
        owner_record_id: row.get("owner_record_id")?,
        author_id: row.get("author_id")?,
        file_name: row.get("file_name")?,
        title: row.get("title")?,
        alt_text: row.get("alt_text")?,
        caption: row.get("caption")?,
        excerpt: row.get("excerpt")?,
        byte_len,
    })
}

fn load_record_terms(
    conn: &Connection,
    record_id: RecordId,
    taxonomy: Taxonomy,
) -> StoreResult<Vec<TermRef>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name
         FROM record_terms rt
         INNER JOIN terms t ON t.id = rt.term_id
         WHERE rt.record_id = ?1
           AND t.taxonomy = ?2
         ORDER BY t.id ASC;",
    )?;
    let mut rows = stmt.query(params![record_id, taxonomy.as_str()])?;
    let mut terms = Vec::new();
    while let Some(row) = rows.next()? {
        terms.push(TermRef {
            id: row.get(0)?,
            taxonomy,
            name: row.get(1)?,
        });
    }
    Ok(terms)
}

fn record_exists_in_tx(tx: &Transaction<'_>, record_id: RecordId) -> StoreResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM records WHERE id = ?1);",
        [record_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn media_exists_in_tx(tx: &Transaction<'_>, media_id: MediaId) -> StoreResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM media WHERE id = ?1);",
        [media_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::InvalidData(format!(
                "missing required table `{table}`; was the database migrated?"
            )));
        }
    }
    Ok(())
}

/// Keeps stored file names to a conservative character set.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}
