//! SQLite-backed library store.

use super::models::*;
use super::schema::LIBRARY_DB_SCHEMAS;
use crate::retry::{with_retries, RetryPolicy};
use crate::reviews::{DocKind, Document};
use crate::sqlite_persistence::{open_in_memory_database, open_versioned_database};
use anyhow::{Context, Result};
use rusqlite::{params, types::Type, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

use rand::{rng, Rng};
use rand_distr::Alphanumeric;

/// One row of the search index rebuild feed.
#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub kind: EntityKind,
    pub id: String,
    pub text: String,
}

/// Fields the music director can edit on an album.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AlbumEdit {
    pub title: Option<String>,
    pub label: Option<String>,
    pub year: Option<i32>,
    pub category: Option<AlbumCategory>,
}

pub trait LibraryStore: Send + Sync {
    fn get_artist(&self, id: &str) -> Result<Option<Artist>>;
    fn get_artist_by_name(&self, name: &str) -> Result<Option<Artist>>;
    fn create_artist(&self, name: &str) -> Result<Artist>;
    /// Creates every name that does not exist yet, returns how many were created.
    fn bulk_add_artists(&self, names: &[String]) -> Result<usize>;
    fn albums_by_artist(&self, artist_id: &str) -> Result<Vec<Album>>;

    fn get_album(&self, id: &str) -> Result<Option<Album>>;
    fn insert_album(&self, album: &Album) -> Result<()>;
    fn list_albums(
        &self,
        offset: usize,
        limit: usize,
        category: Option<AlbumCategory>,
    ) -> Result<(Vec<Album>, usize)>;
    /// Returns false when the album does not exist.
    fn update_album(&self, id: &str, edit: &AlbumEdit) -> Result<bool>;

    fn get_track(&self, id: &str) -> Result<Option<Track>>;
    fn insert_track(&self, track: &Track) -> Result<()>;
    fn tracks_for_album(&self, album_id: &str) -> Result<Vec<Track>>;
    /// Applies the add/remove merge, returns the resulting tag set, or None
    /// when the track does not exist.
    fn merge_track_tags(
        &self,
        track_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<Option<Vec<String>>>;

    /// Inserts the document and bumps the album's matching counter in one
    /// transaction. Returns false when the album does not exist.
    fn insert_document(&self, doc: &Document) -> Result<bool>;
    /// Edits title/text/author of an existing document, bumping `modified`.
    fn update_document(
        &self,
        id: &str,
        title: Option<&str>,
        text: &str,
        author_name: &str,
    ) -> Result<bool>;
    fn set_document_hidden(&self, id: &str, hidden: bool) -> Result<bool>;
    /// Deletes the document and decrements the album's matching counter in one
    /// transaction. Returns false when the document does not exist.
    fn delete_document(&self, id: &str) -> Result<bool>;
    fn get_document(&self, id: &str) -> Result<Option<Document>>;
    fn documents_for_album(
        &self,
        album_id: &str,
        kind: DocKind,
        include_hidden: bool,
    ) -> Result<Vec<Document>>;
    fn recent_reviews(&self, limit: usize) -> Result<Vec<Document>>;

    fn insert_image(&self, image: &Image) -> Result<()>;
    fn get_image(&self, id: &str) -> Result<Option<Image>>;

    fn config_get(&self, key: &str) -> Result<Option<String>>;
    fn config_set(&self, key: &str, value: &str) -> Result<()>;
    /// Lazily seeds the config table, returns true when seeding was needed.
    fn config_init(&self) -> Result<bool>;

    fn searchable_entries(&self) -> Result<Vec<SearchEntry>>;
}

/// A random A-z0-9 string
fn random_string(len: usize) -> String {
    let bytes = rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .collect::<Vec<u8>>();
    String::from_utf8_lossy(&bytes).to_string()
}

pub const ENTITY_ID_LEN: usize = 16;

pub fn new_entity_id() -> String {
    random_string(ENTITY_ID_LEN)
}

pub struct SqliteLibraryStore {
    conn: Mutex<Connection>,
    retry_policy: RetryPolicy,
}

fn row_to_artist(row: &Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        pretty_name: row.get(2)?,
        created: row.get(3)?,
    })
}

const ALBUM_COLUMNS: &str = "id, title, artist_id, artist_name, label, year, category, is_compilation, num_reviews, num_comments, created";

fn row_to_album(row: &Row) -> rusqlite::Result<Album> {
    let category_int: i64 = row.get(6)?;
    let category = AlbumCategory::from_int(category_int).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Integer,
            format!("invalid album category {}", category_int).into(),
        )
    })?;
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        artist_id: row.get(2)?,
        artist_name: row.get(3)?,
        label: row.get(4)?,
        year: row.get(5)?,
        category,
        is_compilation: row.get::<_, i64>(7)? != 0,
        num_reviews: row.get(8)?,
        num_comments: row.get(9)?,
        created: row.get(10)?,
    })
}

const DOCUMENT_COLUMNS: &str =
    "id, album_id, doc_type, author_user_id, author_name, title, text, is_hidden, created, modified";

fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let doc_type: i64 = row.get(2)?;
    let kind = DocKind::from_int(doc_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Integer,
            format!("invalid document type {}", doc_type).into(),
        )
    })?;
    Ok(Document {
        id: row.get(0)?,
        album_id: row.get(1)?,
        kind,
        author_user_id: row.get(3)?,
        author_name: row.get(4)?,
        title: row.get(5)?,
        text: row.get(6)?,
        is_hidden: row.get::<_, i64>(7)? != 0,
        created: row.get(8)?,
        modified: row.get(9)?,
    })
}

fn counter_column(kind: DocKind) -> &'static str {
    match kind {
        DocKind::Review => "num_reviews",
        DocKind::Comment => "num_comments",
    }
}

impl SqliteLibraryStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = open_versioned_database(db_path, LIBRARY_DB_SCHEMAS)
            .context("Failed to open library database")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_in_memory_database(LIBRARY_DB_SCHEMAS)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retry_policy: RetryPolicy::default(),
        })
    }

    fn tags_for_track(conn: &Connection, track_id: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT tag FROM track_tag WHERE track_id = ?1 ORDER BY tag")?;
        let tags = stmt
            .query_map(params![track_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    fn row_to_track(conn: &Connection, row: &Row) -> rusqlite::Result<Track> {
        let id: String = row.get(0)?;
        let tags = Self::tags_for_track(conn, &id)?;
        Ok(Track {
            id,
            album_id: row.get(1)?,
            artist_id: row.get(2)?,
            title: row.get(3)?,
            track_num: row.get(4)?,
            duration_ms: row.get(5)?,
            tags,
        })
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn get_artist(&self, id: &str) -> Result<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, pretty_name, created FROM artist WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], row_to_artist)?;
        Ok(rows.next().transpose()?)
    }

    fn get_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, pretty_name, created FROM artist WHERE name = ?1")?;
        let mut rows = stmt.query_map(params![name], row_to_artist)?;
        Ok(rows.next().transpose()?)
    }

    fn create_artist(&self, name: &str) -> Result<Artist> {
        let conn = self.conn.lock().unwrap();
        let id = random_string(ENTITY_ID_LEN);
        let pretty = pretty_name(name);
        conn.execute(
            "INSERT INTO artist (id, name, pretty_name) VALUES (?1, ?2, ?3)",
            params![id, name, pretty],
        )
        .with_context(|| format!("Failed to create artist '{}'", name))?;
        let mut stmt =
            conn.prepare("SELECT id, name, pretty_name, created FROM artist WHERE id = ?1")?;
        let artist = stmt.query_row(params![id], row_to_artist)?;
        Ok(artist)
    }

    fn bulk_add_artists(&self, names: &[String]) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let created = with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            let mut created = 0;
            for name in names {
                let exists: bool = tx
                    .query_row("SELECT 1 FROM artist WHERE name = ?1", params![name], |_| {
                        Ok(true)
                    })
                    .unwrap_or(false);
                if exists {
                    continue;
                }
                tx.execute(
                    "INSERT INTO artist (id, name, pretty_name) VALUES (?1, ?2, ?3)",
                    params![random_string(ENTITY_ID_LEN), name, pretty_name(name)],
                )?;
                created += 1;
            }
            tx.commit()?;
            Ok(created)
        })
        .context("Failed to bulk add artists")?;
        Ok(created)
    }

    fn albums_by_artist(&self, artist_id: &str) -> Result<Vec<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM album WHERE artist_id = ?1 ORDER BY year, title",
            ALBUM_COLUMNS
        ))?;
        let albums = stmt
            .query_map(params![artist_id], row_to_album)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM album WHERE id = ?1", ALBUM_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], row_to_album)?;
        Ok(rows.next().transpose()?)
    }

    fn insert_album(&self, album: &Album) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO album (id, title, artist_id, artist_name, label, year, category, is_compilation, num_reviews, num_comments)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                album.id,
                album.title,
                album.artist_id,
                album.artist_name,
                album.label,
                album.year,
                album.category.to_int(),
                album.is_compilation as i64,
                album.num_reviews,
                album.num_comments,
            ],
        )
        .with_context(|| format!("Failed to insert album '{}'", album.title))?;
        Ok(())
    }

    fn list_albums(
        &self,
        offset: usize,
        limit: usize,
        category: Option<AlbumCategory>,
    ) -> Result<(Vec<Album>, usize)> {
        let conn = self.conn.lock().unwrap();
        let (total, albums) = match category {
            Some(category) => {
                let total: usize = conn.query_row(
                    "SELECT COUNT(*) FROM album WHERE category = ?1",
                    params![category.to_int()],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM album WHERE category = ?1 ORDER BY created DESC LIMIT ?2 OFFSET ?3",
                    ALBUM_COLUMNS
                ))?;
                let albums = stmt
                    .query_map(params![category.to_int(), limit, offset], row_to_album)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                (total, albums)
            }
            None => {
                let total: usize =
                    conn.query_row("SELECT COUNT(*) FROM album", [], |row| row.get(0))?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM album ORDER BY created DESC LIMIT ?1 OFFSET ?2",
                    ALBUM_COLUMNS
                ))?;
                let albums = stmt
                    .query_map(params![limit, offset], row_to_album)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                (total, albums)
            }
        };
        Ok((albums, total))
    }

    fn update_album(&self, id: &str, edit: &AlbumEdit) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            let mut rows = 0;
            if let Some(title) = &edit.title {
                rows = tx.execute(
                    "UPDATE album SET title = ?1 WHERE id = ?2",
                    params![title, id],
                )?;
            }
            if let Some(label) = &edit.label {
                rows = tx.execute(
                    "UPDATE album SET label = ?1 WHERE id = ?2",
                    params![label, id],
                )?;
            }
            if let Some(year) = edit.year {
                rows = tx.execute("UPDATE album SET year = ?1 WHERE id = ?2", params![year, id])?;
            }
            if let Some(category) = edit.category {
                rows = tx.execute(
                    "UPDATE album SET category = ?1 WHERE id = ?2",
                    params![category.to_int(), id],
                )?;
            }
            if rows == 0 {
                // Either nothing to change or no such album, report existence
                rows = tx.query_row("SELECT COUNT(*) FROM album WHERE id = ?1", params![id], |r| {
                    r.get::<_, usize>(0)
                })?;
            }
            tx.commit()?;
            Ok(rows > 0)
        })
        .with_context(|| format!("Failed to update album {}", id))?;
        Ok(updated)
    }

    fn get_track(&self, id: &str) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        let track = {
            let mut stmt = conn.prepare(
                "SELECT id, album_id, artist_id, title, track_num, duration_ms FROM track WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Some(Self::row_to_track(&conn, row)?),
                None => None,
            }
        };
        Ok(track)
    }

    fn insert_track(&self, track: &Track) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO track (id, album_id, artist_id, title, track_num, duration_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    track.id,
                    track.album_id,
                    track.artist_id,
                    track.title,
                    track.track_num,
                    track.duration_ms,
                ],
            )?;
            for tag in &track.tags {
                tx.execute(
                    "INSERT OR IGNORE INTO track_tag (track_id, tag) VALUES (?1, ?2)",
                    params![track.id, tag],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .with_context(|| format!("Failed to insert track '{}'", track.title))?;
        Ok(())
    }

    fn tracks_for_album(&self, album_id: &str) -> Result<Vec<Track>> {
        let conn = self.conn.lock().unwrap();
        let tracks = {
            let mut stmt = conn.prepare(
                "SELECT id, album_id, artist_id, title, track_num, duration_ms FROM track
                 WHERE album_id = ?1 ORDER BY track_num",
            )?;
            let mut rows = stmt.query(params![album_id])?;
            let mut tracks = Vec::new();
            while let Some(row) = rows.next()? {
                tracks.push(Self::row_to_track(&conn, row)?);
            }
            tracks
        };
        Ok(tracks)
    }

    fn merge_track_tags(
        &self,
        track_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<Option<Vec<String>>> {
        let conn = self.conn.lock().unwrap();
        let tags = with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM track WHERE id = ?1",
                    params![track_id],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                return Ok(None);
            }
            for tag in remove {
                tx.execute(
                    "DELETE FROM track_tag WHERE track_id = ?1 AND tag = ?2",
                    params![track_id, tag],
                )?;
            }
            for tag in add {
                tx.execute(
                    "INSERT OR IGNORE INTO track_tag (track_id, tag) VALUES (?1, ?2)",
                    params![track_id, tag],
                )?;
            }
            let tags = Self::tags_for_track(&tx, track_id)?;
            tx.commit()?;
            Ok(Some(tags))
        })
        .with_context(|| format!("Failed to merge tags for track {}", track_id))?;
        Ok(tags)
    }

    fn insert_document(&self, doc: &Document) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            // Counter bump and document insert commit together, a replayed
            // transaction cannot double-increment
            let updated = tx.execute(
                &format!(
                    "UPDATE album SET {} = {} + 1 WHERE id = ?1",
                    counter_column(doc.kind),
                    counter_column(doc.kind)
                ),
                params![doc.album_id],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO document (id, album_id, doc_type, author_user_id, author_name, title, text, is_hidden)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    doc.id,
                    doc.album_id,
                    doc.kind.to_int(),
                    doc.author_user_id,
                    doc.author_name,
                    doc.title,
                    doc.text,
                    doc.is_hidden as i64,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .with_context(|| format!("Failed to insert document for album {}", doc.album_id))?;
        Ok(inserted)
    }

    fn update_document(
        &self,
        id: &str,
        title: Option<&str>,
        text: &str,
        author_name: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE document SET title = ?1, text = ?2, author_name = ?3,
                 modified = cast(strftime('%s','now') as int) WHERE id = ?4",
                params![title, text, author_name, id],
            )
            .with_context(|| format!("Failed to update document {}", id))?;
        Ok(rows > 0)
    }

    fn set_document_hidden(&self, id: &str, hidden: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE document SET is_hidden = ?1 WHERE id = ?2",
                params![hidden as i64, id],
            )
            .with_context(|| format!("Failed to set hidden flag on document {}", id))?;
        Ok(rows > 0)
    }

    fn delete_document(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = with_retries(&self.retry_policy, || {
            let tx = conn.unchecked_transaction()?;
            let doc_row: Option<(String, i64)> = tx
                .query_row(
                    "SELECT album_id, doc_type FROM document WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    e => Err(e),
                })?;
            let (album_id, doc_type) = match doc_row {
                Some(found) => found,
                None => return Ok(false),
            };
            tx.execute("DELETE FROM document WHERE id = ?1", params![id])?;
            if let Some(kind) = DocKind::from_int(doc_type) {
                tx.execute(
                    &format!(
                        "UPDATE album SET {} = max(0, {} - 1) WHERE id = ?1",
                        counter_column(kind),
                        counter_column(kind)
                    ),
                    params![album_id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
        .with_context(|| format!("Failed to delete document {}", id))?;
        Ok(deleted)
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM document WHERE id = ?1",
            DOCUMENT_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], row_to_document)?;
        Ok(rows.next().transpose()?)
    }

    fn documents_for_album(
        &self,
        album_id: &str,
        kind: DocKind,
        include_hidden: bool,
    ) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let hidden_clause = if include_hidden { "" } else { "AND is_hidden = 0" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM document WHERE album_id = ?1 AND doc_type = ?2 {} ORDER BY created DESC",
            DOCUMENT_COLUMNS, hidden_clause
        ))?;
        let docs = stmt
            .query_map(params![album_id, kind.to_int()], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    fn recent_reviews(&self, limit: usize) -> Result<Vec<Document>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM document WHERE doc_type = ?1 AND is_hidden = 0
             ORDER BY created DESC LIMIT ?2",
            DOCUMENT_COLUMNS
        ))?;
        let docs = stmt
            .query_map(params![DocKind::Review.to_int(), limit], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    fn insert_image(&self, image: &Image) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO image (id, data, mime_type) VALUES (?1, ?2, ?3)",
            params![image.id, image.data, image.mime_type],
        )
        .with_context(|| format!("Failed to insert image {}", image.id))?;
        Ok(())
    }

    fn get_image(&self, id: &str) -> Result<Option<Image>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, data, mime_type, created FROM image WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(Image {
                id: row.get(0)?,
                data: row.get(1)?,
                mime_type: row.get(2)?,
                created: row.get(3)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    fn config_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        Ok(value)
    }

    fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .with_context(|| format!("Failed to set config key '{}'", key))?;
        Ok(())
    }

    fn config_init(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: usize = conn.query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO config (key, value) VALUES ('initialized', '1')",
            [],
        )
        .context("Failed to seed config table")?;
        Ok(true)
    }

    fn searchable_entries(&self) -> Result<Vec<SearchEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut entries = Vec::new();
        {
            let mut stmt = conn.prepare("SELECT id, name FROM artist")?;
            let rows = stmt.query_map([], |row| {
                Ok(SearchEntry {
                    kind: EntityKind::Artist,
                    id: row.get(0)?,
                    text: row.get(1)?,
                })
            })?;
            for entry in rows {
                entries.push(entry?);
            }
        }
        {
            let mut stmt = conn.prepare("SELECT id, title, artist_name FROM album")?;
            let rows = stmt.query_map([], |row| {
                let title: String = row.get(1)?;
                let artist_name: String = row.get(2)?;
                Ok(SearchEntry {
                    kind: EntityKind::Album,
                    id: row.get(0)?,
                    text: format!("{} {}", title, artist_name),
                })
            })?;
            for entry in rows {
                entries.push(entry?);
            }
        }
        {
            let mut stmt = conn.prepare("SELECT id, title FROM track")?;
            let rows = stmt.query_map([], |row| {
                Ok(SearchEntry {
                    kind: EntityKind::Track,
                    id: row.get(0)?,
                    text: row.get(1)?,
                })
            })?;
            for entry in rows {
                entries.push(entry?);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteLibraryStore {
        SqliteLibraryStore::open_in_memory().unwrap()
    }

    fn sample_album(store: &SqliteLibraryStore) -> Album {
        let artist = store.create_artist("The Sea and Cake").unwrap();
        let album = Album {
            id: "album0000000test".to_string(),
            title: "Oui".to_string(),
            artist_id: Some(artist.id),
            artist_name: "The Sea and Cake".to_string(),
            label: Some("Thrill Jockey".to_string()),
            year: Some(2000),
            category: AlbumCategory::Core,
            is_compilation: false,
            num_reviews: 0,
            num_comments: 0,
            created: 0,
        };
        store.insert_album(&album).unwrap();
        album
    }

    fn review_for(album_id: &str, id: &str) -> Document {
        Document {
            id: id.to_string(),
            album_id: album_id.to_string(),
            kind: DocKind::Review,
            author_user_id: None,
            author_name: "dj marfa".to_string(),
            title: Some("solid".to_string()),
            text: "<p>good record</p>".to_string(),
            is_hidden: false,
            created: 0,
            modified: 0,
        }
    }

    #[test]
    fn artist_lookup_by_exact_name() {
        let store = store();
        let created = store.create_artist("The Fall").unwrap();
        assert_eq!(created.pretty_name, "Fall, The");

        let found = store.get_artist_by_name("The Fall").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.get_artist_by_name("the fall").unwrap().is_none());
    }

    #[test]
    fn bulk_add_skips_existing_names() {
        let store = store();
        store.create_artist("Autechre").unwrap();
        let names = vec![
            "Autechre".to_string(),
            "Boards of Canada".to_string(),
            "Plaid".to_string(),
        ];
        let created = store.bulk_add_artists(&names).unwrap();
        assert_eq!(created, 2);
        // Second run is a no-op
        assert_eq!(store.bulk_add_artists(&names).unwrap(), 0);
    }

    #[test]
    fn insert_document_increments_review_counter_once() {
        let store = store();
        let album = sample_album(&store);

        assert!(store.insert_document(&review_for(&album.id, "doc1")).unwrap());

        let loaded = store.get_album(&album.id).unwrap().unwrap();
        assert_eq!(loaded.num_reviews, 1);
        assert_eq!(loaded.num_comments, 0);
    }

    #[test]
    fn insert_document_for_missing_album_writes_nothing() {
        let store = store();
        sample_album(&store);

        let inserted = store.insert_document(&review_for("nope", "doc1")).unwrap();
        assert!(!inserted);
        assert!(store.get_document("doc1").unwrap().is_none());
    }

    #[test]
    fn delete_document_decrements_counter() {
        let store = store();
        let album = sample_album(&store);
        store.insert_document(&review_for(&album.id, "doc1")).unwrap();
        store.insert_document(&review_for(&album.id, "doc2")).unwrap();

        assert!(store.delete_document("doc1").unwrap());

        let loaded = store.get_album(&album.id).unwrap().unwrap();
        assert_eq!(loaded.num_reviews, 1);
        assert!(!store.delete_document("doc1").unwrap());
        assert_eq!(store.get_album(&album.id).unwrap().unwrap().num_reviews, 1);
    }

    #[test]
    fn hidden_reviews_are_filtered_unless_requested() {
        let store = store();
        let album = sample_album(&store);
        store.insert_document(&review_for(&album.id, "doc1")).unwrap();
        store.insert_document(&review_for(&album.id, "doc2")).unwrap();
        assert!(store.set_document_hidden("doc1", true).unwrap());

        let visible = store
            .documents_for_album(&album.id, DocKind::Review, false)
            .unwrap();
        assert_eq!(visible.len(), 1);
        let all = store
            .documents_for_album(&album.id, DocKind::Review, true)
            .unwrap();
        assert_eq!(all.len(), 2);

        // Hidden reviews never reach the landing page
        let recent = store.recent_reviews(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "doc2");
    }

    #[test]
    fn tag_merge_adds_and_removes() {
        let store = store();
        let album = sample_album(&store);
        let track = Track {
            id: "track000000test1".to_string(),
            album_id: Some(album.id.clone()),
            artist_id: None,
            title: "Afternoon Speaker".to_string(),
            track_num: 1,
            duration_ms: Some(214_000),
            tags: vec![TAG_EXPLICIT.to_string()],
        };
        store.insert_track(&track).unwrap();

        let tags = store
            .merge_track_tags(
                &track.id,
                &[TAG_RECOMMENDED.to_string()],
                &[TAG_EXPLICIT.to_string()],
            )
            .unwrap()
            .unwrap();
        assert_eq!(tags, vec![TAG_RECOMMENDED.to_string()]);

        assert!(store
            .merge_track_tags("missing", &[], &[])
            .unwrap()
            .is_none());
    }

    #[test]
    fn config_init_is_lazy_and_idempotent() {
        let store = store();
        assert!(store.config_init().unwrap());
        assert!(!store.config_init().unwrap());
        store.config_set("theme", "dark").unwrap();
        assert_eq!(store.config_get("theme").unwrap().unwrap(), "dark");
        assert!(store.config_get("missing").unwrap().is_none());
    }

    #[test]
    fn album_pagination_reports_total() {
        let store = store();
        let artist = store.create_artist("Movietone").unwrap();
        for i in 0..7 {
            store
                .insert_album(&Album {
                    id: format!("album{:011}", i),
                    title: format!("Album {}", i),
                    artist_id: Some(artist.id.clone()),
                    artist_name: "Movietone".to_string(),
                    label: None,
                    year: Some(1995 + i),
                    category: if i % 2 == 0 {
                        AlbumCategory::Core
                    } else {
                        AlbumCategory::Local
                    },
                    is_compilation: false,
                    num_reviews: 0,
                    num_comments: 0,
                    created: 0,
                })
                .unwrap();
        }

        let (page, total) = store.list_albums(0, 3, None).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(total, 7);

        let (_, local_total) = store.list_albums(0, 10, Some(AlbumCategory::Local)).unwrap();
        assert_eq!(local_total, 3);
    }
}
