use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::domain::{Note, Visibility};
use crate::error::{HubError, HubResult};

/// Column list matching [`note_from_row`]. Keep the two in sync.
pub(crate) const NOTE_COLUMNS: &str = "id, title, subject, university, tags, owner_id, \
     content_ref, visibility, comments_enabled, upvotes, downvotes, created_at";

/// Handle to the note store: a SQLite pool plus the schema the engagement
/// components operate on. All components clone the pool from here.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
    pub(crate) text_search: bool,
}

impl Store {
    /// Opens (or creates) the store database file under `dir`.
    pub async fn open(dir: &Path) -> HubResult<Self> {
        let db_path = dir.join("hub.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());

        Self::connect(&url).await
    }

    /// Connects to a SQLite database by URL and ensures the schema exists.
    ///
    /// The full-text index is optional: if the FTS5 virtual table cannot be
    /// created, catalog text search falls back to substring matching.
    pub async fn connect(url: &str) -> HubResult<Self> {
        let pool = SqlitePool::connect(url).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                subject TEXT NOT NULL,
                university TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                owner_id TEXT NOT NULL,
                content_ref TEXT NOT NULL,
                visibility TEXT NOT NULL DEFAULT 'public',
                comments_enabled INTEGER NOT NULL DEFAULT 1,
                upvotes INTEGER NOT NULL DEFAULT 0,
                downvotes INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS notes_owner_created
             ON notes (owner_id, created_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS note_votes (
                note_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                choice TEXT NOT NULL,
                UNIQUE (note_id, user_id)
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                note_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS comments_note ON comments (note_id)")
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bookmarks (
                user_id TEXT NOT NULL,
                note_id TEXT NOT NULL,
                UNIQUE (user_id, note_id)
            )",
        )
        .execute(&pool)
        .await?;

        let text_search = match create_text_index(&pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("text index unavailable, using substring search: {e}");
                false
            }
        };

        Ok(Store { pool, text_search })
    }

    /// Fetches a single note by id, without any visibility check.
    pub(crate) async fn fetch_note(&self, id: &str) -> HubResult<Option<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(note_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

async fn create_text_index(pool: &SqlitePool) -> HubResult<()> {
    sqlx::query(
        "CREATE VIRTUAL TABLE IF NOT EXISTS note_search
         USING fts5(note_id UNINDEXED, title, subject, university, tags)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS notes_ai AFTER INSERT ON notes BEGIN
         INSERT INTO note_search(note_id, title, subject, university, tags)
         VALUES (new.id, new.title, new.subject, new.university, new.tags);
        END",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS notes_ad AFTER DELETE ON notes BEGIN
         DELETE FROM note_search WHERE note_id = old.id;
        END",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS notes_au AFTER UPDATE ON notes BEGIN
         DELETE FROM note_search WHERE note_id = old.id;
         INSERT INTO note_search(note_id, title, subject, university, tags)
         VALUES (new.id, new.title, new.subject, new.university, new.tags);
        END",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Maps a row selected with [`NOTE_COLUMNS`] into a [`Note`].
pub(crate) fn note_from_row(row: &SqliteRow) -> HubResult<Note> {
    let tags_json: String = row.get(4);
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| HubError::Other(format!("corrupt tag list: {e}")))?;

    let visibility_str: String = row.get(7);
    let visibility = Visibility::parse(&visibility_str)
        .ok_or_else(|| HubError::Other(format!("corrupt visibility: {visibility_str}")))?;

    let comments_enabled: i64 = row.get(8);
    let created_at = from_millis(row.get(11))?;

    Ok(Note {
        id: row.get(0),
        title: row.get(1),
        subject: row.get(2),
        university: row.get(3),
        tags,
        owner_id: row.get(5),
        content_ref: row.get(6),
        visibility,
        comments_enabled: comments_enabled != 0,
        upvotes: row.get(9),
        downvotes: row.get(10),
        created_at,
    })
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> HubResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| HubError::Other(format!("timestamp out of range: {ms}")))
}
