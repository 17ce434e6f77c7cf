use sqlx::{Row, SqlitePool};

use crate::domain::Note;
use crate::error::HubResult;
use crate::store::{NOTE_COLUMNS, Store, note_from_row};

/// Per-user set of saved note ids, exposed as a toggle.
///
/// Toggling performs no existence check on the note id; a saved id whose
/// note was deleted later is simply dropped when the list is read.
pub struct BookmarkIndex {
    pool: SqlitePool,
}

impl BookmarkIndex {
    pub fn new(store: &Store) -> Self {
        BookmarkIndex {
            pool: store.pool.clone(),
        }
    }

    /// Flips membership of `note_id` in the user's saved set and reports
    /// the new state: `true` when the note is now bookmarked.
    pub async fn toggle(&self, user_id: &str, note_id: &str) -> HubResult<bool> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT 1 FROM bookmarks WHERE user_id = ? AND note_id = ?",
        )
        .bind(user_id)
        .bind(note_id)
        .fetch_optional(&mut *tx)
        .await?;

        let bookmarked = if existing.is_some() {
            sqlx::query("DELETE FROM bookmarks WHERE user_id = ? AND note_id = ?")
                .bind(user_id)
                .bind(note_id)
                .execute(&mut *tx)
                .await?;
            false
        } else {
            sqlx::query("INSERT INTO bookmarks (user_id, note_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(note_id)
                .execute(&mut *tx)
                .await?;
            true
        };

        tx.commit().await?;

        Ok(bookmarked)
    }

    /// Whether `note_id` is currently in the user's saved set.
    pub async fn contains(&self, user_id: &str, note_id: &str) -> HubResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM bookmarks WHERE user_id = ? AND note_id = ?",
        )
        .bind(user_id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Lists the user's bookmarked notes in the order they were saved.
    ///
    /// The saved set is joined against live notes, so ids pointing at
    /// deleted notes are filtered out here.
    pub async fn list(&self, user_id: &str) -> HubResult<Vec<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             JOIN bookmarks b ON b.note_id = notes.id
             WHERE b.user_id = ?
             ORDER BY b.rowid"
        );

        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter().map(note_from_row).collect()
    }
}
