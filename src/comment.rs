use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{self, Comment};
use crate::error::{HubError, HubResult};
use crate::store::{Store, from_millis, to_millis};

/// Append/remove log of comments scoped to a note.
///
/// Comment creation is gated by the note's `comments_enabled` toggle at
/// creation time; disabling comments later hides nothing that was already
/// written.
pub struct CommentStore {
    pool: SqlitePool,
}

impl CommentStore {
    pub fn new(store: &Store) -> Self {
        CommentStore {
            pool: store.pool.clone(),
        }
    }

    /// Adds a comment to a note.
    ///
    /// Fails with `Forbidden` when the note has comments disabled (this
    /// applies to the note owner too) and with `Validation` when the body
    /// trims to nothing.
    pub async fn add(&self, note_id: &str, author_id: &str, text: &str) -> HubResult<Comment> {
        let row = sqlx::query("SELECT comments_enabled FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(HubError::NotFound("note"))?;

        let enabled: i64 = row.get(0);
        if enabled == 0 {
            return Err(HubError::Forbidden("comments are disabled for this note"));
        }

        let body = domain::required("comment text", text)?;

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            note_id: note_id.to_owned(),
            author_id: author_id.to_owned(),
            text: body,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO comments (id, note_id, author_id, body, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.note_id)
        .bind(&comment.author_id)
        .bind(&comment.text)
        .bind(to_millis(comment.created_at))
        .execute(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Lists a note's comments, newest first.
    ///
    /// Readable without authentication and regardless of the note's
    /// current `comments_enabled` value.
    pub async fn list(&self, note_id: &str) -> HubResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, note_id, author_id, body, created_at FROM comments
             WHERE note_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            comments.push(Comment {
                id: row.get(0),
                note_id: row.get(1),
                author_id: row.get(2),
                text: row.get(3),
                created_at: from_millis(row.get(4))?,
            });
        }

        Ok(comments)
    }

    /// Deletes a comment. Allowed for the comment's author or the note's
    /// owner; anyone else gets `Forbidden`.
    pub async fn remove(
        &self,
        note_id: &str,
        comment_id: &str,
        requester: &str,
    ) -> HubResult<()> {
        let comment = sqlx::query(
            "SELECT author_id FROM comments WHERE id = ? AND note_id = ?",
        )
        .bind(comment_id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("comment"))?;

        let note = sqlx::query("SELECT owner_id FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(HubError::NotFound("note"))?;

        let author_id: String = comment.get(0);
        let owner_id: String = note.get(0);

        if requester != author_id && requester != owner_id {
            return Err(HubError::Forbidden("you cannot delete this comment"));
        }

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(comment = %comment_id, note = %note_id, "comment deleted");

        Ok(())
    }
}
