use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{self, NewNote, Note, NoteUpdate};
use crate::error::{HubError, HubResult};
use crate::ingest::IngestGate;
use crate::store::{NOTE_COLUMNS, Store, note_from_row, to_millis};

/// High-level note operations: creation (quota gated), single-note fetch
/// with visibility enforcement, owner-only update/delete, and the
/// owner's own listing.
pub struct Notes {
    store: Store,
    gate: IngestGate,
}

impl Notes {
    pub fn new(store: &Store) -> Self {
        Notes {
            store: store.clone(),
            gate: IngestGate::new(store),
        }
    }

    /// Same as [`Notes::new`] but with a non-default daily upload limit.
    pub fn with_daily_limit(store: &Store, limit: u32) -> Self {
        Notes {
            store: store.clone(),
            gate: IngestGate::with_limit(store, limit),
        }
    }

    /// Creates a note after validation and the daily-quota check.
    pub async fn create(&self, new: NewNote) -> HubResult<Note> {
        self.create_at(new, Utc::now()).await
    }

    /// Creation with an explicit clock, used to pin the quota window.
    pub async fn create_at(&self, new: NewNote, now: DateTime<Utc>) -> HubResult<Note> {
        let title = domain::required("title", &new.title)?;
        let subject = domain::required("subject", &new.subject)?;
        let university = domain::required("university", &new.university)?;
        let content_ref = domain::required("contentRef", &new.content_ref)?;
        let owner_id = domain::required("ownerId", &new.owner_id)?;
        let tags = domain::clean_tags(&new.tags);

        self.gate.admit(&owner_id, now).await?;

        let note = Note {
            id: Uuid::new_v4().to_string(),
            title,
            subject,
            university,
            tags,
            owner_id,
            content_ref,
            visibility: new.visibility,
            comments_enabled: true,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
        };

        let tags_json = serde_json::to_string(&note.tags)
            .map_err(|e| HubError::Other(format!("tag encoding failed: {e}")))?;

        sqlx::query(
            "INSERT INTO notes (id, title, subject, university, tags, owner_id,
                 content_ref, visibility, comments_enabled, upvotes, downvotes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, 0, 0, ?)",
        )
        .bind(&note.id)
        .bind(&note.title)
        .bind(&note.subject)
        .bind(&note.university)
        .bind(&tags_json)
        .bind(&note.owner_id)
        .bind(&note.content_ref)
        .bind(note.visibility.as_str())
        .bind(to_millis(note.created_at))
        .execute(&self.store.pool)
        .await?;

        tracing::debug!(note = %note.id, owner = %note.owner_id, "note created");

        Ok(note)
    }

    /// Fetches one note, enforcing the visibility policy for `viewer`.
    ///
    /// A missing id is `NotFound`; an existing note the viewer may not
    /// read is `Forbidden`. The two stay distinguishable on purpose.
    pub async fn get(&self, id: &str, viewer: Option<&str>) -> HubResult<Note> {
        let note = self
            .store
            .fetch_note(id)
            .await?
            .ok_or(HubError::NotFound("note"))?;

        if !note.readable_by(viewer) {
            return Err(HubError::Forbidden("this note is private"));
        }

        Ok(note)
    }

    /// Applies a partial update. Only the owner may update a note.
    pub async fn update(
        &self,
        id: &str,
        requester: &str,
        update: NoteUpdate,
    ) -> HubResult<Note> {
        let mut note = self
            .store
            .fetch_note(id)
            .await?
            .ok_or(HubError::NotFound("note"))?;

        if note.owner_id != requester {
            return Err(HubError::Forbidden("you cannot edit this note"));
        }

        if let Some(title) = update.title {
            note.title = domain::required("title", &title)?;
        }
        if let Some(subject) = update.subject {
            note.subject = domain::required("subject", &subject)?;
        }
        if let Some(university) = update.university {
            note.university = domain::required("university", &university)?;
        }
        if let Some(content_ref) = update.content_ref {
            note.content_ref = domain::required("contentRef", &content_ref)?;
        }
        if let Some(tags) = update.tags {
            note.tags = domain::clean_tags(&tags);
        }
        if let Some(visibility) = update.visibility {
            note.visibility = visibility;
        }
        if let Some(enabled) = update.comments_enabled {
            note.comments_enabled = enabled;
        }

        let tags_json = serde_json::to_string(&note.tags)
            .map_err(|e| HubError::Other(format!("tag encoding failed: {e}")))?;

        sqlx::query(
            "UPDATE notes SET title = ?, subject = ?, university = ?, tags = ?,
                 content_ref = ?, visibility = ?, comments_enabled = ?
             WHERE id = ?",
        )
        .bind(&note.title)
        .bind(&note.subject)
        .bind(&note.university)
        .bind(&tags_json)
        .bind(&note.content_ref)
        .bind(note.visibility.as_str())
        .bind(note.comments_enabled)
        .bind(&note.id)
        .execute(&self.store.pool)
        .await?;

        Ok(note)
    }

    /// Deletes a note along with its vote and comment rows. Bookmarks
    /// referencing the note are left behind and filtered out at read time.
    pub async fn delete(&self, id: &str, requester: &str) -> HubResult<()> {
        let note = self
            .store
            .fetch_note(id)
            .await?
            .ok_or(HubError::NotFound("note"))?;

        if note.owner_id != requester {
            return Err(HubError::Forbidden("you cannot delete this note"));
        }

        let mut tx = self.store.pool.begin().await?;

        sqlx::query("DELETE FROM note_votes WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(note = %id, "note deleted");

        Ok(())
    }

    /// Lists every note owned by `owner`, newest first, regardless of
    /// visibility.
    pub async fn list_mine(&self, owner: &str) -> HubResult<Vec<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = ?
             ORDER BY created_at DESC, rowid DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(&self.store.pool)
            .await?;

        rows.iter().map(note_from_row).collect()
    }
}
