use sqlx::{Row, SqlitePool};

use crate::domain::{VoteChoice, VoteTally};
use crate::error::{HubError, HubResult};
use crate::store::Store;

/// Per-note voting state machine.
///
/// Each user holds at most one active vote per note, kept in the
/// `note_votes` relation keyed by (note_id, user_id); the aggregate
/// counters on the note row are adjusted in the same transaction, so
/// `upvotes`/`downvotes` always equal the counted voter rows.
pub struct VoteLedger {
    pool: SqlitePool,
}

impl VoteLedger {
    pub fn new(store: &Store) -> Self {
        VoteLedger {
            pool: store.pool.clone(),
        }
    }

    /// Applies one vote submission and returns the post-mutation tallies.
    ///
    /// - no prior vote: record it, bump the matching counter
    /// - same choice resubmitted: toggle-off, remove it, drop the counter
    /// - different choice: switch, one counter up and the other down
    ///
    /// Decrements are floored at zero. There is no separate removal
    /// operation; toggle-off is the only way to retract a vote.
    pub async fn apply(
        &self,
        note_id: &str,
        user_id: &str,
        choice: VoteChoice,
    ) -> HubResult<VoteTally> {
        let mut tx = self.pool.begin().await?;

        let note = sqlx::query("SELECT 1 FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&mut *tx)
            .await?;
        if note.is_none() {
            return Err(HubError::NotFound("note"));
        }

        let existing = sqlx::query(
            "SELECT choice FROM note_votes WHERE note_id = ? AND user_id = ?",
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let existing = match existing {
            Some(row) => {
                let stored: String = row.get(0);
                Some(VoteChoice::parse(&stored).ok_or_else(|| {
                    HubError::Other(format!("corrupt vote choice: {stored}"))
                })?)
            }
            None => None,
        };

        let (counter, opposite) = counters_for(choice);

        match existing {
            None => {
                sqlx::query(
                    "INSERT INTO note_votes (note_id, user_id, choice) VALUES (?, ?, ?)",
                )
                .bind(note_id)
                .bind(user_id)
                .bind(choice.as_str())
                .execute(&mut *tx)
                .await?;

                let sql = format!("UPDATE notes SET {counter} = {counter} + 1 WHERE id = ?");
                sqlx::query(&sql).bind(note_id).execute(&mut *tx).await?;
            }
            Some(prev) if prev == choice => {
                sqlx::query("DELETE FROM note_votes WHERE note_id = ? AND user_id = ?")
                    .bind(note_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;

                let sql =
                    format!("UPDATE notes SET {counter} = MAX(0, {counter} - 1) WHERE id = ?");
                sqlx::query(&sql).bind(note_id).execute(&mut *tx).await?;
            }
            Some(_) => {
                sqlx::query(
                    "UPDATE note_votes SET choice = ? WHERE note_id = ? AND user_id = ?",
                )
                .bind(choice.as_str())
                .bind(note_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

                let sql = format!(
                    "UPDATE notes SET {counter} = {counter} + 1,
                         {opposite} = MAX(0, {opposite} - 1)
                     WHERE id = ?"
                );
                sqlx::query(&sql).bind(note_id).execute(&mut *tx).await?;
            }
        }

        let row = sqlx::query("SELECT upvotes, downvotes FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_one(&mut *tx)
            .await?;

        let tally = VoteTally {
            upvotes: row.get(0),
            downvotes: row.get(1),
        };

        tx.commit().await?;

        tracing::debug!(
            note = %note_id,
            user = %user_id,
            choice = choice.as_str(),
            "vote applied"
        );

        Ok(tally)
    }
}

/// Column pair for a choice: the counter it bumps and the opposite one.
fn counters_for(choice: VoteChoice) -> (&'static str, &'static str) {
    match choice {
        VoteChoice::Upvote => ("upvotes", "downvotes"),
        VoteChoice::Downvote => ("downvotes", "upvotes"),
    }
}
