use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::{HubError, HubResult};
use crate::store::{Store, to_millis};

/// Default per-user daily upload limit.
pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Best-effort admission check for note creation: counts the user's notes
/// created in the current local calendar day and rejects once the limit is
/// reached.
///
/// The count and the subsequent insert are two separate store calls, so a
/// concurrent burst can overrun the limit by a small margin. That is an
/// accepted tolerance, not an invariant.
pub struct IngestGate {
    pool: SqlitePool,
    limit: u32,
}

impl IngestGate {
    pub fn new(store: &Store) -> Self {
        Self::with_limit(store, DEFAULT_DAILY_LIMIT)
    }

    pub fn with_limit(store: &Store, limit: u32) -> Self {
        IngestGate {
            pool: store.pool.clone(),
            limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Admits or rejects an upload at instant `now`.
    ///
    /// Rejection is `QuotaExceeded` carrying the configured limit.
    pub async fn admit(&self, user_id: &str, now: DateTime<Utc>) -> HubResult<()> {
        let (start, end) = day_window(now);

        let row = sqlx::query(
            "SELECT COUNT(*) FROM notes
             WHERE owner_id = ? AND created_at >= ? AND created_at < ?",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let uploaded_today: i64 = row.get(0);

        if uploaded_today >= i64::from(self.limit) {
            tracing::debug!(user = %user_id, limit = self.limit, "daily upload limit hit");
            return Err(HubError::QuotaExceeded { limit: self.limit });
        }

        Ok(())
    }
}

/// Half-open `[midnight, next midnight)` window around `now` in the
/// server's local calendar day, as unix milliseconds.
fn day_window(now: DateTime<Utc>) -> (i64, i64) {
    let local_day = now.with_timezone(&Local).date_naive();

    let start = local_day
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // midnight skipped by a DST jump: fall back to the UTC reading
        .unwrap_or_else(|| local_day.and_time(NaiveTime::MIN).and_utc());

    let end = local_day
        .succ_opt()
        .map(|next| {
            next.and_time(NaiveTime::MIN)
                .and_local_timezone(Local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| next.and_time(NaiveTime::MIN).and_utc())
        })
        .unwrap_or_else(|| start + Duration::days(1));

    (to_millis(start), to_millis(end))
}
