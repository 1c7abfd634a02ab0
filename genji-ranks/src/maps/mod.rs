//! Map catalog writes
//!
//! Every write that can move a map between difficulty buckets, or in or out of
//! ranking, commits first and then re-synchronises the players holding
//! completions on that map. Lookups run before a write transaction opens so
//! that its first statement takes the write lock.

pub mod info;
pub mod submission;
pub mod writer;

pub use info::MapInfo;
pub use submission::{Submission, SubmissionBuilder};
pub use writer::SubmissionReceipt;

use chrono::{DateTime, Utc};
use genji_common::difficulty::MAX_DIFFICULTY;
use genji_common::events::{EventBus, GenjiEvent};
use genji_common::models::UserId;
use sqlx::SqlitePool;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ranks::{FanOut, RankService};

#[derive(Clone)]
pub struct MapService {
    db: SqlitePool,
    ranks: RankService,
    events: EventBus,
}

impl MapService {
    pub fn new(db: SqlitePool, ranks: RankService, events: EventBus) -> Self {
        Self { db, ranks, events }
    }

    /// Persist a submission as one unit, then announce it and resync players
    ///
    /// `privileged` submissions are official immediately and skip the cooldown
    /// bookkeeping.
    pub async fn submit(
        &self,
        submission: &Submission,
        privileged: bool,
    ) -> Result<(SubmissionReceipt, FanOut)> {
        // map_creators references users, so the creator cannot vanish unnoticed
        let nickname = nickname(&self.db, submission.creator()).await?;

        let mut tx = self.db.begin().await?;
        let receipt = writer::write_submission(&mut *tx, submission, privileged).await?;
        tx.commit().await?;

        info!(
            map_code = %receipt.map_code,
            user_id = submission.creator(),
            official = privileged,
            "Map submitted"
        );

        self.events.emit(GenjiEvent::MapSubmitted {
            user_id: submission.creator(),
            nickname,
            map_name: submission.map_name().to_string(),
            difficulty: submission.grade().to_string(),
            map_code: receipt.map_code.clone(),
            timestamp: Utc::now(),
        });

        let fan_out = self.resync_map(submission.map_code()).await;
        Ok((receipt, fan_out))
    }

    /// Insert or replace one rater's difficulty for a map
    pub async fn rate_map(
        &self,
        map_code: &str,
        user_id: UserId,
        difficulty: f64,
    ) -> Result<FanOut> {
        if !difficulty.is_finite() || !(0.0..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(Error::invalid(format!(
                "difficulty must be between 0 and {}, got {}",
                MAX_DIFFICULTY, difficulty
            )));
        }

        ensure_map(&self.db, map_code).await?;
        nickname(&self.db, user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO map_ratings (map_code, user_id, difficulty) VALUES (?, ?, ?)
            ON CONFLICT (map_code, user_id) DO UPDATE SET difficulty = excluded.difficulty
            "#,
        )
        .bind(map_code)
        .bind(user_id)
        .bind(difficulty)
        .execute(&self.db)
        .await?;

        info!(map_code, user_id, difficulty, "Map rated");

        Ok(self.resync_map(map_code).await)
    }

    /// Archive or restore a map
    pub async fn set_archived(&self, map_code: &str, archived: bool) -> Result<FanOut> {
        let result = sqlx::query("UPDATE maps SET archived = ? WHERE map_code = ?")
            .bind(archived)
            .bind(map_code)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("Map not found: {}", map_code)));
        }

        info!(map_code, archived, "Map archive flag changed");

        Ok(self.resync_map(map_code).await)
    }

    /// Map row with its tags, creators, guides, mean rating and medals
    pub async fn map_info(&self, map_code: &str) -> Result<MapInfo> {
        info::map_info(&self.db, map_code).await
    }

    /// Most recent non-privileged submission by `user_id`
    pub async fn last_submission(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>> {
        let latest = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT submitted_at FROM map_submission_dates WHERE user_id = ? ORDER BY submitted_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(latest)
    }

    /// Players with a completion on `map_code`
    pub async fn affected_players(&self, map_code: &str) -> Result<Vec<UserId>> {
        let players = sqlx::query_scalar::<_, UserId>(
            "SELECT DISTINCT user_id FROM records WHERE map_code = ?",
        )
        .bind(map_code)
        .fetch_all(&self.db)
        .await?;
        Ok(players)
    }

    /// Look up and resync the players of `map_code` in a detached task
    ///
    /// The caller only waits for the player list; dropping the caller after
    /// that, or before it, leaves the resync running.
    async fn resync_map(&self, map_code: &str) -> FanOut {
        let (players_tx, players_rx) = oneshot::channel();
        let maps = self.clone();
        let map_code = map_code.to_string();

        let task = tokio::spawn(async move {
            let players = match maps.affected_players(&map_code).await {
                Ok(players) => players,
                Err(e) => {
                    warn!(
                        map_code = %map_code,
                        error = %e,
                        "Affected player lookup failed"
                    );
                    return;
                }
            };
            if !players.is_empty() {
                info!(
                    map_code = %map_code,
                    players = players.len(),
                    "Resyncing affected players"
                );
            }

            let fan_out = maps.ranks.resync_players(players);
            // The requester may be gone; the syncs run regardless
            let _ = players_tx.send(fan_out.players().to_vec());
            fan_out.join().await;
        });

        let players = players_rx.await.unwrap_or_default();
        FanOut::scheduled(players, task)
    }
}

async fn nickname(db: &SqlitePool, user_id: UserId) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT nickname FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Player not found: {}", user_id)))
}

async fn ensure_map(db: &SqlitePool, map_code: &str) -> Result<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM maps WHERE map_code = ?")
        .bind(map_code)
        .fetch_optional(db)
        .await?
        .is_some();
    if exists {
        Ok(())
    } else {
        Err(Error::not_found(format!("Map not found: {}", map_code)))
    }
}
