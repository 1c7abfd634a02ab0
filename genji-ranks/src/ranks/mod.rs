//! Skill-tier ranking
//!
//! Pipeline for one player: aggregate completions, calculate the rank pair,
//! reconcile tier grants. Runs inside the player's exclusive scope.

pub mod aggregator;
pub mod calculator;
pub mod ladder;
pub mod locks;
pub mod reconciler;

pub use aggregator::{aggregate, BucketCounts, CompletionCounts};
pub use calculator::{calculate, RankPair};
pub use ladder::{LadderRole, RoleLadder, RoleLadders, RolePlan};
pub use locks::PlayerLocks;
pub use reconciler::ReconcileOutcome;

use genji_common::events::EventBus;
use genji_common::models::{Player, UserId};
use genji_common::RankTable;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::membership::Membership;

/// Read-only rank view of a player
#[derive(Debug, Clone, Serialize)]
pub struct RankPreview {
    pub user_id: UserId,
    pub nickname: String,
    pub completions: CompletionCounts,
    pub ranks: RankPair,
    /// Values from the last reconciliation
    pub cached: RankPair,
}

/// Background re-synchronisation of a set of players
///
/// Each player runs in its own task; a failure is logged and never affects the
/// other players.
#[derive(Debug)]
pub struct FanOut {
    players: Vec<UserId>,
    tasks: Vec<JoinHandle<()>>,
}

impl FanOut {
    /// Fan-out whose syncs all run under `task`
    pub(crate) fn scheduled(players: Vec<UserId>, task: JoinHandle<()>) -> Self {
        Self {
            players,
            tasks: vec![task],
        }
    }

    pub fn players(&self) -> &[UserId] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Wait for every scheduled sync to finish
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Rank resync task aborted");
            }
        }
    }
}

/// Ranking pipeline and its collaborators
#[derive(Clone)]
pub struct RankService {
    db: SqlitePool,
    table: Arc<RankTable>,
    ladders: Arc<RoleLadders>,
    membership: Arc<dyn Membership>,
    events: EventBus,
    locks: Arc<PlayerLocks>,
}

impl RankService {
    pub fn new(
        db: SqlitePool,
        table: RankTable,
        ladders: RoleLadders,
        membership: Arc<dyn Membership>,
        events: EventBus,
    ) -> Self {
        Self {
            db,
            table: Arc::new(table),
            ladders: Arc::new(ladders),
            membership,
            events,
            locks: Arc::new(PlayerLocks::new()),
        }
    }

    pub fn table(&self) -> &RankTable {
        &self.table
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    async fn load_player(&self, user_id: UserId) -> Result<Player> {
        sqlx::query_as::<_, Player>(
            "SELECT user_id, nickname, rank, rank_plus, alertable FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Error::not_found(format!("Player not found: {}", user_id)))
    }

    /// Aggregate and calculate without touching grants or the cache
    pub async fn preview(&self, user_id: UserId) -> Result<RankPreview> {
        let player = self.load_player(user_id).await?;
        let completions = aggregate(&self.db, &self.table, user_id).await?;
        let ranks = calculate(&completions, &self.table);

        Ok(RankPreview {
            user_id,
            nickname: player.nickname,
            completions,
            ranks,
            cached: RankPair::new(
                u32::try_from(player.rank).unwrap_or(0),
                u32::try_from(player.rank_plus).unwrap_or(0),
            ),
        })
    }

    /// Recompute one player's rank and reconcile their tier grants
    pub async fn sync_player(&self, user_id: UserId) -> Result<ReconcileOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        let player = self.load_player(user_id).await?;
        let completions = aggregate(&self.db, &self.table, user_id).await?;
        let ranks = calculate(&completions, &self.table);
        debug!(
            user_id,
            rank = ranks.rank,
            rank_plus = ranks.rank_plus,
            "Rank calculated"
        );

        self.reconcile(&player, ranks).await
    }

    /// Spawn one sync per distinct player
    pub fn resync_players(&self, players: Vec<UserId>) -> FanOut {
        let mut players = players;
        players.sort_unstable();
        players.dedup();

        let tasks = players
            .iter()
            .map(|&user_id| {
                let service = self.clone();
                tokio::spawn(async move {
                    match service.sync_player(user_id).await {
                        Ok(outcome) => debug!(user_id, ?outcome, "Rank resync finished"),
                        Err(e) => warn!(user_id, error = %e, "Rank resync failed"),
                    }
                })
            })
            .collect();

        FanOut { players, tasks }
    }
}
