//! Role reconciliation
//!
//! Brings a player's external tier grants in line with a freshly computed
//! rank pair, then refreshes the cached rank columns.

use genji_common::events::{GenjiEvent, RoleRef};
use genji_common::models::Player;
use serde::Serialize;
use tracing::{debug, info};

use super::calculator::RankPair;
use super::ladder::{LadderRole, RolePlan};
use super::RankService;
use crate::error::Result;
use crate::membership::{notify_best_effort, Delivery};

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The player has no membership to reconcile against
    NotMember,
    /// Grants and cache already matched
    Unchanged { ranks: RankPair },
    /// Grants matched but the cached rank columns were stale
    CacheRefreshed { ranks: RankPair },
    /// Grants were changed
    Updated {
        ranks: RankPair,
        added: Vec<RoleRef>,
        removed: Vec<RoleRef>,
        notification: Delivery,
    },
}

impl ReconcileOutcome {
    pub fn ranks(&self) -> Option<RankPair> {
        match self {
            ReconcileOutcome::NotMember => None,
            ReconcileOutcome::Unchanged { ranks }
            | ReconcileOutcome::CacheRefreshed { ranks }
            | ReconcileOutcome::Updated { ranks, .. } => Some(*ranks),
        }
    }
}

/// Direct message sent when grants change
pub fn role_change_message(plan: &RolePlan) -> String {
    let names = |roles: &[LadderRole]| {
        roles
            .iter()
            .map(|r| format!("**{}**", r.name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut message = String::from(
        "ALERT! Your roles have been updated! If roles have been removed, it's because \
         a map that you have completed has changed difficulty.\n\
         Complete more maps to get your roles back!\n",
    );
    if !plan.added.is_empty() {
        message.push_str(&format!("{} has been added.\n", names(&plan.added)));
    }
    if !plan.removed.is_empty() {
        message.push_str(&format!("{} has been removed.\n", names(&plan.removed)));
    }
    message
}

impl RankService {
    /// Reconcile `player`'s grants against `ranks`
    ///
    /// Role delta failures propagate; the direct message is best effort.
    pub async fn reconcile(&self, player: &Player, ranks: RankPair) -> Result<ReconcileOutcome> {
        let user_id = player.user_id;

        let Some(held) = self.membership.member_roles(user_id).await? else {
            debug!(user_id, "Skipping reconciliation for non-member");
            return Ok(ReconcileOutcome::NotMember);
        };

        let plan = self.ladders.plan(&held, ranks);

        if plan.is_empty() {
            if ranks.matches(player.rank, player.rank_plus) {
                return Ok(ReconcileOutcome::Unchanged { ranks });
            }
            self.store_ranks(player, ranks).await?;
            debug!(
                user_id,
                rank = ranks.rank,
                rank_plus = ranks.rank_plus,
                "Cached rank refreshed"
            );
            return Ok(ReconcileOutcome::CacheRefreshed { ranks });
        }

        self.membership.apply_role_delta(user_id, &plan.delta()).await?;
        self.store_ranks(player, ranks).await?;

        let added: Vec<RoleRef> = plan.added.iter().map(RoleRef::from).collect();
        let removed: Vec<RoleRef> = plan.removed.iter().map(RoleRef::from).collect();

        info!(
            user_id,
            rank = ranks.rank,
            rank_plus = ranks.rank_plus,
            added = added.len(),
            removed = removed.len(),
            "Tier roles updated"
        );

        self.events.emit(GenjiEvent::RankChanged {
            user_id,
            nickname: player.nickname.clone(),
            rank: ranks.rank,
            rank_plus: ranks.rank_plus,
            added: added.clone(),
            removed: removed.clone(),
            timestamp: chrono::Utc::now(),
        });

        let notification = if player.alertable {
            notify_best_effort(self.membership.as_ref(), user_id, &role_change_message(&plan))
                .await
        } else {
            Delivery::Skipped
        };

        Ok(ReconcileOutcome::Updated {
            ranks,
            added,
            removed,
            notification,
        })
    }

    async fn store_ranks(&self, player: &Player, ranks: RankPair) -> Result<()> {
        sqlx::query("UPDATE users SET rank = ?, rank_plus = ? WHERE user_id = ?")
            .bind(i64::from(ranks.rank))
            .bind(i64::from(ranks.rank_plus))
            .bind(player.user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lists_added_and_removed() {
        let plan = RolePlan {
            added: vec![LadderRole {
                id: 1,
                name: "Pro".to_string(),
            }],
            removed: vec![
                LadderRole {
                    id: 2,
                    name: "Master".to_string(),
                },
                LadderRole {
                    id: 3,
                    name: "God".to_string(),
                },
            ],
        };
        let message = role_change_message(&plan);
        assert!(message.contains("**Pro** has been added."));
        assert!(message.contains("**Master**, **God** has been removed."));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ReconcileOutcome::Unchanged {
            ranks: RankPair::new(3, 1),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "unchanged");
        assert_eq!(json["ranks"]["rank"], 3);
        assert_eq!(ReconcileOutcome::NotMember.ranks(), None);
    }
}
