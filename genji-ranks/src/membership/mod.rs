//! Membership and roles system boundary
//!
//! The community server owns role grants; the core only reads a member's
//! grants, applies role deltas and sends best-effort direct messages.
//!
//! Two implementations:
//! - [`DiscordMembership`]: Discord REST API (production)
//! - [`InMemoryMembership`]: process-local grants (dry runs and tests)

mod discord;
mod memory;

pub use discord::{DiscordMembership, DiscordSettings, DISCORD_API_URL};
pub use memory::InMemoryMembership;

use async_trait::async_trait;
use genji_common::models::{RoleId, UserId};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Membership system errors
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Network error: {0}")]
    Network(String),

    /// Missing permission, or the member does not accept messages
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited (retry after {0:?})")]
    RateLimited(Option<Duration>),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Roles to grant and revoke for one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleDelta {
    pub add: Vec<RoleId>,
    pub remove: Vec<RoleId>,
}

impl RoleDelta {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Result of a best-effort delivery
///
/// Delivery failures are carried as data, never as an `Err`, so callers on the
/// best-effort path cannot accidentally propagate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    /// Player opted out of direct messages
    Skipped,
    /// Delivery was attempted and failed; the failure was suppressed
    Failed(String),
}

/// Membership and roles system contract
#[async_trait]
pub trait Membership: Send + Sync {
    /// Current role grants of a member
    ///
    /// Returns `Ok(None)` when the user is not a member of the community.
    async fn member_roles(&self, user_id: UserId) -> Result<Option<Vec<RoleId>>, MembershipError>;

    /// Apply a role delta. Re-applying grants that are already current is a no-op.
    async fn apply_role_delta(
        &self,
        user_id: UserId,
        delta: &RoleDelta,
    ) -> Result<(), MembershipError>;

    /// Send a direct message to a member
    async fn send_direct_message(
        &self,
        user_id: UserId,
        content: &str,
    ) -> Result<(), MembershipError>;
}

/// Send a direct message, suppressing any failure
pub async fn notify_best_effort(
    membership: &dyn Membership,
    user_id: UserId,
    content: &str,
) -> Delivery {
    match membership.send_direct_message(user_id, content).await {
        Ok(()) => Delivery::Sent,
        Err(e) => {
            tracing::debug!(user_id, error = %e, "Direct message not delivered");
            Delivery::Failed(e.to_string())
        }
    }
}
