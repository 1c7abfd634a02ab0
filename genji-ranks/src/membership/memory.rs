//! Process-local membership system
//!
//! Holds role grants in memory. Backs `--dry-run` mode, where reconciliation
//! runs end to end without touching the community server, and the tests.

use async_trait::async_trait;
use genji_common::models::{RoleId, UserId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;

use super::{Membership, MembershipError, RoleDelta};

#[derive(Debug, Default)]
struct State {
    members: HashMap<UserId, BTreeSet<RoleId>>,
    blocked_dms: HashSet<UserId>,
    fail_role_updates: bool,
    direct_messages: Vec<(UserId, String)>,
    deltas_applied: usize,
}

/// In-memory [`Membership`] implementation
#[derive(Debug, Default)]
pub struct InMemoryMembership {
    state: Mutex<State>,
}

impl InMemoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member holding `roles`
    pub async fn add_member(&self, user_id: UserId, roles: impl IntoIterator<Item = RoleId>) {
        let mut state = self.state.lock().await;
        state.members.insert(user_id, roles.into_iter().collect());
    }

    /// Make direct messages to `user_id` fail as if the member blocked them
    pub async fn block_direct_messages(&self, user_id: UserId) {
        self.state.lock().await.blocked_dms.insert(user_id);
    }

    /// Make every role delta fail
    pub async fn fail_role_updates(&self, fail: bool) {
        self.state.lock().await.fail_role_updates = fail;
    }

    /// Current grants of a member, sorted
    pub async fn roles_of(&self, user_id: UserId) -> Option<Vec<RoleId>> {
        let state = self.state.lock().await;
        state
            .members
            .get(&user_id)
            .map(|roles| roles.iter().copied().collect())
    }

    /// Direct messages delivered so far
    pub async fn direct_messages(&self) -> Vec<(UserId, String)> {
        self.state.lock().await.direct_messages.clone()
    }

    /// Number of non-empty deltas applied
    pub async fn deltas_applied(&self) -> usize {
        self.state.lock().await.deltas_applied
    }
}

#[async_trait]
impl Membership for InMemoryMembership {
    async fn member_roles(&self, user_id: UserId) -> Result<Option<Vec<RoleId>>, MembershipError> {
        Ok(self.roles_of(user_id).await)
    }

    async fn apply_role_delta(
        &self,
        user_id: UserId,
        delta: &RoleDelta,
    ) -> Result<(), MembershipError> {
        let mut state = self.state.lock().await;

        if state.fail_role_updates {
            return Err(MembershipError::Api(503, "role update rejected".to_string()));
        }

        let roles = state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| MembershipError::Api(404, format!("unknown member {}", user_id)))?;

        roles.extend(delta.add.iter().copied());
        for role in &delta.remove {
            roles.remove(role);
        }

        if !delta.is_empty() {
            state.deltas_applied += 1;
        }
        Ok(())
    }

    async fn send_direct_message(
        &self,
        user_id: UserId,
        content: &str,
    ) -> Result<(), MembershipError> {
        let mut state = self.state.lock().await;

        if state.blocked_dms.contains(&user_id) {
            return Err(MembershipError::Forbidden(
                "cannot send messages to this user".to_string(),
            ));
        }
        if !state.members.contains_key(&user_id) {
            return Err(MembershipError::Api(404, format!("unknown member {}", user_id)));
        }

        state.direct_messages.push((user_id, content.to_string()));
        Ok(())
    }
}
