//! Tier role ladders
//!
//! Two zero-indexed ladders map a rank (and a plus sub-tier) to role grants.
//! Index 0 is the automatic entry tier and is never granted or revoked here.

use genji_common::events::RoleRef;
use genji_common::models::RoleId;
use genji_common::{Error, RankTable, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::calculator::RankPair;
use crate::membership::RoleDelta;

/// One rung of a ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderRole {
    pub id: RoleId,
    pub name: String,
}

impl From<&LadderRole> for RoleRef {
    fn from(role: &LadderRole) -> Self {
        RoleRef {
            id: role.id,
            name: role.name.clone(),
        }
    }
}

/// Ordered roles, one per bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleLadder {
    roles: Vec<LadderRole>,
}

impl RoleLadder {
    pub fn new(roles: Vec<LadderRole>) -> Self {
        Self { roles }
    }

    /// Managed roles granted at `level` (indices 1..=level)
    fn granted(&self, level: u32) -> &[LadderRole] {
        let end = (level as usize + 1).min(self.roles.len());
        self.roles.get(1..end).unwrap_or(&[])
    }

    /// Managed roles above `level`
    fn above(&self, level: u32) -> &[LadderRole] {
        self.roles.get(level as usize + 1..).unwrap_or(&[])
    }

    fn managed(&self) -> &[LadderRole] {
        self.roles.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Plain and plus ladders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLadders {
    pub ranks: RoleLadder,
    pub ranks_plus: RoleLadder,
}

impl RoleLadders {
    /// Check both ladders against the bucket table
    ///
    /// Each ladder needs one entry per bucket. Managed ids must be non-zero and
    /// unique across both ladders.
    pub fn validate(&self, table: &RankTable) -> Result<()> {
        let expected = table.buckets().len();
        for (label, ladder) in [("ranks", &self.ranks), ("ranks_plus", &self.ranks_plus)] {
            if ladder.len() != expected {
                return Err(Error::Config(format!(
                    "{} ladder has {} roles, expected {}",
                    label,
                    ladder.len(),
                    expected
                )));
            }
        }

        let mut seen = HashSet::new();
        for role in self.ranks.managed().iter().chain(self.ranks_plus.managed()) {
            if role.id == 0 {
                return Err(Error::Config(format!("role '{}' has no id", role.name)));
            }
            if !seen.insert(role.id) {
                return Err(Error::Config(format!(
                    "role id {} appears more than once",
                    role.id
                )));
            }
        }
        Ok(())
    }

    /// Compute the grants to add and revoke for `pair` given the held roles
    pub fn plan(&self, held: &[RoleId], pair: RankPair) -> RolePlan {
        let held: HashSet<RoleId> = held.iter().copied().collect();
        let is_held = |role: &&LadderRole| held.contains(&role.id);
        let is_missing = |role: &&LadderRole| !held.contains(&role.id);

        let added = self
            .ranks
            .granted(pair.rank)
            .iter()
            .chain(self.ranks_plus.granted(pair.rank_plus))
            .filter(is_missing)
            .cloned()
            .collect();

        let removed = self
            .ranks
            .above(pair.rank)
            .iter()
            .chain(self.ranks_plus.above(pair.rank_plus))
            .filter(is_held)
            .cloned()
            .collect();

        RolePlan { added, removed }
    }
}

/// Grants to add and revoke for one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolePlan {
    pub added: Vec<LadderRole>,
    pub removed: Vec<LadderRole>,
}

impl RolePlan {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn delta(&self) -> RoleDelta {
        RoleDelta {
            add: self.added.iter().map(|r| r.id).collect(),
            remove: self.removed.iter().map(|r| r.id).collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::ladders;
    use super::*;

    fn ids(roles: &[LadderRole]) -> Vec<RoleId> {
        roles.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_fresh_player_gets_prefix() {
        let plan = ladders().plan(&[], RankPair::new(2, 1));
        assert_eq!(ids(&plan.added), vec![1001, 1002, 2001]);
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn test_entry_tier_never_managed() {
        let plan = ladders().plan(&[1000, 2000], RankPair::new(0, 0));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_demotion_removes_only_roles_above_level() {
        let held = [1001, 1002, 1003, 2001, 2002, 555];
        let plan = ladders().plan(&held, RankPair::new(2, 1));
        assert!(plan.added.is_empty());
        assert_eq!(ids(&plan.removed), vec![1003, 2002]);
    }

    #[test]
    fn test_already_correct_is_empty() {
        let plan = ladders().plan(&[1001, 1002, 2001, 42], RankPair::new(2, 1));
        assert!(plan.is_empty());
        assert!(plan.delta().is_empty());
    }

    #[test]
    fn test_full_rank() {
        let plan = ladders().plan(&[], RankPair::new(6, 6));
        assert_eq!(plan.added.len(), 12);
        assert_eq!(plan.delta().add.len(), 12);
    }

    #[test]
    fn test_validate_rejects_short_ladder() {
        let mut ladders = ladders();
        ladders.ranks = RoleLadder::new(vec![]);
        assert!(ladders.validate(&RankTable::default()).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut ladders = ladders();
        ladders.ranks_plus = ladders.ranks.clone();
        assert!(ladders.validate(&RankTable::default()).is_err());
        assert!(super::fixtures::ladders()
            .validate(&RankTable::default())
            .is_ok());
    }

    #[test]
    fn test_validate_allows_unset_entry_tier() {
        let mut ladders = ladders();
        ladders.ranks.roles[0].id = 0;
        ladders.ranks_plus.roles[0].id = 0;
        assert!(ladders.validate(&RankTable::default()).is_ok());
    }
}
