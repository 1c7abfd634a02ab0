//! Database models

use serde::{Deserialize, Serialize};

/// Community member id (Discord snowflake, stored as INTEGER)
pub type UserId = i64;

/// External role id (Discord snowflake)
pub type RoleId = u64;

/// Player row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub user_id: UserId,
    pub nickname: String,
    /// Cached tier from the last reconciliation
    pub rank: i64,
    /// Cached plus sub-tier from the last reconciliation
    pub rank_plus: i64,
    /// Whether the player accepts direct notifications
    pub alertable: bool,
}

/// Map row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Map {
    pub map_code: String,
    pub map_name: String,
    pub checkpoints: i64,
    pub description: Option<String>,
    pub official: bool,
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

/// Per-map medal time cutoffs; any of them may be unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MedalThresholds {
    pub gold: Option<f64>,
    pub silver: Option<f64>,
    pub bronze: Option<f64>,
}

impl MedalThresholds {
    /// True when at least one cutoff is set
    pub fn is_set(&self) -> bool {
        self.gold.is_some() || self.silver.is_some() || self.bronze.is_some()
    }

    /// Classify a completion time, testing gold, then silver, then bronze
    ///
    /// At most one medal is awarded. An unset cutoff never matches.
    pub fn classify(&self, time: f64) -> Option<Medal> {
        let within = |cutoff: Option<f64>| cutoff.is_some_and(|c| time <= c);

        if within(self.gold) {
            Some(Medal::Gold)
        } else if within(self.silver) {
            Some(Medal::Silver)
        } else if within(self.bronze) {
            Some(Medal::Bronze)
        } else {
            None
        }
    }
}
