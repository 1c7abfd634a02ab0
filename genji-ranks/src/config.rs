//! Service configuration
//!
//! Read from `genji.toml` in the root folder. The bot token never lives in the
//! file; it comes from `GENJI_DISCORD_TOKEN`.

use genji_common::config::{load_toml_or_default, LoggingConfig, CONFIG_FILE_NAME};
use genji_common::{Error, RankTable, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::membership::DISCORD_API_URL;
use crate::ranks::RoleLadders;

/// Environment variable holding the bot token
pub const DISCORD_TOKEN_ENV: &str = "GENJI_DISCORD_TOKEN";

pub const DEFAULT_PORT: u16 = 5810;

/// Database file name used when `database_path` is not set
pub const DEFAULT_DATABASE_FILE: &str = "genji.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    /// Relative paths resolve against the root folder
    pub database_path: Option<PathBuf>,
    pub guild_id: u64,
    /// Newsfeed bus capacity
    pub event_capacity: usize,
    pub discord: DiscordConfig,
    /// Overrides the built-in bucket table
    pub rank_table: Option<RankTable>,
    pub ladders: Option<RoleLadders>,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database_path: None,
            guild_id: 0,
            event_capacity: 256,
            discord: DiscordConfig::default(),
            rank_table: None,
            ladders: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub api_base: String,
    pub requests_per_second: u32,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: DISCORD_API_URL.to_string(),
            requests_per_second: 20,
        }
    }
}

impl ServiceConfig {
    /// Load `genji.toml` from the root folder (defaults when absent)
    pub fn load(root_folder: &Path) -> Result<Self> {
        load_toml_or_default(&root_folder.join(CONFIG_FILE_NAME))
    }

    pub fn rank_table(&self) -> RankTable {
        self.rank_table.clone().unwrap_or_default()
    }

    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        match &self.database_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root_folder.join(path),
            None => root_folder.join(DEFAULT_DATABASE_FILE),
        }
    }

    /// Role ladders, checked against the bucket table
    pub fn ladders(&self) -> Result<RoleLadders> {
        let ladders = self
            .ladders
            .clone()
            .ok_or_else(|| Error::Config("no role ladders configured".to_string()))?;
        ladders.validate(&self.rank_table())?;
        Ok(ladders)
    }

    /// Settings only needed when talking to Discord
    pub fn validate_discord(&self) -> Result<()> {
        if self.guild_id == 0 {
            return Err(Error::Config("guild_id is not set".to_string()));
        }
        if self.discord.requests_per_second == 0 {
            return Err(Error::Config(
                "discord.requests_per_second must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
