//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GENJI_ROOT_FOLDER";

/// Name of the bootstrap file inside the root folder
pub const CONFIG_FILE_NAME: &str = "genji.toml";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `GENJI_ROOT_FOLDER` environment variable
/// 3. `root_folder` key of the user bootstrap file (`<config dir>/genji/genji.toml`)
/// 4. OS-dependent default
///
/// The root folder holds `genji.toml` and, unless overridden there, the
/// database file.
pub fn resolve_root_folder(cli_arg: Option<&Path>) -> PathBuf {
    resolve_root_folder_with(cli_arg, bootstrap_file().as_deref())
}

/// Same as [`resolve_root_folder`] with an explicit bootstrap file location
pub fn resolve_root_folder_with(cli_arg: Option<&Path>, bootstrap: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = bootstrap.and_then(root_folder_from_toml) {
        return path;
    }

    default_root_folder()
}

/// User-level bootstrap file, if the platform has a config directory
pub fn bootstrap_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("genji").join(CONFIG_FILE_NAME))
}

/// `root_folder` key of a bootstrap file; unreadable files are ignored
fn root_folder_from_toml(path: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(path).ok()?;
    let value = toml::from_str::<toml::Value>(&content).ok()?;
    value
        .get("root_folder")
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("genji"))
        .unwrap_or_else(|| PathBuf::from("./genji_data"))
}

/// Load a TOML bootstrap file, falling back to defaults when it is missing
///
/// A missing file is not fatal (logged, defaults used). A file that exists but
/// fails to parse is an error.
pub fn load_toml_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

/// Read a required secret from the environment
pub fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("environment variable {} is not set", name))),
    }
}
