//! Read `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table and the `[agent]` table.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{AgentSection, LoadError};

/// `$XDG_CONFIG_HOME` wins over the platform default so tests and sandboxes can redirect it.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir().ok_or_else(|| LoadError::XdgPath("no config directory".to_string()))
}

pub(crate) fn config_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let path = config_home()?.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

#[derive(serde::Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub agent: AgentSection,
}

/// Parses the whole file. Missing file yields an empty `ConfigFile`.
pub(crate) fn load(app_name: &str) -> Result<ConfigFile, LoadError> {
    let path = match config_path(app_name)? {
        Some(p) => p,
        None => return Ok(ConfigFile::default()),
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    Ok(toml::from_str(&content)?)
}
