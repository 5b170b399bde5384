//! Load configuration from XDG `config.toml` and project `.env`.
//!
//! Two things come out of the config file:
//!
//! - `[env]`: applied to the process environment by [`load_and_apply`] with priority
//!   **existing env > .env > XDG**.
//! - `[agent]`: model settings, resolved by [`load_settings`] into [`AgentSettings`];
//!   environment variables (`DGUI_MODEL`, `DGUI_TEMPERATURE`, `DGUI_TOOL_CHOICE`,
//!   `OPENAI_BASE_URL`, `OPENAI_API_KEY`) override the file.

mod dotenv;
mod xdg_toml;

use std::path::Path;
use thiserror::Error;

/// Model used when neither the config file nor `DGUI_MODEL` names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// `[agent]` table as written in `config.toml`; every field optional.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AgentSection {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
    pub tool_choice: Option<String>,
}

/// Resolved model settings for the chat node's LLM client.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: Option<f32>,
    /// OpenAI-compatible base URL; `None` means the provider default.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Raw `auto` / `none` / `required`; parsed by the LLM layer.
    pub tool_choice: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            base_url: None,
            api_key: None,
            tool_choice: None,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AgentSettings {
    fn resolve(section: AgentSection) -> Result<Self, LoadError> {
        let temperature = match env_nonempty("DGUI_TEMPERATURE") {
            Some(raw) => Some(raw.trim().parse::<f32>().map_err(|_| LoadError::InvalidValue {
                key: "DGUI_TEMPERATURE".to_string(),
                value: raw.clone(),
            })?),
            None => section.temperature,
        };
        Ok(Self {
            model: env_nonempty("DGUI_MODEL")
                .or(section.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            base_url: env_nonempty("OPENAI_BASE_URL").or(section.base_url),
            api_key: env_nonempty("OPENAI_API_KEY"),
            tool_choice: env_nonempty("DGUI_TOOL_CHOICE").or(section.tool_choice),
        })
    }
}

/// Sets environment variables from project `.env` and XDG `[env]`, only for keys that are
/// **not** already set.
///
/// * `app_name`: e.g. `"dgui"`; XDG path is `~/.config/<app_name>/config.toml`.
/// * `override_dir`: look for `.env` here instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load(app_name)?.env;
    let dotenv_map = dotenv::load(override_dir).map_err(LoadError::DotenvRead)?;

    let keys: std::collections::HashSet<&String> =
        xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }
    Ok(())
}

/// Reads `[agent]` from the XDG config and applies env overrides.
///
/// Call after [`load_and_apply`] so `.env` values are visible as overrides.
pub fn load_settings(app_name: &str) -> Result<AgentSettings, LoadError> {
    AgentSettings::resolve(xdg_toml::load(app_name)?.agent)
}

/// Serializes tests that touch process-wide env vars.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn restore_var(key: &str, prev: Option<String>) {
        match prev {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }

    fn write_xdg(dir: &Path, app: &str, body: &str) {
        let app_dir = dir.join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), body).unwrap();
    }

    #[test]
    fn existing_env_wins() {
        let _g = env_lock();
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(dotenv_dir.path().join(".env"), "DGUI_TEST_EXISTING=from_dotenv\n").unwrap();
        env::set_var("DGUI_TEST_EXISTING", "from_env");
        load_and_apply("dgui-config-nonexistent-app", Some(dotenv_dir.path())).unwrap();
        assert_eq!(env::var("DGUI_TEST_EXISTING").as_deref(), Ok("from_env"));
        env::remove_var("DGUI_TEST_EXISTING");
    }

    #[test]
    fn dotenv_overrides_xdg() {
        let _g = env_lock();
        let xdg_dir = tempfile::tempdir().unwrap();
        write_xdg(xdg_dir.path(), "dgui", "[env]\nDGUI_TEST_PRIORITY = \"from_xdg\"\n");
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(dotenv_dir.path().join(".env"), "DGUI_TEST_PRIORITY=from_dotenv\n").unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("DGUI_TEST_PRIORITY");
        let result = load_and_apply("dgui", Some(dotenv_dir.path()));
        let val = env::var("DGUI_TEST_PRIORITY");
        env::remove_var("DGUI_TEST_PRIORITY");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert!(result.is_ok());
        assert_eq!(val.as_deref(), Ok("from_dotenv"));
    }

    #[test]
    fn xdg_env_applied_without_dotenv() {
        let _g = env_lock();
        let xdg_dir = tempfile::tempdir().unwrap();
        write_xdg(xdg_dir.path(), "dgui", "[env]\nDGUI_TEST_XDG_ONLY = \"from_xdg\"\n");
        let empty_dir = tempfile::tempdir().unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("DGUI_TEST_XDG_ONLY");
        let _ = load_and_apply("dgui", Some(empty_dir.path()));
        let val = env::var("DGUI_TEST_XDG_ONLY");
        env::remove_var("DGUI_TEST_XDG_ONLY");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert_eq!(val.as_deref(), Ok("from_xdg"));
    }

    #[test]
    fn settings_default_when_nothing_configured() {
        let _g = env_lock();
        let empty = tempfile::tempdir().unwrap();
        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        let prev_model = env::var("DGUI_MODEL").ok();
        let prev_temp = env::var("DGUI_TEMPERATURE").ok();
        env::set_var("XDG_CONFIG_HOME", empty.path());
        env::remove_var("DGUI_MODEL");
        env::remove_var("DGUI_TEMPERATURE");

        let settings = load_settings("dgui");

        restore_var("XDG_CONFIG_HOME", prev_xdg);
        restore_var("DGUI_MODEL", prev_model);
        restore_var("DGUI_TEMPERATURE", prev_temp);

        let settings = settings.unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.temperature, None);
    }

    #[test]
    fn settings_env_overrides_agent_table() {
        let _g = env_lock();
        let xdg_dir = tempfile::tempdir().unwrap();
        write_xdg(
            xdg_dir.path(),
            "dgui",
            "[agent]\nmodel = \"from-file\"\ntemperature = 0.5\ntool_choice = \"auto\"\n",
        );
        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        let prev_model = env::var("DGUI_MODEL").ok();
        let prev_temp = env::var("DGUI_TEMPERATURE").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::set_var("DGUI_MODEL", "from-env");
        env::remove_var("DGUI_TEMPERATURE");

        let settings = load_settings("dgui");

        restore_var("XDG_CONFIG_HOME", prev_xdg);
        restore_var("DGUI_MODEL", prev_model);
        restore_var("DGUI_TEMPERATURE", prev_temp);

        let settings = settings.unwrap();
        assert_eq!(settings.model, "from-env");
        assert_eq!(settings.temperature, Some(0.5));
        assert_eq!(settings.tool_choice.as_deref(), Some("auto"));
    }

    #[test]
    fn bad_temperature_is_rejected() {
        let _g = env_lock();
        let prev = env::var("DGUI_TEMPERATURE").ok();
        env::set_var("DGUI_TEMPERATURE", "warm");
        let result = AgentSettings::resolve(AgentSection::default());
        restore_var("DGUI_TEMPERATURE", prev);
        assert!(matches!(
            result,
            Err(LoadError::InvalidValue { ref key, .. }) if key == "DGUI_TEMPERATURE"
        ));
    }
}
