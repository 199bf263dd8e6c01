//! `[env]` table of `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(dirs::config_dir)
}

/// Path of the app's `config.toml` if it exists.
///
/// `XDG_CONFIG_HOME` is honoured when set to an absolute path; otherwise the
/// platform config directory is used.
pub fn config_file_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let home = config_home().ok_or_else(|| LoadError::XdgPath(app_name.to_string()))?;
    let path = home.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, toml::Value>,
}

fn scalar(value: toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads the `[env]` table; numbers and booleans are stringified, nested
/// tables and arrays are ignored.
pub fn load_env_map(path: &Path) -> Result<HashMap<String, String>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::XdgRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&content).map_err(|source| LoadError::XdgParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file
        .env
        .into_iter()
        .filter_map(|(k, v)| scalar(v).map(|v| (k, v)))
        .collect())
}
