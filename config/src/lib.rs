//! Environment bootstrap for askdb binaries.
//!
//! Values come from three layers; for each key the first layer that has it wins:
//! 1. the process environment
//! 2. a project `.env` file (current directory or an override directory)
//! 3. the `[env]` table of `$XDG_CONFIG_HOME/<app>/config.toml`
//!
//! [`load_and_apply`] exports the winners of layers 2 and 3 into the process
//! environment so the rest of the program only reads env vars.

mod dotenv;
mod xdg_toml;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use xdg_toml::config_file_path;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot determine config directory for {0}")]
    XdgPath(String),
    #[error("read {path}: {source}")]
    XdgRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    XdgParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("read .env: {0}")]
    DotenvRead(#[source] std::io::Error),
}

/// Where an exported value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Dotenv,
    Xdg,
}

/// Keys exported by [`load_and_apply`], with their source. Keys already in the
/// process environment are not listed.
pub type Applied = BTreeMap<String, Source>;

/// Picks, for every key not present in `present`, the `.env` value or else the
/// XDG value.
pub fn merge_layers(
    present: impl Fn(&str) -> bool,
    dotenv: &HashMap<String, String>,
    xdg: &HashMap<String, String>,
) -> BTreeMap<String, (String, Source)> {
    let mut out = BTreeMap::new();
    for (key, value) in xdg {
        if !present(key) {
            out.insert(key.clone(), (value.clone(), Source::Xdg));
        }
    }
    for (key, value) in dotenv {
        if !present(key) {
            out.insert(key.clone(), (value.clone(), Source::Dotenv));
        }
    }
    out
}

/// Loads `.env` (from `override_dir`, else the current directory) and the XDG
/// `config.toml` for `app_name`, and sets every key missing from the process
/// environment. Missing files are not errors.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Applied, LoadError> {
    let xdg = match config_file_path(app_name)? {
        Some(path) => xdg_toml::load_env_map(&path)?,
        None => HashMap::new(),
    };
    let dotenv = dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)?;

    let merged = merge_layers(|k| std::env::var_os(k).is_some(), &dotenv, &xdg);
    let mut applied = Applied::new();
    for (key, (value, source)) in merged {
        std::env::set_var(&key, value);
        applied.insert(key, source);
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn dotenv_beats_xdg_and_env_beats_both() {
        let dotenv = map(&[("MODEL", "from_dotenv"), ("ONLY_DOTENV", "d")]);
        let xdg = map(&[("MODEL", "from_xdg"), ("ONLY_XDG", "x"), ("SET", "x")]);
        let merged = merge_layers(|k| k == "SET", &dotenv, &xdg);

        assert_eq!(merged["MODEL"], ("from_dotenv".to_string(), Source::Dotenv));
        assert_eq!(merged["ONLY_XDG"], ("x".to_string(), Source::Xdg));
        assert_eq!(merged["ONLY_DOTENV"].1, Source::Dotenv);
        assert!(!merged.contains_key("SET"));
    }

    #[test]
    fn existing_env_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "ASKDB_CONFIG_TEST_EXISTING=from_dotenv\nASKDB_CONFIG_TEST_NEW=new\n",
        )
        .unwrap();
        std::env::set_var("ASKDB_CONFIG_TEST_EXISTING", "from_env");
        std::env::remove_var("ASKDB_CONFIG_TEST_NEW");

        let applied =
            load_and_apply("askdb-config-test-no-such-app", Some(dir.path())).unwrap();

        assert_eq!(
            std::env::var("ASKDB_CONFIG_TEST_EXISTING").as_deref(),
            Ok("from_env")
        );
        assert_eq!(std::env::var("ASKDB_CONFIG_TEST_NEW").as_deref(), Ok("new"));
        assert_eq!(applied.get("ASKDB_CONFIG_TEST_NEW"), Some(&Source::Dotenv));
        assert!(!applied.contains_key("ASKDB_CONFIG_TEST_EXISTING"));
        std::env::remove_var("ASKDB_CONFIG_TEST_EXISTING");
        std::env::remove_var("ASKDB_CONFIG_TEST_NEW");
    }

    #[test]
    fn nothing_to_load_is_ok() {
        let empty = tempfile::tempdir().unwrap();
        let applied = load_and_apply("askdb-config-test-no-such-app", Some(empty.path())).unwrap();
        assert!(applied.is_empty());
    }
}
