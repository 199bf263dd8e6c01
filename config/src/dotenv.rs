//! `.env` reader: `KEY=VALUE` lines into a map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn dotenv_file(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match override_dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Parses one line. Blank lines, `#` comments and lines without `=` yield `None`.
///
/// An optional leading `export ` is dropped. Values wrapped in double quotes
/// unescape `\"` and `\n`; single-quoted values are taken literally; unquoted
/// values lose a trailing ` # comment`.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, raw) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw = raw.trim();
    let value = if let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
    {
        inner.replace("\\n", "\n").replace("\\\"", "\"")
    } else if let Some(inner) = raw
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
    {
        inner.to_string()
    } else {
        match raw.find(" #") {
            Some(pos) => raw[..pos].trim_end().to_string(),
            None => raw.to_string(),
        }
    };
    Some((key.to_string(), value))
}

fn parse(content: &str) -> HashMap<String, String> {
    content.lines().filter_map(parse_line).collect()
}

/// Reads `.env` from `override_dir` or the current directory. A missing file is an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    match dotenv_file(override_dir) {
        Some(path) => Ok(parse(&std::fs::read_to_string(path)?)),
        None => Ok(HashMap::new()),
    }
}
