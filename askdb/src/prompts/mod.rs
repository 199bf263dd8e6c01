//! Prompt templates for the dialogue stages, loaded from YAML.
//!
//! Default text lives in `askdb/prompts/askdb.yaml` and is embedded at compile
//! time. A directory given explicitly or via `ASKDB_PROMPTS_DIR` may hold an
//! `askdb.yaml` overriding any subset of keys. See [`load`],
//! [`load_or_default`] and [`Prompts::render`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

const EMBEDDED: &str = include_str!("../../prompts/askdb.yaml");

const PROMPTS_FILE: &str = "askdb.yaml";

/// Env var naming the prompts override directory.
pub const PROMPTS_DIR_ENV: &str = "ASKDB_PROMPTS_DIR";

/// Error when loading prompts from a directory (missing dir, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

/// On-disk shape; every key is optional so override files can be partial.
#[derive(Debug, Default, Deserialize)]
struct PromptsFile {
    intent: Option<String>,
    relevance: Option<String>,
    small_talk: Option<String>,
    validate: Option<String>,
    extract_filters: Option<String>,
    generate_sql: Option<String>,
    comment: Option<String>,
    greeting_fallback: Option<String>,
    out_of_domain: Option<String>,
    validation_failed: Option<String>,
    cancelled: Option<String>,
    generation_failed: Option<String>,
    comment_unavailable: Option<String>,
    restricted_note: Option<String>,
    unrestricted_note: Option<String>,
}

/// Resolved prompt set used by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompts {
    pub intent: String,
    pub relevance: String,
    pub small_talk: String,
    pub validate: String,
    pub extract_filters: String,
    pub generate_sql: String,
    pub comment: String,
    /// Fixed reply when small talk generation fails.
    pub greeting_fallback: String,
    pub out_of_domain: String,
    pub validation_failed: String,
    pub cancelled: String,
    /// Explanation used when no SQL could be drafted.
    pub generation_failed: String,
    /// Explanation used when the comment stage fails.
    pub comment_unavailable: String,
    /// Fills `{restriction}` in the comment template when a rule was applied.
    pub restricted_note: String,
    pub unrestricted_note: String,
}

impl Prompts {
    fn merge(mut self, file: PromptsFile) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if let Some(v) = file.$field { self.$field = v; } )*
            };
        }
        take!(
            intent,
            relevance,
            small_talk,
            validate,
            extract_filters,
            generate_sql,
            comment,
            greeting_fallback,
            out_of_domain,
            validation_failed,
            cancelled,
            generation_failed,
            comment_unavailable,
            restricted_note,
            unrestricted_note
        );
        self
    }

    /// Replaces each `{name}` in `template` with its value in one pass over
    /// the template. Substituted values are never rescanned. Unknown
    /// placeholders are left as written.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open + 1..];
            let value = tail.find('}').and_then(|close| {
                let name = &tail[..close];
                vars.iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| (*v, close))
            });
            match value {
                Some((v, close)) => {
                    out.push_str(v);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        out.trim_end().to_string()
    }
}

fn prompts_dir(dir: Option<&Path>) -> Option<PathBuf> {
    dir.map(PathBuf::from)
        .or_else(|| std::env::var(PROMPTS_DIR_ENV).ok().map(PathBuf::from))
}

fn read_yaml_file(dir: &Path) -> Result<Option<PromptsFile>, LoadError> {
    let path = dir.join(PROMPTS_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| LoadError::ParseYaml {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Prompts parsed from the embedded YAML.
pub fn default_from_embedded() -> Prompts {
    let file: PromptsFile = serde_yaml::from_str(EMBEDDED).unwrap_or_default();
    Prompts::default().merge(file)
}

/// Loads overrides from `dir` (or `ASKDB_PROMPTS_DIR`) on top of the embedded
/// defaults. With neither set, returns the defaults. A missing `askdb.yaml`
/// inside an existing directory keeps the defaults.
pub fn load(dir: Option<&Path>) -> Result<Prompts, LoadError> {
    let defaults = default_from_embedded();
    let Some(base) = prompts_dir(dir) else {
        return Ok(defaults);
    };
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }
    Ok(match read_yaml_file(&base)? {
        Some(file) => defaults.merge(file),
        None => defaults,
    })
}

/// Like [`load`], falling back to the embedded defaults on any error.
pub fn load_or_default(dir: Option<&Path>) -> Prompts {
    load(dir).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "prompt overrides ignored");
        default_from_embedded()
    })
}
