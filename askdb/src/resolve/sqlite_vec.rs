//! SQLite reference tables with nearest-neighbour lookup via sqlite-vec.
//!
//! Each reference set lives in its own table `ref_<name>(key, label, embedding)`
//! with embeddings stored as JSON vectors; `reference_tables` lists the sets.
//! Lookup runs `vec_distance_cosine` per table and keeps the closest row.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use rusqlite::params;

use crate::resolve::{
    closer, Embedder, EntityResolver, ReferenceEntry, ResolveError, ResolvedEntity,
};

static SQLITE_VEC_INIT: Once = Once::new();

/// Plain SQL identifier: letter or underscore first, then letters, digits, underscores.
fn valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Formats a Vec<f32> as JSON for sqlite-vec (e.g. "[0.1,0.2,0.3]").
fn vector_to_json(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn storage(e: impl std::fmt::Display) -> ResolveError {
    ResolveError::Storage(e.to_string())
}

/// SQLite-backed resolver. Opens one connection per call inside spawn_blocking.
pub struct SqliteVecResolver {
    db_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    max_distance: Option<f32>,
}

impl SqliteVecResolver {
    /// Registers the sqlite-vec extension and creates the catalogue table if needed.
    pub fn new(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, ResolveError> {
        SQLITE_VEC_INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        });

        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reference_tables (name TEXT PRIMARY KEY)",
            [],
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            embedder,
            max_distance: None,
        })
    }

    /// Nearest entries farther than `max` count as unresolved.
    pub fn with_max_distance(mut self, max: f32) -> Self {
        self.max_distance = Some(max);
        self
    }

    /// Embeds `entries` and replaces the content of reference set `table`.
    /// Entries with a blank label are skipped. Returns the number stored.
    pub async fn put_table(
        &self,
        table: &str,
        entries: Vec<ReferenceEntry>,
    ) -> Result<usize, ResolveError> {
        if !valid_table_name(table) {
            return Err(ResolveError::InvalidTable(table.to_string()));
        }
        let entries: Vec<ReferenceEntry> = entries
            .into_iter()
            .filter(|e| !e.label.trim().is_empty())
            .collect();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        let vectors = self.embedder.embed(&labels).await?;
        if vectors.len() != entries.len() {
            return Err(ResolveError::Embedding(format!(
                "expected {} embeddings, got {}",
                entries.len(),
                vectors.len()
            )));
        }
        let rows: Vec<(ReferenceEntry, String)> = entries
            .into_iter()
            .zip(vectors.iter().map(|v| vector_to_json(v)))
            .collect();
        let db_path = self.db_path.clone();
        let table = table.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let tx = conn.transaction().map_err(storage)?;
            tx.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS ref_{} (
                        key TEXT PRIMARY KEY,
                        label TEXT NOT NULL,
                        embedding TEXT NOT NULL
                    )",
                    table
                ),
                [],
            )
            .map_err(storage)?;
            tx.execute(&format!("DELETE FROM ref_{}", table), [])
                .map_err(storage)?;
            {
                let mut insert = tx
                    .prepare(&format!(
                        "INSERT OR REPLACE INTO ref_{} (key, label, embedding) VALUES (?1, ?2, ?3)",
                        table
                    ))
                    .map_err(storage)?;
                for (entry, vec_json) in &rows {
                    insert
                        .execute(params![entry.key, entry.label, vec_json])
                        .map_err(storage)?;
                }
            }
            tx.execute(
                "INSERT OR IGNORE INTO reference_tables (name) VALUES (?1)",
                params![table],
            )
            .map_err(storage)?;
            tx.commit().map_err(storage)?;
            Ok::<usize, ResolveError>(rows.len())
        })
        .await
        .map_err(storage)?
    }

    /// Names of the stored reference sets, sorted.
    pub async fn tables(&self) -> Result<Vec<String>, ResolveError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            list_tables(&conn)
        })
        .await
        .map_err(storage)?
    }
}

fn list_tables(conn: &rusqlite::Connection) -> Result<Vec<String>, ResolveError> {
    let mut stmt = conn
        .prepare("SELECT name FROM reference_tables ORDER BY name")
        .map_err(storage)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(storage)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage)?;
    Ok(names
        .into_iter()
        .filter(|n| valid_table_name(n))
        .collect())
}

#[async_trait]
impl EntityResolver for SqliteVecResolver {
    async fn resolve(
        &self,
        phrases: &[String],
    ) -> Result<BTreeMap<String, ResolvedEntity>, ResolveError> {
        if phrases.is_empty() {
            return Ok(BTreeMap::new());
        }
        let texts: Vec<&str> = phrases.iter().map(String::as_str).collect();
        let queries: Vec<(String, String)> = phrases
            .iter()
            .cloned()
            .zip(self.embedder.embed(&texts).await?.iter().map(|v| vector_to_json(v)))
            .collect();
        let db_path = self.db_path.clone();
        let max_distance = self.max_distance;

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let tables = list_tables(&conn)?;
            let mut out = BTreeMap::new();
            for (phrase, query) in queries {
                let mut best: Option<ResolvedEntity> = None;
                for table in &tables {
                    let sql = format!(
                        "SELECT key, label, vec_distance_cosine(embedding, ?1) AS distance
                         FROM ref_{} ORDER BY distance, key LIMIT 1",
                        table
                    );
                    let row = conn
                        .query_row(&sql, params![query], |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, f64>(2)?,
                            ))
                        })
                        .map(Some)
                        .or_else(|e| match e {
                            rusqlite::Error::QueryReturnedNoRows => Ok(None),
                            other => Err(other),
                        })
                        .map_err(storage)?;
                    if let Some((key, label, distance)) = row {
                        best = Some(closer(
                            best,
                            ResolvedEntity {
                                table: table.clone(),
                                key,
                                label,
                                distance: distance as f32,
                            },
                        ));
                    }
                }
                if let Some(found) = best {
                    if max_distance.map_or(true, |max| found.distance <= max) {
                        out.insert(phrase, found);
                    }
                }
            }
            Ok::<_, ResolveError>(out)
        })
        .await
        .map_err(storage)?
    }
}
