//! In-memory reference index: entries embedded once on insert, phrases matched
//! by cosine distance in Rust.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::resolve::{
    closer, cosine_distance, Embedder, EntityResolver, ReferenceEntry, ResolveError,
    ResolvedEntity,
};

struct IndexedEntry {
    entry: ReferenceEntry,
    vector: Vec<f32>,
}

/// Reference tables held in memory. Suitable for tests and small catalogues.
pub struct InMemoryReferenceIndex {
    embedder: Arc<dyn Embedder>,
    tables: DashMap<String, Vec<IndexedEntry>>,
    max_distance: Option<f32>,
}

impl InMemoryReferenceIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            tables: DashMap::new(),
            max_distance: None,
        }
    }

    /// Nearest entries farther than `max` count as unresolved.
    pub fn with_max_distance(mut self, max: f32) -> Self {
        self.max_distance = Some(max);
        self
    }

    /// Embeds and stores `entries` under `table`, replacing any previous content.
    /// Entries with a blank label are skipped.
    pub async fn put_table(
        &self,
        table: impl Into<String>,
        entries: Vec<ReferenceEntry>,
    ) -> Result<usize, ResolveError> {
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
        let indexed: Vec<IndexedEntry> = entries
            .into_iter()
            .zip(vectors)
            .map(|(entry, vector)| IndexedEntry { entry, vector })
            .collect();
        let count = indexed.len();
        self.tables.insert(table.into(), indexed);
        Ok(count)
    }
}

#[async_trait]
impl EntityResolver for InMemoryReferenceIndex {
    async fn resolve(
        &self,
        phrases: &[String],
    ) -> Result<BTreeMap<String, ResolvedEntity>, ResolveError> {
        let mut out = BTreeMap::new();
        if phrases.is_empty() {
            return Ok(out);
        }
        let texts: Vec<&str> = phrases.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed(&texts).await?;

        for (phrase, query) in phrases.iter().zip(vectors.iter()) {
            let mut best: Option<ResolvedEntity> = None;
            for table in self.tables.iter() {
                for indexed in table.value() {
                    let candidate = ResolvedEntity {
                        table: table.key().clone(),
                        key: indexed.entry.key.clone(),
                        label: indexed.entry.label.clone(),
                        distance: cosine_distance(query, &indexed.vector),
                    };
                    best = Some(closer(best, candidate));
                }
            }
            if let Some(found) = best {
                if self.max_distance.map_or(true, |max| found.distance <= max) {
                    out.insert(phrase.clone(), found);
                }
            }
        }
        Ok(out)
    }
}
