//! Entity resolution: map free-text filter phrases to canonical keys of
//! reference tables by nearest embedding.
//!
//! The dialogue treats [`EntityResolver`] as an external collaborator. Two
//! implementations ship with the crate: [`InMemoryReferenceIndex`] and
//! [`SqliteVecResolver`] (sqlite-vec `vec_distance_cosine`).

mod embedder;
mod in_memory;
mod openai_embedder;
mod sqlite_vec;

pub use embedder::Embedder;
pub use in_memory::InMemoryReferenceIndex;
pub use openai_embedder::OpenAIEmbedder;
pub use sqlite_vec::SqliteVecResolver;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error from entity resolution or embedding.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("embedding: {0}")]
    Embedding(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("invalid reference table name: {0}")]
    InvalidTable(String),
}

/// One row of a reference table (e.g. a division code and its name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub key: String,
    pub label: String,
}

impl ReferenceEntry {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Nearest reference entry for one phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub table: String,
    pub key: String,
    pub label: String,
    /// Cosine distance (0 = identical direction).
    pub distance: f32,
}

/// Maps phrases to their nearest reference entries.
///
/// Unresolved phrases are absent from the result. An empty input returns an
/// empty map without touching the embedder.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn resolve(
        &self,
        phrases: &[String],
    ) -> Result<BTreeMap<String, ResolvedEntity>, ResolveError>;
}

/// Resolver that never finds anything; used when no reference data is configured.
pub struct NoReferences;

#[async_trait]
impl EntityResolver for NoReferences {
    async fn resolve(
        &self,
        _phrases: &[String],
    ) -> Result<BTreeMap<String, ResolvedEntity>, ResolveError> {
        Ok(BTreeMap::new())
    }
}

/// Keeps the better of two candidates: smaller distance, then table name, then key.
pub(crate) fn closer(current: Option<ResolvedEntity>, candidate: ResolvedEntity) -> ResolvedEntity {
    match current {
        None => candidate,
        Some(cur) => {
            let ord = candidate
                .distance
                .total_cmp(&cur.distance)
                .then_with(|| candidate.table.cmp(&cur.table))
                .then_with(|| candidate.key.cmp(&cur.key));
            if ord.is_lt() {
                candidate
            } else {
                cur
            }
        }
    }
}

/// Cosine distance `1 - cos(a, b)`; zero vectors are maximally distant.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot / (norm_a * norm_b)
    }
}
