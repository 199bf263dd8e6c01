//! Embedder trait: text to fixed-size vectors for reference lookups.

use async_trait::async_trait;

use crate::resolve::ResolveError;

/// Produces fixed-size float vectors from text.
///
/// Implementations must be `Send + Sync`; reference indexes share one embedder
/// across concurrent turns.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text into a vector of dimension [`Embedder::dimension`].
    /// Returns one vector per input text in the same order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ResolveError>;

    /// Vector dimension returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;
}
