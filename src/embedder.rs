use crate::error::Result;
use crate::types::Embedding;

/// Text -> fixed-length vector. Implementations are loaded once and shared
/// read-only across requests.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Output dimension, when known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }
}
