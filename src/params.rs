use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Params {
    /// Matches shown per upload.
    pub top_k: usize,
    /// Embed the catalog once when the ranker is built instead of on every query.
    pub cache_catalog_embeddings: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            top_k: 3,
            cache_catalog_embeddings: false,
        }
    }
}
