use serde::{Deserialize, Serialize};

/// Vector produced by an [`Embedder`](crate::Embedder).
pub type Embedding = Vec<f32>;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OutfitEntry {
    pub id: String,
    pub description: String,
}

impl OutfitEntry {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone, Serialize, Debug)]
pub struct ScoredMatch {
    pub entry: OutfitEntry,
    /// Full-precision cosine similarity; ordering is always decided on this.
    pub score: f32,
}

impl ScoredMatch {
    pub fn id(&self) -> &str {
        &self.entry.id
    }

    /// Score rounded to two decimals for display.
    pub fn rounded_score(&self) -> f32 {
        crate::metrics::round_score(self.score)
    }
}

/// Outcome of one upload: the generated description and its ranked matches.
#[derive(Clone, Serialize, Debug)]
pub struct Analysis {
    pub description: String,
    pub matches: Vec<ScoredMatch>,
}
