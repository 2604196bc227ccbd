use std::cmp::Reverse;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::embedder::Embedder;
use crate::error::{MatchError, Result};
use crate::metrics::cosine_similarity;
use crate::params::Params;
use crate::types::{Embedding, OutfitEntry, ScoredMatch};

/// Ranks `entries` against `query`, re-embedding every entry.
///
/// Returns at most `k` matches, highest score first. Equal scores keep the
/// order of `entries`. An empty catalog yields no matches without touching the
/// embedder.
pub fn rank(
    embedder: &dyn Embedder,
    query: &str,
    entries: &[OutfitEntry],
    k: usize,
) -> Result<Vec<ScoredMatch>> {
    rank_entries(embedder, query, entries, None, k)
}

/// Shared scoring path. `cached` holds one vector per entry, in entry order;
/// without it every description is embedded again.
fn rank_entries(
    embedder: &dyn Embedder,
    query: &str,
    entries: &[OutfitEntry],
    cached: Option<&[Embedding]>,
    k: usize,
) -> Result<Vec<ScoredMatch>> {
    validate(query, k)?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let query_vector = embedder.embed(query)?;
    ensure_finite(&query_vector, "query")?;

    let mut scored = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let fresh;
        let entry_vector = match cached {
            Some(vectors) => &vectors[i],
            None => {
                fresh = embedder.embed(&entry.description)?;
                &fresh
            }
        };
        scored.push(score_entry(&query_vector, entry_vector, entry)?);
    }
    Ok(top_k(scored, k))
}

fn validate(query: &str, k: usize) -> Result<()> {
    if k == 0 {
        return Err(MatchError::invalid("k must be at least 1"));
    }
    if query.trim().is_empty() {
        return Err(MatchError::invalid("query text is empty"));
    }
    Ok(())
}

fn ensure_finite(vector: &[f32], owner: &str) -> Result<()> {
    if vector.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(MatchError::Embedding(format!(
            "non-finite value in {owner} embedding"
        )))
    }
}

fn score_entry(query: &[f32], vector: &[f32], entry: &OutfitEntry) -> Result<ScoredMatch> {
    if query.len() != vector.len() {
        return Err(MatchError::Embedding(format!(
            "dimension mismatch: query has {}, {} has {}",
            query.len(),
            entry.id,
            vector.len()
        )));
    }
    ensure_finite(vector, &entry.id)?;
    let score = cosine_similarity(query, vector);
    // Finite inputs can still overflow the dot product.
    if !score.is_finite() {
        return Err(MatchError::Embedding(format!(
            "non-finite score for {}",
            entry.id
        )));
    }
    tracing::debug!(id = %entry.id, score, "scored entry");
    Ok(ScoredMatch {
        entry: entry.clone(),
        score,
    })
}

// `sort_by_key` is stable, so exact ties stay in catalog order.
fn top_k(mut scored: Vec<ScoredMatch>, k: usize) -> Vec<ScoredMatch> {
    scored.sort_by_key(|m| Reverse(OrderedFloat(m.score)));
    scored.truncate(k);
    scored
}

/// Embedder + catalog bundle used by the pipeline and the CLI.
pub struct Ranker {
    embedder: Arc<dyn Embedder>,
    catalog: Arc<Catalog>,
    params: Params,
    cached: Option<Vec<Embedding>>,
}

impl Ranker {
    pub fn new(embedder: Arc<dyn Embedder>, catalog: Arc<Catalog>, params: Params) -> Result<Self> {
        let cached = if params.cache_catalog_embeddings {
            let vectors = catalog
                .entries()
                .iter()
                .map(|e| embedder.embed(&e.description))
                .collect::<Result<Vec<_>>>()?;
            tracing::info!(entries = vectors.len(), "cached catalog embeddings");
            Some(vectors)
        } else {
            None
        };
        tracing::debug!(
            entries = catalog.len(),
            dimension = ?embedder.dimension(),
            top_k = params.top_k,
            "ranker ready"
        );
        Ok(Self {
            embedder,
            catalog,
            params,
            cached,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn params(&self) -> Params {
        self.params
    }

    /// Ranks with the configured `top_k`.
    pub fn rank(&self, query: &str) -> Result<Vec<ScoredMatch>> {
        self.rank_k(query, self.params.top_k)
    }

    pub fn rank_k(&self, query: &str, k: usize) -> Result<Vec<ScoredMatch>> {
        rank_entries(
            self.embedder.as_ref(),
            query,
            self.catalog.entries(),
            self.cached.as_deref(),
            k,
        )
    }

    /// Ranks several queries in parallel; results follow the input order.
    pub fn rank_batch(&self, queries: &[String], k: usize) -> Result<Vec<Vec<ScoredMatch>>> {
        queries.par_iter().map(|q| self.rank_k(q, k)).collect()
    }
}
