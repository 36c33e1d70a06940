//! Retrieval with optional Maximal Marginal Relevance re-ranking.
//!
//! MMR trades relevance to the query against similarity to already-selected
//! chunks, so near-duplicate passages (boilerplate repeated across pages)
//! stop dominating the result set.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::Chunk;
use crate::semantic::{EmbeddingProvider, inner_product};
use crate::store::VectorStore;

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Raw similarity between the query and the chunk embedding.
    pub relevance_score: f32,
    /// Marginal MMR score at selection time; equals `relevance_score` when
    /// MMR is not applied.
    pub rank_score: f32,
}

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub use_mmr: bool,
    /// Trade-off weight: 1.0 = pure relevance, 0.0 = pure diversity.
    pub mmr_lambda: f32,
    /// Candidates fetched before re-ranking; defaults to `max(4k, 20)`.
    pub fetch_k: Option<usize>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 8,
            use_mmr: true,
            mmr_lambda: 0.6,
            fetch_k: None,
        }
    }
}

/// Retrieve up to `top_k` chunks for `query` from `store`.
///
/// Output order is selection order: raw relevance order without MMR, greedy
/// marginal-score order with it.
pub fn retrieve(
    query: &str,
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    options: &RetrievalOptions,
) -> Result<Vec<RetrievedChunk>> {
    let query_embedding = provider.embed_one(query)?;
    let fetch_k = options
        .fetch_k
        .unwrap_or_else(|| (options.top_k * 4).max(20));
    let candidates = store.search(&query_embedding, fetch_k);

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    if !options.use_mmr || candidates.len() <= options.top_k {
        let results = candidates
            .into_iter()
            .take(options.top_k)
            .map(|(chunk, score)| RetrievedChunk {
                chunk,
                relevance_score: score,
                rank_score: score,
            })
            .collect::<Vec<RetrievedChunk>>();
        debug!(returned = results.len(), mmr = false, "retrieved chunks");
        return Ok(results);
    }

    let results = mmr_select(&candidates, provider, options)?;
    debug!(returned = results.len(), mmr = true, "retrieved chunks");
    Ok(results)
}

/// Greedy MMR over the candidate pool. The first pick is the most relevant
/// candidate; each later pick maximizes
/// `lambda * relevance - (1 - lambda) * max_similarity(candidate, selected)`.
/// Ties resolve to the first maximum in candidate order.
fn mmr_select(
    candidates: &[(Chunk, f32)],
    provider: &dyn EmbeddingProvider,
    options: &RetrievalOptions,
) -> Result<Vec<RetrievedChunk>> {
    let texts = candidates
        .iter()
        .map(|(chunk, _)| chunk.text.as_str())
        .collect::<Vec<&str>>();
    let embeddings = provider.embed(&texts)?;
    let lambda = options.mmr_lambda;

    let mut remaining = (0..candidates.len()).collect::<Vec<usize>>();
    let mut selected = Vec::<(usize, f32)>::new();

    while selected.len() < options.top_k && !remaining.is_empty() {
        let mut best_slot = 0_usize;
        let mut best_score = f32::NEG_INFINITY;

        for (slot, &candidate) in remaining.iter().enumerate() {
            let relevance = candidates[candidate].1;
            let marginal = if selected.is_empty() {
                // No diversity term applies to the first selection.
                relevance
            } else {
                let max_similarity = selected
                    .iter()
                    .map(|&(picked, _)| {
                        inner_product(&embeddings[candidate], &embeddings[picked])
                    })
                    .fold(f32::NEG_INFINITY, f32::max);
                lambda * relevance - (1.0 - lambda) * max_similarity
            };

            if marginal > best_score {
                best_score = marginal;
                best_slot = slot;
            }
        }

        let candidate = remaining.remove(best_slot);
        selected.push((candidate, best_score));
    }

    Ok(selected
        .into_iter()
        .map(|(candidate, marginal)| {
            let (chunk, relevance) = &candidates[candidate];
            RetrievedChunk {
                chunk: chunk.clone(),
                relevance_score: *relevance,
                rank_score: marginal,
            }
        })
        .collect())
}
