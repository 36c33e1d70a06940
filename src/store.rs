//! Vector store: chunk metadata and embedding vectors behind one paired
//! abstraction, with deduplication by chunk id, inner-product similarity
//! search, and persistence to an index directory.
//!
//! The store owns the positional invariant: vector `i` always corresponds
//! to chunk `i`. Both sequences grow only through the private paired
//! append, so the invariant holds by construction.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::Chunk;
use crate::semantic::{EmbeddingProvider, decode_vector_blob, encode_vector_blob, inner_product};

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoreManifest {
    chunk_count: usize,
    dim: usize,
}

/// Flat inner-product index over unit-normalized vectors, row-major.
#[derive(Debug)]
struct FlatIndex {
    dim: usize,
    rows: Vec<f32>,
}

impl FlatIndex {
    fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::Configuration(format!(
                "embedding dimensionality {} does not match index dimensionality {}",
                vector.len(),
                self.dim
            )));
        }
        self.rows.extend_from_slice(vector);
        Ok(())
    }

    fn row(&self, position: usize) -> &[f32] {
        &self.rows[position * self.dim..(position + 1) * self.dim]
    }

    fn len(&self) -> usize {
        self.rows.len() / self.dim
    }

    /// Top `k` positions by inner product, descending; ties keep insertion
    /// order.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored = (0..self.len())
            .map(|position| (position, inner_product(query, self.row(position))))
            .collect::<Vec<(usize, f32)>>();
        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Authoritative mapping from chunk identity to embedding vector.
#[derive(Debug, Default)]
pub struct VectorStore {
    index: Option<FlatIndex>,
    chunks: Vec<Chunk>,
    id_to_pos: HashMap<String, usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add chunk/embedding pairs, skipping chunk ids already present.
    /// Returns the number of newly added chunks; 0 when every chunk was a
    /// duplicate. The index is created lazily, sized to the dimensionality
    /// of the first vector added.
    pub fn add(&mut self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(Error::Input(format!(
                "chunks ({}) and embeddings ({}) must have the same length",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut added = 0_usize;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            if self.id_to_pos.contains_key(&chunk.chunk_id) {
                continue;
            }
            if self.index.is_none() {
                if embedding.is_empty() {
                    return Err(Error::Configuration(
                        "embedding dimensionality must be nonzero".to_string(),
                    ));
                }
                self.index = Some(FlatIndex::new(embedding.len()));
            }
            self.push_pair(chunk.clone(), embedding)?;
            added += 1;
        }

        if added == 0 {
            debug!("no new chunks to add (all duplicates)");
        } else {
            info!(new = added, total = self.chunks.len(), "added chunks");
        }
        Ok(added)
    }

    /// The single mutation point for both sequences: the vector append must
    /// succeed before the chunk and its position are recorded.
    fn push_pair(&mut self, chunk: Chunk, embedding: &[f32]) -> Result<()> {
        let index = self
            .index
            .as_mut()
            .ok_or_else(|| Error::Configuration("similarity index not initialized".to_string()))?;
        index.push(embedding)?;
        self.id_to_pos.insert(chunk.chunk_id.clone(), self.chunks.len());
        self.chunks.push(chunk);
        Ok(())
    }

    /// Nearest chunks by inner product, at most `min(k, chunk_count)`.
    /// Positions that resolve to no chunk are dropped silently.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        let Some(index) = self.index.as_ref() else {
            return Vec::new();
        };
        if self.chunks.is_empty() {
            return Vec::new();
        }

        index
            .search(query, k.min(self.chunks.len()))
            .into_iter()
            .filter_map(|(position, score)| {
                self.chunks.get(position).map(|chunk| (chunk.clone(), score))
            })
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn all_chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn known_chunk_ids(&self) -> HashSet<String> {
        self.id_to_pos.keys().cloned().collect()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.index.as_ref().map(|index| index.dim)
    }

    /// Persist the vector sequence, the chunk sequence, and the manifest as
    /// one unit. A store that never saw an `add` writes no vectors file, so
    /// [`VectorStore::exists`] stays false for it.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        if let Some(index) = self.index.as_ref() {
            fs::write(dir.join(VECTORS_FILE), encode_vector_blob(&index.rows))?;
        }

        fs::write(dir.join(CHUNKS_FILE), serde_json::to_vec_pretty(&self.chunks)?)?;

        let manifest = StoreManifest {
            chunk_count: self.chunks.len(),
            dim: self.dimensions().unwrap_or(0),
        };
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

        info!(chunks = self.chunks.len(), dir = %dir.display(), "saved store");
        Ok(())
    }

    /// Restore a store saved by [`VectorStore::save`]. Fails with
    /// [`Error::NotFound`] when the directory holds no complete store.
    pub fn load(dir: &Path) -> Result<Self> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);
        if !vectors_path.exists() || !chunks_path.exists() {
            return Err(Error::NotFound(format!(
                "no store at {}; run ingest first",
                dir.display()
            )));
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Error::NotFound(format!(
                "store manifest missing at {}",
                manifest_path.display()
            )));
        }

        let manifest: StoreManifest = serde_json::from_slice(&fs::read(&manifest_path)?)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&fs::read(&chunks_path)?)?;
        if manifest.chunk_count != chunks.len() {
            return Err(Error::NotFound(format!(
                "store at {} is incomplete: manifest lists {} chunk(s), found {}",
                dir.display(),
                manifest.chunk_count,
                chunks.len()
            )));
        }
        if manifest.dim == 0 {
            return Err(Error::Configuration(
                "store manifest reports zero dimensionality".to_string(),
            ));
        }

        let blob = fs::read(&vectors_path)?;
        let rows = decode_vector_blob(&blob, manifest.dim * chunks.len()).ok_or_else(|| {
            Error::NotFound(format!(
                "store at {} is incomplete: vectors file does not match manifest",
                dir.display()
            ))
        })?;

        let id_to_pos = chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| (chunk.chunk_id.clone(), position))
            .collect::<HashMap<String, usize>>();

        info!(chunks = chunks.len(), dim = manifest.dim, "loaded store");
        Ok(Self {
            index: Some(FlatIndex {
                dim: manifest.dim,
                rows,
            }),
            chunks,
            id_to_pos,
        })
    }

    /// Cheap probe for a saved store, without a full load.
    pub fn exists(dir: &Path) -> bool {
        dir.join(VECTORS_FILE).exists()
    }
}

/// Embed `chunks`, merge them into the store at `dir` (loading an existing
/// store for incremental updates), and save. Returns the store and the
/// number of newly added chunks.
pub fn build_store(
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
    dir: &Path,
) -> Result<(VectorStore, usize)> {
    let texts = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<&str>>();
    let embeddings = provider.embed(&texts)?;

    let mut store = if VectorStore::exists(dir) {
        VectorStore::load(dir)?
    } else {
        VectorStore::new()
    };
    let added = store.add(chunks, &embeddings)?;
    store.save(dir)?;

    info!(added, total = store.chunk_count(), "built store");
    Ok((store, added))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::chunker::chunk_id_for_text;
    use crate::model::DocType;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            chunk_id: chunk_id_for_text(text),
            doc_id: "0011223344556677".to_string(),
            source_path: "docs/sample.md".to_string(),
            page_num: 1,
            char_offset: 0,
            text: text.to_string(),
            doc_type: DocType::General,
        }
    }

    #[test]
    fn add_deduplicates_identical_text() {
        let mut store = VectorStore::new();
        let chunks = vec![chunk("same text"), chunk("same text")];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];

        let added = store.add(&chunks, &embeddings).unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.chunk_count(), 1);

        // A second add of the same batch is a no-op.
        let added = store.add(&chunks, &embeddings).unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.chunk_count(), 1);
    }

    #[test]
    fn add_rejects_mismatched_batch_lengths() {
        let mut store = VectorStore::new();
        let err = store
            .add(&[chunk("alpha")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn add_rejects_dimensionality_drift() {
        let mut store = VectorStore::new();
        store.add(&[chunk("alpha")], &[vec![1.0, 0.0]]).unwrap();

        let err = store
            .add(&[chunk("beta")], &[vec![1.0, 0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn positions_stay_paired_across_adds() {
        let mut store = VectorStore::new();
        let texts = ["first", "second", "third", "fourth"];
        for (position, text) in texts.iter().enumerate() {
            let mut vector = vec![0.0_f32; 4];
            vector[position] = 1.0;
            store.add(&[chunk(text)], &[vector]).unwrap();
        }

        assert_eq!(store.chunk_count(), 4);
        for (position, text) in texts.iter().enumerate() {
            // A one-hot query must resolve to the chunk added at the same
            // position.
            let mut query = vec![0.0_f32; 4];
            query[position] = 1.0;
            let results = store.search(&query, 1);
            assert_eq!(results[0].0.text, *text);
            assert_eq!(store.all_chunks()[position].text, *text);
        }
    }

    #[test]
    fn search_orders_by_descending_similarity() {
        let mut store = VectorStore::new();
        let chunks = vec![chunk("far"), chunk("close"), chunk("middle")];
        let embeddings = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]];
        store.add(&chunks, &embeddings).unwrap();

        let results = store.search(&[1.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.text, "close");
        assert_eq!(results[1].0.text, "middle");
        assert_eq!(results[2].0.text, "far");
    }

    #[test]
    fn search_respects_k_and_store_size() {
        let mut store = VectorStore::new();
        let chunks = vec![chunk("a"), chunk("b"), chunk("c")];
        let embeddings = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.8, 0.2]];
        store.add(&chunks, &embeddings).unwrap();

        assert_eq!(store.search(&[1.0, 0.0], 2).len(), 2);
        assert_eq!(store.search(&[1.0, 0.0], 100).len(), 3);
    }

    #[test]
    fn empty_store_searches_empty() {
        let store = VectorStore::new();
        assert!(store.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");

        let mut store = VectorStore::new();
        let chunks = vec![chunk("alpha content"), chunk("beta content")];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        store.add(&chunks, &embeddings).unwrap();

        assert!(!VectorStore::exists(&dir));
        store.save(&dir).unwrap();
        assert!(VectorStore::exists(&dir));

        let restored = VectorStore::load(&dir).unwrap();
        assert_eq!(restored.chunk_count(), 2);
        assert_eq!(restored.dimensions(), Some(3));
        assert_eq!(restored.all_chunks()[0].text, "alpha content");
        assert_eq!(restored.all_chunks()[1].text, "beta content");

        let results = restored.search(&[0.0, 1.0, 0.0], 1);
        assert_eq!(results[0].0.text, "beta content");
    }

    #[test]
    fn load_of_missing_store_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = VectorStore::load(&tmp.path().join("nowhere")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn empty_store_save_leaves_no_probe_target() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");

        VectorStore::new().save(&dir).unwrap();
        assert!(!VectorStore::exists(&dir));
        assert!(matches!(
            VectorStore::load(&dir).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn build_store_is_incremental() {
        use crate::semantic::HashEmbedder;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        let provider = HashEmbedder::new(32);

        let chunks = vec![chunk("gateway handles requests"), chunk("daily backups")];
        let (store, added) = build_store(&chunks, &provider, &dir).unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.chunk_count(), 2);

        // Rebuilding with the same chunks adds nothing.
        let (store, added) = build_store(&chunks, &provider, &dir).unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.chunk_count(), 2);
    }
}
