//! Flat in-memory vector index with cosine similarity.
//!
//! Brute-force search over every stored chunk. The index lives for one run;
//! nothing is persisted.

use tracing::debug;

use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::memory::TextChunk;

/// Chunks embedded per provider call.
const EMBED_BATCH: usize = 32;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: TextChunk,
    pub score: f32,
}

#[derive(Debug, Default)]
pub struct VectorIndex {
    /// Fixed by the first insert.
    dimensions: Option<usize>,
    entries: Vec<(Vec<f32>, TextChunk)>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed `chunks` with `llm` and index them.
    pub async fn build(llm: &LlmProvider, chunks: Vec<TextChunk>) -> Result<Self, AppError> {
        let mut index = Self::new();
        index.add_chunks(llm, chunks).await?;
        Ok(index)
    }

    /// Embed and insert more chunks.
    pub async fn add_chunks(&mut self, llm: &LlmProvider, chunks: Vec<TextChunk>) -> Result<(), AppError> {
        let total = chunks.len();
        let mut pending = chunks.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<TextChunk> = pending.by_ref().take(EMBED_BATCH).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = llm.embed(&texts).await?;
            for (embedding, chunk) in embeddings.into_iter().zip(batch) {
                self.insert(chunk, embedding)?;
            }
        }
        debug!(added = total, size = self.entries.len(), "vector index updated");
        Ok(())
    }

    pub fn insert(&mut self, chunk: TextChunk, embedding: Vec<f32>) -> Result<(), AppError> {
        match self.dimensions {
            Some(dim) if dim != embedding.len() => {
                return Err(AppError::Memory(format!(
                    "vector index: dimension mismatch: expected {dim}, got {}",
                    embedding.len()
                )));
            }
            None if embedding.is_empty() => {
                return Err(AppError::Memory("vector index: empty embedding".into()));
            }
            None => self.dimensions = Some(embedding.len()),
            _ => {}
        }
        self.entries.push((embedding, chunk));
        Ok(())
    }

    /// Top-`k` chunks by cosine similarity, best first.
    /// A query of the wrong dimension matches nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 || self.dimensions != Some(query.len()) {
            return Vec::new();
        }
        let mut scored: Vec<(f32, &TextChunk)> = self
            .entries
            .iter()
            .map(|(v, c)| (cosine_similarity(query, v), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| SearchHit { chunk: chunk.clone(), score })
            .collect()
    }

    /// Embed `query` and search.
    pub async fn search_text(&self, llm: &LlmProvider, query: &str, k: usize) -> Result<Vec<SearchHit>, AppError> {
        let mut embedded = llm.embed(&[query.to_string()]).await?;
        let q = embedded
            .pop()
            .ok_or_else(|| AppError::Memory("vector index: no embedding for query".into()))?;
        Ok(self.search(&q, k))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity in [-1, 1]. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use std::collections::BTreeMap;

    fn chunk(text: &str) -> TextChunk {
        TextChunk { id: text.into(), text: text.into(), position: 0, metadata: BTreeMap::new() }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn search_orders_by_similarity() {
        let mut idx = VectorIndex::new();
        idx.insert(chunk("x"), vec![1.0, 0.0]).unwrap();
        idx.insert(chunk("y"), vec![0.0, 1.0]).unwrap();
        idx.insert(chunk("xy"), vec![0.7, 0.7]).unwrap();
        let hits = idx.search(&[1.0, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "x");
        assert_eq!(hits[1].chunk.text, "xy");
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut idx = VectorIndex::new();
        idx.insert(chunk("a"), vec![1.0, 0.0]).unwrap();
        assert!(idx.insert(chunk("b"), vec![1.0]).is_err());
        assert!(idx.search(&[1.0, 0.0, 0.0], 3).is_empty());
    }

    #[tokio::test]
    async fn build_and_search_with_dummy_embeddings() {
        let llm = LlmProvider::Dummy(DummyProvider);
        let chunks = vec![
            chunk("Ollama serves local language models"),
            chunk("SQLite is an embedded database engine"),
        ];
        let idx = VectorIndex::build(&llm, chunks).await.unwrap();
        assert_eq!(idx.len(), 2);
        let hits = idx.search_text(&llm, "which database engine is embedded", 1).await.unwrap();
        assert_eq!(hits[0].chunk.text, "SQLite is an embedded database engine");
    }
}
