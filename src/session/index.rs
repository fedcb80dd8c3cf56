//! Flat vector index over session chunks, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SessionError;

/// What a chunk was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Paper,
    Insights,
    ResearchDirection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Paper => "paper",
            ChunkKind::Insights => "insights",
            ChunkKind::ResearchDirection => "research_direction",
        }
    }
}

/// A unit of embedded text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Paper id for paper chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A search result; `score` is squared L2 distance, lower is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub kind: ChunkKind,
    pub source_id: Option<String>,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            dimension: 0,
            entries: Vec::new(),
        }
    }

    /// Build from chunks and their vectors (same length, same order)
    pub fn build(model: impl Into<String>, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, SessionError> {
        if chunks.len() != vectors.len() {
            return Err(SessionError::Corrupt {
                name: "index".to_string(),
                reason: format!("{} chunks but {} vectors", chunks.len(), vectors.len()),
            });
        }
        let mut index = Self::new(model);
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            index.insert(chunk, vector)?;
        }
        Ok(index)
    }

    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<(), SessionError> {
        if self.entries.is_empty() {
            self.dimension = vector.len();
        } else if vector.len() != self.dimension {
            return Err(SessionError::Corrupt {
                name: "index".to_string(),
                reason: format!("vector of dimension {} in an index of dimension {}", vector.len(), self.dimension),
            });
        }
        self.entries.push(IndexedChunk { chunk, vector });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Up to `k` nearest chunks, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .entries
            .iter()
            .filter(|e| e.vector.len() == query.len())
            .map(|e| (squared_l2(&e.vector, query), e))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| SearchHit {
                text: entry.chunk.text.clone(),
                kind: entry.chunk.kind,
                source_id: entry.chunk.source_id.clone(),
                score,
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            kind: ChunkKind::Paper,
            source_id: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = VectorIndex::build(
            "test",
            vec![chunk("far"), chunk("near"), chunk("mid")],
            vec![vec![10.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]],
        )
        .unwrap();

        let hits = index.search(&[0.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "near");
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[1].text, "mid");
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = VectorIndex::new("test");
        index.insert(chunk("a"), vec![1.0, 2.0]).unwrap();
        assert!(index.insert(chunk("b"), vec![1.0]).is_err());
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(serde_json::to_string(&ChunkKind::ResearchDirection).unwrap(), "\"research_direction\"");
        assert_eq!(ChunkKind::Insights.as_str(), "insights");
    }
}
