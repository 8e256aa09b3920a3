use crate::error::IndexError;
use crate::industry::Industry;
use crate::models::{DocumentChunk, SearchHit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    model_id: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// On-disk vector index holding every chunk across all industries.
///
/// The whole index lives in one JSON artifact at a fixed path. Appends are
/// serialized behind a mutex and persisted via a temp-file rename, so
/// concurrent ingestions cannot lose each other's chunks and readers never
/// observe a torn file. Queries filter on exact industry equality before
/// ranking by cosine similarity.
pub struct IndexStore {
    path: PathBuf,
    model_id: String,
    dimensions: usize,
    write_guard: Mutex<()>,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>, model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            path: path.into(),
            model_id: model_id.into(),
            dimensions,
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Appends chunks and their vectors, returning the new total entry count.
    pub async fn append(
        &self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
        }

        let _guard = self.write_guard.lock().await;

        let mut file = self.load_or_empty().await?;
        file.entries.extend(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry { chunk, vector }),
        );
        self.persist(&file).await?;
        Ok(file.entries.len())
    }

    /// Ranks stored chunks of the given industry against the query vector.
    pub async fn search(
        &self,
        query: &[f32],
        industry: Industry,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let file = self.load().await?;
        let mut hits: Vec<SearchHit> = file
            .entries
            .into_iter()
            .filter(|entry| entry.chunk.industry == industry)
            .map(|entry| SearchHit {
                score: cosine_similarity(query, &entry.vector),
                chunk: entry.chunk,
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    pub async fn entry_count(&self) -> Result<usize, IndexError> {
        if !self.exists() {
            return Ok(0);
        }
        Ok(self.load().await?.entries.len())
    }

    async fn load(&self) -> Result<IndexFile, IndexError> {
        if !self.path.exists() {
            return Err(IndexError::Missing(self.path.clone()));
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let file: IndexFile = serde_json::from_slice(&bytes)?;

        if file.model_id != self.model_id {
            return Err(IndexError::ModelMismatch {
                expected: file.model_id,
                actual: self.model_id.clone(),
            });
        }
        if file.dimensions != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: file.dimensions,
            });
        }
        Ok(file)
    }

    async fn load_or_empty(&self) -> Result<IndexFile, IndexError> {
        if self.path.exists() {
            self.load().await
        } else {
            Ok(IndexFile {
                model_id: self.model_id.clone(),
                dimensions: self.dimensions,
                entries: Vec::new(),
            })
        }
    }

    async fn persist(&self, file: &IndexFile) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec(file)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, IndexStore};
    use crate::error::IndexError;
    use crate::industry::Industry;
    use crate::models::DocumentChunk;
    use tempfile::tempdir;

    fn chunk(industry: Industry, page: u32, text: &str) -> DocumentChunk {
        DocumentChunk::new("doc-1", industry, "manual.pdf", page, text.to_string())
    }

    fn store_at(dir: &std::path::Path) -> IndexStore {
        IndexStore::new(dir.join("index.json"), "test-model", 3)
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_before_any_append_reports_missing() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        assert!(!store.exists());
        let error = store.search(&[1.0, 0.0, 0.0], Industry::Legal, 3).await.unwrap_err();
        assert!(matches!(error, IndexError::Missing(_)));
    }

    #[tokio::test]
    async fn append_then_search_returns_ranked_hits() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        store
            .append(
                vec![
                    chunk(Industry::Legal, 1, "close match"),
                    chunk(Industry::Legal, 2, "far match"),
                ],
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = store.search(&[0.9, 0.1, 0.0], Industry::Legal, 3).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source_page, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn search_filters_on_exact_industry() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        store
            .append(
                vec![chunk(Industry::Healthcare, 1, "identical text")],
                vec![vec![1.0, 0.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], Industry::Finance, 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn second_append_keeps_earlier_entries() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        store
            .append(vec![chunk(Industry::Hvac, 1, "first")], vec![vec![1.0, 0.0, 0.0]])
            .await
            .unwrap();
        let total = store
            .append(vec![chunk(Industry::Hvac, 2, "second")], vec![vec![0.0, 1.0, 0.0]])
            .await
            .unwrap();

        assert_eq!(total, 2);
        assert_eq!(store.entry_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn index_survives_store_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = store_at(dir.path());
            store
                .append(vec![chunk(Industry::Finance, 1, "retained")], vec![vec![0.0, 0.0, 1.0]])
                .await
                .unwrap();
        }

        let reopened = store_at(dir.path());
        let hits = reopened.search(&[0.0, 0.0, 1.0], Industry::Finance, 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "retained");
    }

    #[tokio::test]
    async fn mismatched_counts_and_dimensions_are_rejected() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let count_error = store
            .append(vec![chunk(Industry::Legal, 1, "text")], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(count_error, IndexError::CountMismatch { .. }));

        let dim_error = store
            .append(vec![chunk(Industry::Legal, 1, "text")], vec![vec![1.0]])
            .await
            .unwrap_err();
        assert!(matches!(dim_error, IndexError::DimensionMismatch { .. }));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let dir = tempdir().unwrap();
        let store = store_at(dir.path());

        let chunks = (1..=5)
            .map(|page| chunk(Industry::RealEstate, page, "listing"))
            .collect::<Vec<_>>();
        let vectors = (1..=5).map(|i| vec![i as f32, 1.0, 0.0]).collect::<Vec<_>>();
        store.append(chunks, vectors).await.unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], Industry::RealEstate, 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn reopening_with_other_model_is_rejected() {
        let dir = tempdir().unwrap();
        {
            let store = store_at(dir.path());
            store
                .append(vec![chunk(Industry::Legal, 1, "text")], vec![vec![1.0, 0.0, 0.0]])
                .await
                .unwrap();
        }

        let other = IndexStore::new(dir.path().join("index.json"), "other-model", 3);
        let error = other.search(&[1.0, 0.0, 0.0], Industry::Legal, 3).await.unwrap_err();
        assert!(matches!(error, IndexError::ModelMismatch { .. }));
    }
}
