//! Process-local document store.
//!
//! Rows live in insertion order behind a `tokio` lock and search is a brute
//! force cosine scan. Ties keep insertion order, which makes rankings
//! reproducible in tests.

use crate::error::StoreError;
use crate::models::{Document, InsertAck, SearchMatch, SearchOptions};
use crate::traits::{check_vector, DocumentStore};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredRow {
    id: Uuid,
    document: Document,
}

pub struct MemoryStore {
    dimensions: usize,
    rows: RwLock<Vec<StoredRow>>,
}

impl MemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Titles of every stored row, in insertion order.
    pub async fn titles(&self) -> Vec<String> {
        self.rows
            .read()
            .await
            .iter()
            .map(|row| row.document.title.clone())
            .collect()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert(&self, document: &Document) -> Result<InsertAck, StoreError> {
        check_vector(self.dimensions, &document.embedding)?;

        let id = Uuid::new_v4();
        let mut rows = self.rows.write().await;
        rows.push(StoredRow {
            id,
            document: document.clone(),
        });
        debug!(%id, title = %document.title, rows = rows.len(), "row inserted");

        Ok(InsertAck { id: id.to_string() })
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        check_vector(self.dimensions, query_vector)?;

        let rows = self.rows.read().await;
        let scored = rows
            .iter()
            .map(|row| SearchMatch {
                id: row.id.to_string(),
                title: row.document.title.clone(),
                content: row.document.content.clone(),
                similarity: cosine_similarity(query_vector, &row.document.embedding),
            })
            .collect();

        Ok(options.apply(scored))
    }
}
