use crate::error::StoreError;
use crate::models::{Document, InsertAck, SearchMatch, SearchOptions};
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Embedding length every row in this store must have.
    fn dimensions(&self) -> usize;

    /// Appends one row. Either the row becomes visible to later searches or
    /// nothing is written.
    async fn insert(&self, document: &Document) -> Result<InsertAck, StoreError>;

    /// Rows with similarity >= threshold, best first, at most `match_count`.
    /// An empty result is not an error.
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchMatch>, StoreError>;
}

pub(crate) fn check_vector(expected: usize, vector: &[f32]) -> Result<(), StoreError> {
    if vector.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
