use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{SearchMatch, SearchOptions};
use crate::traits::DocumentStore;
use std::sync::Arc;
use tracing::debug;

pub struct SearchService<E: ?Sized, S: ?Sized> {
    embedder: Arc<E>,
    store: Arc<S>,
    options: SearchOptions,
}

impl<E, S> SearchService<E, S>
where
    E: Embedder + ?Sized,
    S: DocumentStore + ?Sized,
{
    pub fn new(embedder: Arc<E>, store: Arc<S>, options: SearchOptions) -> Self {
        Self {
            embedder,
            store,
            options,
        }
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, SearchError> {
        self.search_with(query, self.options).await
    }

    pub async fn search_with(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(SearchError::EmbeddingFailed)?;

        let matches = self
            .store
            .similarity_search(&query_vector, options)
            .await
            .map_err(SearchError::SearchFailed)?;

        debug!(
            hits = matches.len(),
            threshold = options.match_threshold,
            count = options.match_count,
            "search completed"
        );
        Ok(matches)
    }
}
