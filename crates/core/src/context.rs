use crate::config::{EmbeddingSettings, ServiceConfig, StoreSettings};
use crate::embeddings::{CharacterNgramEmbedder, Embedder, OpenAiConfig, OpenAiEmbedder};
use crate::error::ConfigError;
use crate::ingest::IngestionPipeline;
use crate::models::SearchOptions;
use crate::search::SearchService;
use crate::stores::{MemoryStore, SupabaseConfig, SupabaseStore};
use crate::traits::DocumentStore;
use std::sync::Arc;
use tracing::info;

pub type DynEmbedder = dyn Embedder;
pub type DynStore = dyn DocumentStore;

/// The composition root: one store client and one embedding client shared by
/// the ingestion pipeline and the search service for the life of the process.
pub struct AppContext {
    pub embedder: Arc<DynEmbedder>,
    pub store: Arc<DynStore>,
    pub pipeline: IngestionPipeline<DynEmbedder, DynStore>,
    pub search: SearchService<DynEmbedder, DynStore>,
}

impl AppContext {
    /// Validates `config`, then builds the store, the embedder, and finally the
    /// pipeline and search service on top of them.
    pub fn build(config: &ServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let dimensions = config.embedding.dimensions();
        let store: Arc<DynStore> = match &config.store {
            StoreSettings::Supabase {
                url,
                api_key,
                table,
                match_rpc,
            } => Arc::new(SupabaseStore::new(SupabaseConfig {
                url: url.clone(),
                api_key: api_key.clone(),
                table: table.clone(),
                match_rpc: match_rpc.clone(),
                dimensions,
                timeout: config.request_timeout(),
            })?),
            StoreSettings::Memory => Arc::new(MemoryStore::new(dimensions)),
        };

        let embedder: Arc<DynEmbedder> = match &config.embedding {
            EmbeddingSettings::OpenAi {
                api_key,
                endpoint,
                model,
                dimensions,
            } => Arc::new(OpenAiEmbedder::new(OpenAiConfig {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
                model: model.clone(),
                dimensions: *dimensions,
                timeout: config.request_timeout(),
            })?),
            EmbeddingSettings::Ngram { dimensions } => Arc::new(CharacterNgramEmbedder {
                dimensions: *dimensions,
            }),
        };

        info!(
            dimensions,
            threshold = config.search.match_threshold,
            count = config.search.match_count,
            "service context ready"
        );
        Self::from_parts(embedder, store, config.search)
    }

    /// Wires already-constructed clients; the store must accept the
    /// embedder's vector length.
    pub fn from_parts(
        embedder: Arc<DynEmbedder>,
        store: Arc<DynStore>,
        options: SearchOptions,
    ) -> Result<Self, ConfigError> {
        if embedder.dimensions() != store.dimensions() {
            return Err(ConfigError::DimensionMismatch {
                embedder: embedder.dimensions(),
                store: store.dimensions(),
            });
        }

        Ok(Self {
            pipeline: IngestionPipeline::new(embedder.clone(), store.clone()),
            search: SearchService::new(embedder.clone(), store.clone(), options),
            embedder,
            store,
        })
    }
}
