pub mod api;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod search;
pub mod stores;
pub mod traits;

pub use api::{
    ApiError, EmbedMultipleResponse, EmbedRequest, FileResult, FileStatus, MessageResponse,
    SearchRequest, SearchResponse,
};
pub use config::{EmbeddingSettings, ServiceConfig, StoreSettings};
pub use context::AppContext;
pub use embeddings::{CharacterNgramEmbedder, Embedder, OpenAiConfig, OpenAiEmbedder};
pub use error::{ConfigError, EmbeddingError, ExtractError, IngestError, SearchError, StoreError};
pub use extractor::{discover_supported_files, extract_text, FileKind, UploadedFile};
pub use ingest::{BatchItem, BatchReport, IngestionPipeline, ItemOutcome};
pub use models::{Document, DocumentPayload, InsertAck, SearchMatch, SearchOptions};
pub use search::SearchService;
pub use stores::{MemoryStore, SupabaseConfig, SupabaseStore};
pub use traits::DocumentStore;
