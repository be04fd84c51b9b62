use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("{filename} is not valid utf-8: {source}")]
    Decode {
        filename: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("failed to extract text from {filename}: {cause}")]
    ExtractionFailed { filename: String, cause: String },
}

impl ExtractError {
    pub fn failed(filename: &str, cause: impl ToString) -> Self {
        Self::ExtractionFailed {
            filename: filename.to_string(),
            cause: cause.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("similarity search failed: {0}")]
    SearchFailed(String),

    #[error("vector has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(#[source] EmbeddingError),

    #[error("store write failed: {0}")]
    StoreWriteFailed(#[source] StoreError),

    #[error("document title is empty")]
    EmptyTitle,

    #[error("no files provided")]
    NoFiles,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True when the caller can fix the request (bad suffix, empty title, no files).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Extraction(ExtractError::UnsupportedFileType(_))
                | Self::EmptyTitle
                | Self::NoFiles
        )
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("embedding failed: {0}")]
    EmbeddingFailed(#[source] EmbeddingError),

    #[error("search failed: {0}")]
    SearchFailed(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {details}")]
    Invalid { name: &'static str, details: String },

    #[error("embedder produces {embedder} dimensions but store expects {store}")]
    DimensionMismatch { embedder: usize, store: usize },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
