//! Transport-free versions of the three service operations: store one
//! payload, store a batch of uploads, and search.
//!
//! Errors are turned into an [`ApiError`] carrying a status code and a
//! message that is safe to show to callers. The underlying cause is logged
//! here and never copied into the message.

use crate::context::AppContext;
use crate::error::{ExtractError, IngestError, SearchError};
use crate::extractor::UploadedFile;
use crate::ingest::ItemOutcome;
use crate::models::{DocumentPayload, SearchMatch};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub const STORED_MESSAGE: &str = "Document stored successfully";
pub const BATCH_MESSAGE: &str = "Documents processed successfully";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EmbedRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Stored,
    Failed,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileResult {
    pub filename: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EmbedMultipleResponse {
    pub message: String,
    pub results: Vec<FileResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchMatch>,
}

/// Message a caller sees for a failed ingestion.
pub fn ingest_failure_message(error: &IngestError) -> String {
    match error {
        IngestError::Extraction(ExtractError::UnsupportedFileType(_)) => {
            "Unsupported file type".to_string()
        }
        IngestError::Extraction(ExtractError::Decode { filename, .. }) => {
            format!("File is not valid UTF-8 text: {filename}")
        }
        IngestError::Extraction(ExtractError::ExtractionFailed { filename, .. }) => {
            format!("Error processing file: {filename}")
        }
        IngestError::Io(_) => "Error reading file".to_string(),
        IngestError::EmbeddingFailed(_) => "Failed to generate embedding".to_string(),
        IngestError::StoreWriteFailed(_) => "Failed to store document".to_string(),
        IngestError::EmptyTitle => "Document title must not be empty".to_string(),
        IngestError::NoFiles => "No files provided".to_string(),
    }
}

fn ingest_api_error(error: &IngestError) -> ApiError {
    if error.is_client_error() {
        ApiError::bad_request(ingest_failure_message(error))
    } else {
        error!(%error, "ingestion failed");
        ApiError::internal(ingest_failure_message(error))
    }
}

impl AppContext {
    /// `embed`: store a caller-supplied title and content.
    pub async fn embed_document(&self, request: EmbedRequest) -> Result<MessageResponse, ApiError> {
        self.pipeline
            .ingest_payload(DocumentPayload {
                title: request.title,
                content: request.content,
            })
            .await
            .map_err(|error| {
                if error.is_client_error() {
                    return ingest_api_error(&error);
                }
                error!(%error, "document was not stored");
                ApiError::internal("Failed to store document")
            })?;

        Ok(MessageResponse {
            message: STORED_MESSAGE.to_string(),
        })
    }

    /// `embed-multiple`: every file gets a status; only an empty request
    /// fails as a whole.
    pub async fn embed_multiple(
        &self,
        files: &[UploadedFile],
    ) -> Result<EmbedMultipleResponse, ApiError> {
        if files.is_empty() {
            return Err(ingest_api_error(&IngestError::NoFiles));
        }

        let report = self.pipeline.ingest_batch(files).await;
        let results = report
            .items
            .into_iter()
            .map(|item| match item.outcome {
                ItemOutcome::Stored(_) => FileResult {
                    filename: item.filename,
                    status: FileStatus::Stored,
                    error: None,
                },
                ItemOutcome::Failed(error) => FileResult {
                    filename: item.filename,
                    status: FileStatus::Failed,
                    error: Some(ingest_failure_message(&error)),
                },
            })
            .collect();

        Ok(EmbedMultipleResponse {
            message: BATCH_MESSAGE.to_string(),
            results,
        })
    }

    /// `search`: ranked matches for a free-text query.
    pub async fn search_documents(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, ApiError> {
        match self.search.search(&request.query).await {
            Ok(results) => Ok(SearchResponse { results }),
            Err(SearchError::EmptyQuery) => Err(ApiError::bad_request("Query must not be empty")),
            Err(error) => {
                error!(%error, "search failed");
                Err(ApiError::internal("Search failed"))
            }
        }
    }
}
