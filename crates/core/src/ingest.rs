use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{extract_text, UploadedFile};
use crate::models::{Document, DocumentPayload, InsertAck};
use crate::traits::DocumentStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum ItemOutcome {
    Stored(InsertAck),
    Failed(IngestError),
}

#[derive(Debug)]
pub struct BatchItem {
    pub filename: String,
    pub outcome: ItemOutcome,
}

impl BatchItem {
    pub fn is_stored(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Stored(_))
    }
}

/// Per-file results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn stored_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_stored()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items.len() - self.stored_count()
    }
}

/// Extract, embed and store, one document at a time.
pub struct IngestionPipeline<E: ?Sized, S: ?Sized> {
    embedder: Arc<E>,
    store: Arc<S>,
}

impl<E, S> IngestionPipeline<E, S>
where
    E: Embedder + ?Sized,
    S: DocumentStore + ?Sized,
{
    pub fn new(embedder: Arc<E>, store: Arc<S>) -> Self {
        Self { embedder, store }
    }

    pub async fn ingest_file(&self, file: &UploadedFile) -> Result<InsertAck, IngestError> {
        let content = extract_text(file)?;
        self.embed_and_store(file.filename.clone(), content).await
    }

    pub async fn ingest_payload(&self, payload: DocumentPayload) -> Result<InsertAck, IngestError> {
        if payload.title.trim().is_empty() {
            return Err(IngestError::EmptyTitle);
        }
        self.embed_and_store(payload.title, payload.content).await
    }

    /// Every file is attempted; a failure is recorded and the batch moves on.
    pub async fn ingest_batch(&self, files: &[UploadedFile]) -> BatchReport {
        let mut report = BatchReport::default();

        for file in files {
            let outcome = match self.ingest_file(file).await {
                Ok(ack) => ItemOutcome::Stored(ack),
                Err(error) => {
                    warn!(filename = %file.filename, %error, "skipped file");
                    ItemOutcome::Failed(error)
                }
            };
            report.items.push(BatchItem {
                filename: file.filename.clone(),
                outcome,
            });
        }

        info!(
            files = report.items.len(),
            stored = report.stored_count(),
            failed = report.failed_count(),
            "batch ingested"
        );
        report
    }

    /// Same as [`Self::ingest_batch`] but reads each path from disk first;
    /// unreadable paths become failed items.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for path in paths {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let result = match UploadedFile::read(path).await {
                Ok(file) => self.ingest_file(&file).await,
                Err(error) => Err(IngestError::Io(error)),
            };

            let outcome = match result {
                Ok(ack) => ItemOutcome::Stored(ack),
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipped file");
                    ItemOutcome::Failed(error)
                }
            };
            report.items.push(BatchItem { filename, outcome });
        }

        info!(
            files = report.items.len(),
            stored = report.stored_count(),
            failed = report.failed_count(),
            "batch ingested"
        );
        report
    }

    async fn embed_and_store(
        &self,
        title: String,
        content: String,
    ) -> Result<InsertAck, IngestError> {
        let embedding = self
            .embedder
            .embed(&content)
            .await
            .map_err(IngestError::EmbeddingFailed)?;

        let document = Document {
            title,
            content,
            embedding,
        };

        let ack = self
            .store
            .insert(&document)
            .await
            .map_err(IngestError::StoreWriteFailed)?;

        debug!(id = %ack.id, title = %document.title, "document stored");
        Ok(ack)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::embeddings::Embedder;
    use crate::error::{EmbeddingError, StoreError};
    use crate::models::{Document, InsertAck, SearchMatch, SearchOptions};
    use crate::traits::DocumentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a constant vector, counts calls and fails on texts containing `fail_on`.
    pub struct CountingEmbedder {
        pub dimensions: usize,
        pub fail_on: Option<&'static str>,
        pub calls: AtomicUsize,
    }

    impl CountingEmbedder {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.is_some_and(|needle| text.contains(needle)) {
                return Err(EmbeddingError::Provider {
                    status: 429,
                    body: "rate limited".to_string(),
                });
            }
            Ok(vec![1.0; self.dimensions])
        }
    }

    /// Records inserted titles; can be told to reject every write or search.
    #[derive(Default)]
    pub struct RecordingStore {
        pub dimensions: usize,
        pub reject_writes: bool,
        pub reject_searches: bool,
        pub inserted: Mutex<Vec<String>>,
        pub searches: AtomicUsize,
    }

    impl RecordingStore {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                ..Default::default()
            }
        }

        pub fn inserted(&self) -> Vec<String> {
            self.inserted.lock().map(|rows| rows.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn insert(&self, document: &Document) -> Result<InsertAck, StoreError> {
            if self.reject_writes {
                return Err(StoreError::WriteFailed("connection reset".to_string()));
            }
            let mut rows = self
                .inserted
                .lock()
                .map_err(|error| StoreError::WriteFailed(error.to_string()))?;
            rows.push(document.title.clone());
            Ok(InsertAck {
                id: rows.len().to_string(),
            })
        }

        async fn similarity_search(
            &self,
            _query_vector: &[f32],
            _options: SearchOptions,
        ) -> Result<Vec<SearchMatch>, StoreError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.reject_searches {
                return Err(StoreError::SearchFailed("statement timeout".to_string()));
            }
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{CountingEmbedder, RecordingStore};
    use super::*;
    use crate::error::ExtractError;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline(
        embedder: CountingEmbedder,
        store: RecordingStore,
    ) -> (
        IngestionPipeline<CountingEmbedder, RecordingStore>,
        Arc<CountingEmbedder>,
        Arc<RecordingStore>,
    ) {
        let embedder = Arc::new(embedder);
        let store = Arc::new(store);
        (
            IngestionPipeline::new(embedder.clone(), store.clone()),
            embedder,
            store,
        )
    }

    #[tokio::test]
    async fn unsupported_file_makes_no_downstream_calls() {
        let (pipeline, embedder, store) =
            pipeline(CountingEmbedder::new(3), RecordingStore::new(3));

        let error = pipeline
            .ingest_file(&UploadedFile::new("sheet.csv", b"a,b".to_vec()))
            .await
            .expect_err("csv is unsupported");

        assert!(matches!(
            error,
            IngestError::Extraction(ExtractError::UnsupportedFileType(_))
        ));
        assert!(error.is_client_error());
        assert_eq!(embedder.calls(), 0);
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn file_title_is_its_filename() -> Result<(), IngestError> {
        let (pipeline, _, store) = pipeline(CountingEmbedder::new(3), RecordingStore::new(3));
        pipeline
            .ingest_file(&UploadedFile::new("faq.txt", b"Shipping takes 5 days".to_vec()))
            .await?;
        assert_eq!(store.inserted(), vec!["faq.txt".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_text_is_still_stored() -> Result<(), IngestError> {
        let (pipeline, embedder, store) =
            pipeline(CountingEmbedder::new(3), RecordingStore::new(3));
        pipeline
            .ingest_file(&UploadedFile::new("blank.txt", Vec::new()))
            .await?;
        assert_eq!(embedder.calls(), 1);
        assert_eq!(store.inserted().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn embedding_failure_leaves_no_row() {
        let embedder = CountingEmbedder {
            fail_on: Some("boom"),
            ..CountingEmbedder::new(3)
        };
        let (pipeline, _, store) = pipeline(embedder, RecordingStore::new(3));

        let error = pipeline
            .ingest_payload(DocumentPayload::new("t", "boom"))
            .await
            .expect_err("provider failure");

        assert!(matches!(error, IngestError::EmbeddingFailed(_)));
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_a_write_failure() {
        let store = RecordingStore {
            reject_writes: true,
            ..RecordingStore::new(3)
        };
        let (pipeline, _, _) = pipeline(CountingEmbedder::new(3), store);

        let error = pipeline
            .ingest_payload(DocumentPayload::new("t", "text"))
            .await
            .expect_err("write failure");
        assert!(matches!(error, IngestError::StoreWriteFailed(_)));
        assert!(!error.is_client_error());
    }

    #[tokio::test]
    async fn blank_title_is_rejected_before_embedding() {
        let (pipeline, embedder, _) = pipeline(CountingEmbedder::new(3), RecordingStore::new(3));
        let error = pipeline
            .ingest_payload(DocumentPayload::new("  ", "text"))
            .await
            .expect_err("blank title");
        assert!(matches!(error, IngestError::EmptyTitle));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn batch_continues_after_a_failed_item() {
        let embedder = CountingEmbedder {
            fail_on: Some("provider-chokes"),
            ..CountingEmbedder::new(3)
        };
        let (pipeline, _, store) = pipeline(embedder, RecordingStore::new(3));

        let files = vec![
            UploadedFile::new("one.txt", b"first".to_vec()),
            UploadedFile::new("two.txt", vec![0xff, 0xfe]),
            UploadedFile::new("three.csv", b"x".to_vec()),
            UploadedFile::new("four.txt", b"provider-chokes".to_vec()),
            UploadedFile::new("five.txt", b"last".to_vec()),
        ];

        let report = pipeline.ingest_batch(&files).await;

        let names: Vec<_> = report.items.iter().map(|item| item.filename.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "two.txt", "three.csv", "four.txt", "five.txt"]);
        assert_eq!(report.stored_count(), 2);
        assert_eq!(report.failed_count(), 3);
        assert!(matches!(
            report.items[1].outcome,
            ItemOutcome::Failed(IngestError::Extraction(ExtractError::Decode { .. }))
        ));
        assert!(matches!(
            report.items[3].outcome,
            ItemOutcome::Failed(IngestError::EmbeddingFailed(_))
        ));
        assert_eq!(store.inserted(), vec!["one.txt".to_string(), "five.txt".to_string()]);
    }

    #[tokio::test]
    async fn paths_that_cannot_be_read_are_failed_items(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let present = dir.path().join("present.txt");
        fs::write(&present, b"hello")?;
        let missing = dir.path().join("missing.txt");

        let (pipeline, _, store) = pipeline(CountingEmbedder::new(3), RecordingStore::new(3));
        let report = pipeline.ingest_paths(&[missing, present]).await;

        assert_eq!(report.items.len(), 2);
        assert!(matches!(report.items[0].outcome, ItemOutcome::Failed(IngestError::Io(_))));
        assert!(report.items[1].is_stored());
        assert_eq!(store.inserted(), vec!["present.txt".to_string()]);
        Ok(())
    }
}
