use crate::error::StoreError;
use crate::models::{Document, InsertAck, SearchMatch, SearchOptions};
use crate::traits::{check_vector, DocumentStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TABLE: &str = "documentation";
pub const DEFAULT_MATCH_RPC: &str = "match_documents";

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub match_rpc: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, dimensions: usize) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            match_rpc: DEFAULT_MATCH_RPC.to_string(),
            dimensions,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Postgres + pgvector behind a PostgREST API.
///
/// Rows go to `/rest/v1/{table}`; searches call the `/rest/v1/rpc/{match_rpc}`
/// procedure with `query_embedding`, `match_threshold` and `match_count`.
pub struct SupabaseStore {
    client: Client,
    api_key: String,
    dimensions: usize,
    table_url: Url,
    rpc_url: Url,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    id: Value,
    title: String,
    #[serde(default)]
    content: String,
    similarity: f32,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        if config.api_key.trim().is_empty() {
            return Err(StoreError::InvalidConfig("api key is empty".to_string()));
        }
        if config.dimensions == 0 {
            return Err(StoreError::InvalidConfig(
                "dimensions must be positive".to_string(),
            ));
        }

        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))?;
        let table_url = base.join(&format!("rest/v1/{}", config.table))?;
        let rpc_url = base.join(&format!("rest/v1/rpc/{}", config.match_rpc))?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key,
            dimensions: config.dimensions,
            table_url,
            rpc_url,
        })
    }

    fn post(&self, url: &Url) -> reqwest::RequestBuilder {
        self.client
            .post(url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert(&self, document: &Document) -> Result<InsertAck, StoreError> {
        check_vector(self.dimensions, &document.embedding)?;

        let response = self
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&json!({
                "title": document.title,
                "content": document.content,
                "embedding": document.embedding,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::WriteFailed(format!("{status}: {body}")));
        }

        let ack = parse_insert_ack(&body)?;
        debug!(id = %ack.id, title = %document.title, "row inserted");
        Ok(ack)
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        check_vector(self.dimensions, query_vector)?;

        let response = self
            .post(&self.rpc_url)
            .json(&json!({
                "query_embedding": query_vector,
                "match_threshold": options.match_threshold,
                "match_count": options.match_count,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::SearchFailed(format!("{status}: {body}")));
        }

        parse_matches(&body, options)
    }
}

fn parse_insert_ack(body: &str) -> Result<InsertAck, StoreError> {
    let rows: Vec<InsertedRow> = serde_json::from_str(body)
        .map_err(|error| StoreError::WriteFailed(format!("unexpected insert response: {error}")))?;

    rows.into_iter()
        .next()
        .map(|row| InsertAck {
            id: id_to_string(&row.id),
        })
        .ok_or_else(|| StoreError::WriteFailed("insert returned no row".to_string()))
}

/// Translates the RPC body into typed matches and re-applies the ranking
/// contract, breaking similarity ties by row id.
fn parse_matches(body: &str, options: SearchOptions) -> Result<Vec<SearchMatch>, StoreError> {
    let mut rows: Vec<MatchRow> = serde_json::from_str(body)
        .map_err(|error| StoreError::SearchFailed(format!("unexpected search response: {error}")))?;

    rows.sort_by(|left, right| compare_ids(&left.id, &right.id));

    let matches = rows
        .into_iter()
        .map(|row| SearchMatch {
            id: id_to_string(&row.id),
            title: row.title,
            content: row.content,
            similarity: row.similarity,
        })
        .collect();

    Ok(options.apply(matches))
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn compare_ids(left: &Value, right: &Value) -> Ordering {
    match (left.as_i64(), right.as_i64()) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => id_to_string(left).cmp(&id_to_string(right)),
    }
}
