use crate::embeddings::{
    DEFAULT_NGRAM_DIMENSIONS, DEFAULT_OPENAI_DIMENSIONS, DEFAULT_OPENAI_ENDPOINT,
    DEFAULT_OPENAI_MODEL,
};
use crate::error::ConfigError;
use crate::models::SearchOptions;
use crate::stores::supabase::{DEFAULT_MATCH_RPC, DEFAULT_TABLE};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingSettings {
    OpenAi {
        api_key: String,
        endpoint: String,
        model: String,
        dimensions: usize,
    },
    Ngram {
        dimensions: usize,
    },
}

impl EmbeddingSettings {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAi {
            api_key: api_key.into(),
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: DEFAULT_OPENAI_DIMENSIONS,
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::OpenAi { dimensions, .. } | Self::Ngram { dimensions } => *dimensions,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self::Ngram {
            dimensions: DEFAULT_NGRAM_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum StoreSettings {
    Supabase {
        url: String,
        api_key: String,
        table: String,
        match_rpc: String,
    },
    #[default]
    Memory,
}

impl StoreSettings {
    pub fn supabase(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::Supabase {
            url: url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            match_rpc: DEFAULT_MATCH_RPC.to_string(),
        }
    }
}

/// Everything the composition root needs, assembled once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub search: SearchOptions,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingSettings::default(),
            store: StoreSettings::default(),
            search: SearchOptions::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimensions() == 0 {
            return Err(ConfigError::Invalid {
                name: "embedding.dimensions",
                details: "must be positive".to_string(),
            });
        }

        if let EmbeddingSettings::OpenAi { api_key, .. } = &self.embedding {
            if api_key.trim().is_empty() {
                return Err(ConfigError::Missing("embedding.api_key"));
            }
        }

        if let StoreSettings::Supabase { url, api_key, .. } = &self.store {
            if url.trim().is_empty() {
                return Err(ConfigError::Missing("store.url"));
            }
            if api_key.trim().is_empty() {
                return Err(ConfigError::Missing("store.api_key"));
            }
        }

        if !(-1.0..=1.0).contains(&self.search.match_threshold) {
            return Err(ConfigError::Invalid {
                name: "search.match_threshold",
                details: format!("{} is outside [-1, 1]", self.search.match_threshold),
            });
        }

        if self.search.match_count == 0 {
            return Err(ConfigError::Invalid {
                name: "search.match_count",
                details: "must be positive".to_string(),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "request_timeout_secs",
                details: "must be positive".to_string(),
            });
        }

        Ok(())
    }
}
