use serde::{Deserialize, Serialize};

pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MATCH_COUNT: usize = 5;

/// A row ready to be persisted: title, extracted text and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Caller-supplied text that skips extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentPayload {
    pub title: String,
    pub content: String,
}

impl DocumentPayload {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAck {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub id: String,
    pub title: String,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub match_threshold: f32,
    pub match_count: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_count: DEFAULT_MATCH_COUNT,
        }
    }
}

impl SearchOptions {
    /// Applies the threshold, descending order and count to raw matches.
    ///
    /// Equal similarities keep the order they arrived in, so callers that feed
    /// matches in insertion (or id) order get a reproducible ranking.
    pub fn apply(&self, mut matches: Vec<SearchMatch>) -> Vec<SearchMatch> {
        matches.retain(|item| item.similarity >= self.match_threshold);
        matches.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
        matches.truncate(self.match_count);
        matches
    }
}
