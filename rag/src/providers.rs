//! Seams between the pipelines and the hosted services they call.

use serde::Serialize;
use serde_json::Value;

use crate::build_prompt::Message;
use crate::error::Result;

/// Turns text into fixed-dimension vectors.
pub trait Embedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vecs = self.embed_documents(&[text.to_string()])?;
        Ok(vecs.into_iter().next().unwrap_or_default())
    }
}

/// A named remote index of (vector, text, metadata) records.
pub trait VectorIndex {
    /// Stores `records`, creating the index on first use if it does not exist.
    fn upsert(&mut self, records: &[IndexRecord]) -> Result<()>;

    /// Returns up to `top_k` records closest to `vector`. The index must already exist.
    fn similarity_search(&mut self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Generates an answer from a prompt. `None` when the service returned no answer text.
pub trait ChatModel {
    fn complete(&self, messages: &[Message]) -> Result<Option<String>>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub source: Option<String>,
    pub page: Option<u32>,
}
