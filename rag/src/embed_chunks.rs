use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::providers::Embedder;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI embeddings endpoint.
pub struct OpenAiEmbedder {
    http: ApiClient,
    url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &OpenAiConfig) -> Result<Self> {
        let auth = format!("Bearer {}", cfg.api_key);
        Ok(Self {
            http: ApiClient::new("openai", AUTHORIZATION, &auth)?,
            url: format!("{}/embeddings", cfg.base_url.trim_end_matches('/')),
            model: cfg.embed_model.clone(),
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let req = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let res = self.http.post_json::<EmbedResponse, _>(&self.url, &req)?;
        parse_embeddings(res, texts.len())
    }
}

fn parse_embeddings(mut res: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if res.data.len() != expected {
        return Err(Error::EmbeddingCount {
            expected,
            actual: res.data.len(),
        });
    }
    res.data.sort_by_key(|entry| entry.index);
    Ok(res.data.into_iter().map(|entry| entry.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_come_back_in_input_order() {
        let raw = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[0.5,0.5]},
            {"object":"embedding","index":0,"embedding":[1.0,0.0]}
        ],"model":"text-embedding-ada-002"}"#;
        let res: EmbedResponse = serde_json::from_str(raw).unwrap();
        let vecs = parse_embeddings(res, 2).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn short_response_is_an_error() {
        let raw = r#"{"data":[{"index":0,"embedding":[1.0]}]}"#;
        let res: EmbedResponse = serde_json::from_str(raw).unwrap();
        let err = parse_embeddings(res, 3).unwrap_err();
        assert!(matches!(err, Error::EmbeddingCount { expected: 3, actual: 1 }));
    }
}
