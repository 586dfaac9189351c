use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::providers::ScoredChunk;
use crate::store_pinecone::PineconeIndex;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<Value>,
}

impl PineconeIndex {
    pub fn query(&mut self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let host = self.existing_host()?;
        if vector.is_empty() {
            return Ok(vec![]);
        }
        let url = self.data_url(&host, "/query");
        let req = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
        };
        let res = self.http.post_json::<QueryResponse, _>(&url, &req)?;
        Ok(hits_from_matches(res.matches))
    }
}

fn hits_from_matches(matches: Vec<Match>) -> Vec<ScoredChunk> {
    let mut hits = Vec::with_capacity(matches.len());
    for m in matches {
        let metadata = m.metadata.unwrap_or(Value::Null);
        let Some(text) = metadata.get("text").and_then(Value::as_str) else {
            tracing::warn!(id = %m.id, "match has no `text` metadata, skipping");
            continue;
        };
        hits.push(ScoredChunk {
            text: text.to_string(),
            score: m.score,
            source: metadata
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string),
            page: metadata
                .get("page")
                .and_then(|p| p.as_u64().or_else(|| p.as_f64().map(|f| f as u64)))
                .map(|p| p as u32),
        });
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_pinecone_field_names() {
        let req = QueryRequest {
            vector: &[0.1],
            top_k: 4,
            include_metadata: true,
        };
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["topK"], 4);
        assert_eq!(body["includeMetadata"], true);
    }

    #[test]
    fn matches_without_text_are_skipped() {
        let raw = r#"{"matches":[
            {"id":"1","score":0.9,"metadata":{"text":"Sea levels rise.","source":"ipcc.pdf","page":3.0}},
            {"id":"2","score":0.8,"metadata":{"source":"ipcc.pdf"}},
            {"id":"3","score":0.7}
        ],"namespace":""}"#;
        let res: QueryResponse = serde_json::from_str(raw).unwrap();
        let hits = hits_from_matches(res.matches);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Sea levels rise.");
        assert_eq!(hits[0].source.as_deref(), Some("ipcc.pdf"));
        assert_eq!(hits[0].page, Some(3));
    }
}
