use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::build_prompt::Message;
use crate::config::OpenAiConfig;
use crate::error::Result;
use crate::http::ApiClient;
use crate::providers::ChatModel;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI chat-completions endpoint.
pub struct OpenAiChat {
    http: ApiClient,
    url: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(cfg: &OpenAiConfig) -> Result<Self> {
        let auth = format!("Bearer {}", cfg.api_key);
        Ok(Self {
            http: ApiClient::new("openai", AUTHORIZATION, &auth)?,
            url: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
        })
    }
}

impl ChatModel for OpenAiChat {
    fn complete(&self, messages: &[Message]) -> Result<Option<String>> {
        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };
        let res = self.http.post_json::<ChatResponse, _>(&self.url, &req)?;
        Ok(first_answer(res))
    }
}

fn first_answer(res: ChatResponse) -> Option<String> {
    res.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|m| m.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_is_first_choice_content() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Warming."},"finish_reason":"stop"}]}"#;
        let res: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_answer(res).as_deref(), Some("Warming."));
    }

    #[test]
    fn missing_content_is_no_answer() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":null}}]}"#;
        let res: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_answer(res), None);

        let empty: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(first_answer(empty), None);
    }
}
