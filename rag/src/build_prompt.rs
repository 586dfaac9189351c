use crate::providers::ScoredChunk;

const SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the users question. \n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Stuffs every retrieved chunk into the system message, verbatim.
pub fn build_prompt_with_context(question: &str, hits: &[ScoredChunk]) -> Vec<Message> {
    let context = format_context_from_hits(hits);
    vec![
        Message::system(format!("{}{}", SYSTEM_TEMPLATE, context)),
        Message::user(question),
    ]
}

pub fn format_context_from_hits(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
