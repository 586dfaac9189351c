use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub environment: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    pub resources_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
    pub batch_size: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub pinecone: PineconeConfig,
    pub openai: OpenAiConfig,
    pub ingest: IngestConfig,
    pub top_k: usize,
    pub metric: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env if present so keys work without manual `source .env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pinecone = PineconeConfig::from_lookup(&lookup)?;
        let openai = OpenAiConfig {
            api_key: required(&lookup, "OPENAI_API_KEY")?,
            base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            embed_model: lookup("OPENAI_EMBED_MODEL")
                .unwrap_or_else(|| "text-embedding-ada-002".to_string()),
            chat_model: lookup("OPENAI_CHAT_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            temperature: parsed(&lookup, "COPILOT_TEMPERATURE").unwrap_or(1.0),
        };
        let ingest = IngestConfig {
            resources_dir: lookup("COPILOT_RESOURCES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("resources")),
            chunk_size: parsed(&lookup, "COPILOT_CHUNK_SIZE").unwrap_or(200),
            chunk_overlap: parsed(&lookup, "COPILOT_CHUNK_OVERLAP").unwrap_or(50),
            separators: vec!["\n".to_string(), "\r\n".to_string()],
            batch_size: parsed(&lookup, "COPILOT_UPSERT_BATCH")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(32),
        };
        Ok(Self {
            pinecone,
            openai,
            ingest,
            top_k: parsed(&lookup, "COPILOT_TOP_K").unwrap_or(4),
            metric: lookup("PINECONE_METRIC").unwrap_or_else(|| "cosine".to_string()),
        })
    }
}

impl PineconeConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: required(&lookup, "PINECONE_API_KEY")?,
            index_name: required(&lookup, "PINECONE_INDEX_NAME")?,
            environment: required(&lookup, "PINECONE_INDEX_ENVIRONMENT")?,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingEnv(key)),
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
