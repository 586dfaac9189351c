mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod error;
mod generate;
mod http;
mod load_pdfs;
mod providers;
mod retrieve_chunks;
mod store_pinecone;

pub use build_prompt::{build_prompt_with_context, format_context_from_hits, Message};
pub use chunk_text::{Chunk, TextSplitter};
pub use config::{Config, IngestConfig, OpenAiConfig, PineconeConfig, DEFAULT_OPENAI_URL};
pub use embed_chunks::OpenAiEmbedder;
pub use error::{Error, Result};
pub use generate::OpenAiChat;
pub use load_pdfs::{load_pdf, load_pdf_dir, scan_pdfs, Page};
pub use providers::{ChatModel, Embedder, IndexRecord, ScoredChunk, VectorIndex};
pub use store_pinecone::PineconeIndex;

use serde_json::json;
use uuid::Uuid;

/// Counts from one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
}

/// One question, what was retrieved for it, and the model's answer.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub question: String,
    pub chunks: Vec<ScoredChunk>,
    pub answer: Option<String>,
}

/// Splits `pages`, embeds the chunks and upserts them, `batch_size` chunks per round trip.
pub fn ingest_documents<E, I>(
    pages: &[Page],
    splitter: &TextSplitter,
    embedder: &E,
    index: &mut I,
    batch_size: usize,
) -> Result<IngestReport>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    let chunks = splitter.split_pages(pages);
    tracing::info!(pages = pages.len(), chunks = chunks.len(), "split resources into chunks");

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_documents(&texts)?;
        if vectors.len() != batch.len() {
            return Err(Error::EmbeddingCount {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }

        let records: Vec<IndexRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| IndexRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: json!({
                    "text": chunk.text,
                    "source": chunk.source,
                    "page": chunk.page,
                }),
            })
            .collect();
        index.upsert(&records)?;
    }

    let mut sources: Vec<&str> = pages.iter().map(|p| p.source.as_str()).collect();
    sources.dedup();
    Ok(IngestReport {
        files: sources.len(),
        pages: pages.len(),
        chunks: chunks.len(),
    })
}

/// Loads the PDF corpus into the configured Pinecone index.
pub fn load_resources(cfg: &Config) -> Result<IngestReport> {
    let splitter = TextSplitter::from_config(&cfg.ingest)?;

    tracing::info!("Connecting to Pinecone...");
    let mut index = PineconeIndex::new(&cfg.pinecone, &cfg.metric)?;
    let embedder = OpenAiEmbedder::new(&cfg.openai)?;

    tracing::info!(dir = %cfg.ingest.resources_dir.display(), "Loading resources...");
    let pages = load_pdf_dir(&cfg.ingest.resources_dir)?;
    let report = ingest_documents(
        &pages,
        &splitter,
        &embedder,
        &mut index,
        cfg.ingest.batch_size,
    )?;

    tracing::info!(
        index = index.name(),
        files = report.files,
        chunks = report.chunks,
        "Loaded resources into Pinecone."
    );
    Ok(report)
}

/// Answers `question` from the chunks `index` returns for it.
pub fn answer_query<E, I, C>(
    embedder: &E,
    index: &mut I,
    chat: &C,
    question: &str,
    top_k: usize,
) -> Result<QueryResult>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
    C: ChatModel + ?Sized,
{
    if question.trim().is_empty() {
        return Err(Error::EmptyQuery);
    }
    let query_vec = embedder.embed_query(question)?;
    let hits = index.similarity_search(&query_vec, top_k)?;
    tracing::debug!(hits = hits.len(), "retrieved context");
    let messages = build_prompt_with_context(question, &hits);
    let answer = chat.complete(&messages)?;
    if answer.is_none() {
        tracing::warn!("chat completion returned no answer");
    }
    Ok(QueryResult {
        question: question.to_string(),
        chunks: hits,
        answer,
    })
}

/// Asks one question against the configured index and chat model.
pub fn ask(cfg: &Config, question: &str) -> Result<Option<String>> {
    let embedder = OpenAiEmbedder::new(&cfg.openai)?;
    let mut index = PineconeIndex::new(&cfg.pinecone, &cfg.metric)?;
    let chat = OpenAiChat::new(&cfg.openai)?;
    let result = answer_query(&embedder, &mut index, &chat, question, cfg.top_k)?;
    Ok(result.answer)
}
