use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::load_pdfs::Page;

/// A span of page text ready to be embedded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: u32,
}

/// Recursive character splitter.
///
/// Text is cut on the first separator that occurs in it, and oversized pieces
/// are cut again on the separators that follow. Pieces are then packed into
/// chunks of at most `chunk_size` characters, each starting with up to
/// `chunk_overlap` characters carried over from the previous chunk. A piece
/// that is still too long after the last separator is kept whole.
#[derive(Clone, Debug)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be positive".to_string()));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) is larger than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn from_config(cfg: &IngestConfig) -> Result<Self> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap, cfg.separators.clone())
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Splits every page, carrying its source and page number onto each chunk.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    text,
                    source: page.source.clone(),
                    page: page.page,
                });
            }
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut rest: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                rest = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, rest));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Packs small pieces into chunks, keeping an overlapping tail between them.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut start = 0usize;
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && start < window.len() {
                push_trimmed(&mut chunks, &window[start..]);
                while start < window.len()
                    && (total > self.chunk_overlap || total + len > self.chunk_size)
                {
                    total -= window[start].1;
                    start += 1;
                }
            }
            window.push((piece, len));
            total += len;
        }
        if start < window.len() {
            push_trimmed(&mut chunks, &window[start..]);
        }
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &[(&str, usize)]) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Splits `text` on `separator`, attaching each separator to the piece after it.
/// An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
