use std::path::{Path, PathBuf};

use lopdf::Document;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Text of one PDF page and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub source: String,
    /// Zero-based page index within `source`.
    pub page: u32,
}

/// Loads every page of every PDF directly under `dir` or its subdirectories.
pub fn load_pdf_dir(dir: &Path) -> Result<Vec<Page>> {
    let files = scan_pdfs(dir)?;
    if files.is_empty() {
        return Err(Error::NoDocuments(dir.to_path_buf()));
    }

    let mut pages = Vec::new();
    for path in files {
        let loaded = load_pdf(&path)?;
        tracing::debug!(path = %path.display(), pages = loaded.len(), "loaded PDF");
        pages.extend(loaded);
    }
    Ok(pages)
}

/// Lists PDF files under `dir`, sorted by path. Hidden files and anything
/// inside a hidden directory below `dir` are skipped.
pub fn scan_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::ResourcesNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        // the root itself may be hidden (e.g. a temp dir)
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_pdf(path) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

pub fn load_pdf(path: &Path) -> Result<Vec<Page>> {
    let pdf_err = |source| Error::Pdf {
        path: path.to_path_buf(),
        source,
    };
    let doc = Document::load(path).map_err(pdf_err)?;
    let source = path.to_string_lossy().to_string();

    let mut pages = Vec::new();
    for (idx, page_number) in doc.get_pages().keys().enumerate() {
        let text = doc.extract_text(&[*page_number]).map_err(pdf_err)?;
        pages.push(Page {
            text,
            source: source.clone(),
            page: idx as u32,
        });
    }
    Ok(pages)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
