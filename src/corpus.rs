//! Corpus discovery and plain-text page loading.
//!
//! Only plain text and Markdown are handled here; extraction of richer
//! formats (PDF, DOCX, HTML, OCR) belongs to external collaborators that
//! produce [`Page`] records themselves.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::model::{DocType, Page, doc_id_for_path};

const SUPPORTED_SUFFIXES: &[&str] = &["md", "txt"];

/// Recursively find all supported documents under `dir`, sorted by path.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::<PathBuf>::new();
    collect_documents(dir, &mut documents)?;
    documents.sort();
    info!(count = documents.len(), "discovered documents");
    Ok(documents)
}

fn collect_documents(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_documents(&path, out)?;
        } else if is_supported(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| SUPPORTED_SUFFIXES.contains(&extension.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load a text or Markdown document as pseudo-pages, split at level 1-3
/// heading lines. Page numbers are 1-based; blank sections are dropped.
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    let source_path = path.to_string_lossy().into_owned();
    let doc_id = doc_id_for_path(&source_path);
    let doc_type = detect_doc_type(path);

    let mut sections = Vec::<String>::new();
    let mut current = String::new();
    for line in text.lines() {
        if is_heading(line) && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }

    let pages = sections
        .into_iter()
        .enumerate()
        .map(|(index, section)| Page {
            doc_id: doc_id.clone(),
            source_path: source_path.clone(),
            page_num: (index + 1) as u32,
            text: section,
            doc_type,
        })
        .collect::<Vec<Page>>();

    Ok(pages)
}

/// Discover and load every supported document under `dir`.
pub fn load_corpus(dir: &Path) -> Result<Vec<Page>> {
    let mut pages = Vec::<Page>::new();
    for path in discover_documents(dir)? {
        pages.extend(load_pages(&path)?);
    }
    info!(pages = pages.len(), "loaded corpus");
    Ok(pages)
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("# ") || trimmed.starts_with("## ") || trimmed.starts_with("### ")
}

/// Derive the doc type from the immediate parent folder name.
fn detect_doc_type(path: &Path) -> DocType {
    path.parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .map(DocType::from_folder)
        .unwrap_or(DocType::General)
}
