//! Splits page text into overlapping, content-addressed chunks suitable for
//! embedding.
//!
//! Chunks break on sentence-like boundaries where possible and carry the
//! trailing units of the previous chunk (up to `overlap` characters) for
//! contextual continuity across boundaries.

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::{Chunk, Page};

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_OVERLAP: usize = 64;

/// Content fingerprint of a chunk: sha-256 of the text, first 20 hex chars.
pub fn chunk_id_for_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..20].to_string()
}

/// Split `page.text` into chunks of at most `chunk_size` characters,
/// seeding each chunk after the first with up to `overlap` trailing
/// characters of its predecessor.
///
/// `overlap < chunk_size` is expected but not enforced; pathological values
/// degrade gracefully. Blank input yields no chunks, and a single unit
/// longer than `chunk_size` is emitted alone.
pub fn chunk_page(page: &Page, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if page.text.trim().is_empty() {
        return Vec::new();
    }

    let units = split_units(&page.text);
    let mut chunks = Vec::<Chunk>::new();
    let mut buffer = Vec::<String>::new();
    let mut buffer_len = 0_usize;
    let mut offset = 0_usize;
    // Running total of consumed unit lengths, +1 per unit for the joiner.
    let mut consumed = 0_usize;

    for unit in units {
        let unit_len = unit.chars().count();
        if buffer_len + unit_len > chunk_size && !buffer.is_empty() {
            flush_buffer(&mut chunks, &buffer, offset, page);

            // Re-seed with the longest suffix of flushed units that fits
            // within `overlap`, preserving their original order.
            let mut seed = Vec::<String>::new();
            let mut seed_len = 0_usize;
            for previous in buffer.iter().rev() {
                let previous_len = previous.chars().count();
                if seed_len + previous_len > overlap {
                    break;
                }
                seed.push(previous.clone());
                seed_len += previous_len;
            }
            seed.reverse();

            offset = consumed.saturating_sub(seed_len);
            buffer = seed;
            buffer_len = seed_len;
        }

        buffer.push(unit);
        buffer_len += unit_len;
        consumed += unit_len + 1;
    }

    if !buffer.is_empty() {
        flush_buffer(&mut chunks, &buffer, offset, page);
    }

    debug!(
        doc_id = %page.doc_id,
        page = page.page_num,
        chunks = chunks.len(),
        "chunked page"
    );
    chunks
}

/// Chunk every page in order; the concatenation of per-page results.
pub fn chunk_pages(pages: &[Page], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut all_chunks = Vec::<Chunk>::new();
    for page in pages {
        all_chunks.extend(chunk_page(page, chunk_size, overlap));
    }
    debug!(total_chunks = all_chunks.len(), "chunked pages");
    all_chunks
}

fn flush_buffer(chunks: &mut Vec<Chunk>, buffer: &[String], char_offset: usize, page: &Page) {
    let text = buffer.join(" ");
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    chunks.push(Chunk {
        chunk_id: chunk_id_for_text(text),
        doc_id: page.doc_id.clone(),
        source_path: page.source_path.clone(),
        page_num: page.page_num,
        char_offset,
        text: text.to_string(),
        doc_type: page.doc_type,
    });
}

/// Sentence-like units: terminal punctuation followed by whitespace, or
/// blank-line paragraph breaks. Units come back trimmed and non-empty.
fn split_units(text: &str) -> Vec<String> {
    let paragraph_break = Regex::new(r"\n{2,}").expect("valid paragraph break regex");

    let mut units = Vec::<String>::new();
    for paragraph in paragraph_break.split(text) {
        split_sentences_into(paragraph, &mut units);
    }
    units
}

fn split_sentences_into(paragraph: &str, out: &mut Vec<String>) {
    let mut start = 0_usize;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((_, character)) = chars.next() {
        if !matches!(character, '.' | '!' | '?') {
            continue;
        }
        let Some(&(boundary, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        let unit = paragraph[start..boundary].trim();
        if !unit.is_empty() {
            out.push(unit.to_string());
        }

        start = boundary;
        while let Some(&(position, whitespace)) = chars.peek() {
            if !whitespace.is_whitespace() {
                break;
            }
            chars.next();
            start = position + whitespace.len_utf8();
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
}
