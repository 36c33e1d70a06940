use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use groundcheck::chunker::chunk_pages;
use groundcheck::corpus::{discover_documents, load_pages};
use groundcheck::semantic::HashEmbedder;
use groundcheck::store::build_store;

use crate::cli::IngestArgs;
use crate::util::{now_utc_string, write_json_pretty};

#[derive(Debug, Serialize)]
struct IngestManifest {
    generated_at: String,
    docs_dir: String,
    index_dir: String,
    document_count: usize,
    page_count: usize,
    chunk_count: usize,
    newly_added: usize,
    store_chunk_count: usize,
    chunk_size: usize,
    overlap: usize,
    embedding_dim: usize,
}

pub fn run(args: IngestArgs) -> Result<()> {
    let documents = discover_documents(&args.docs_dir)
        .with_context(|| format!("failed to discover documents in {}", args.docs_dir.display()))?;
    if documents.is_empty() {
        bail!(
            "no supported documents (.md, .txt) found in {}",
            args.docs_dir.display()
        );
    }

    let mut pages = Vec::new();
    for path in &documents {
        pages.extend(
            load_pages(path).with_context(|| format!("failed to load {}", path.display()))?,
        );
    }

    let chunks = chunk_pages(&pages, args.chunk_size, args.overlap);
    let provider = HashEmbedder::new(args.embedding_dim);
    let (store, newly_added) = build_store(&chunks, &provider, &args.index_dir)
        .with_context(|| format!("failed to build store at {}", args.index_dir.display()))?;

    let manifest = IngestManifest {
        generated_at: now_utc_string(),
        docs_dir: args.docs_dir.display().to_string(),
        index_dir: args.index_dir.display().to_string(),
        document_count: documents.len(),
        page_count: pages.len(),
        chunk_count: chunks.len(),
        newly_added,
        store_chunk_count: store.chunk_count(),
        chunk_size: args.chunk_size,
        overlap: args.overlap,
        embedding_dim: args.embedding_dim,
    };
    let manifest_path = args.index_dir.join("ingest_manifest.json");
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        documents = documents.len(),
        pages = pages.len(),
        chunks = chunks.len(),
        newly_added,
        total = store.chunk_count(),
        "ingest complete"
    );
    println!(
        "ingested {} document(s): {} new chunk(s), {} total",
        documents.len(),
        newly_added,
        store.chunk_count()
    );

    Ok(())
}
