use std::collections::BTreeMap;

use anyhow::{Context, Result};

use groundcheck::store::VectorStore;

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    if !VectorStore::exists(&args.index_dir) {
        println!("no store at {}; run ingest first", args.index_dir.display());
        return Ok(());
    }

    let store = VectorStore::load(&args.index_dir)
        .with_context(|| format!("failed to load store at {}", args.index_dir.display()))?;

    println!("store: {}", args.index_dir.display());
    println!("chunks: {}", store.chunk_count());
    println!("dimensionality: {}", store.dimensions().unwrap_or(0));

    let mut by_type = BTreeMap::<&'static str, usize>::new();
    for chunk in store.all_chunks() {
        *by_type.entry(chunk.doc_type.label()).or_default() += 1;
    }
    for (label, count) in by_type {
        println!("  {label}: {count}");
    }

    Ok(())
}
