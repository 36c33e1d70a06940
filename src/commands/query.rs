use anyhow::{Context, Result};

use groundcheck::retriever::{RetrievalOptions, retrieve};
use groundcheck::semantic::{DEFAULT_EMBEDDING_DIM, HashEmbedder};
use groundcheck::store::VectorStore;

use crate::cli::QueryArgs;

pub fn run(args: QueryArgs) -> Result<()> {
    let store = VectorStore::load(&args.index_dir)
        .with_context(|| format!("failed to load store at {}", args.index_dir.display()))?;
    let provider = HashEmbedder::new(store.dimensions().unwrap_or(DEFAULT_EMBEDDING_DIM));

    let options = RetrievalOptions {
        top_k: args.top_k,
        use_mmr: !args.no_mmr,
        mmr_lambda: args.mmr_lambda,
        fetch_k: args.fetch_k,
    };
    let results = retrieve(&args.query, &store, &provider, &options)
        .context("retrieval failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("no results");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. [SRC:{}] relevance={:.3} rank={:.3}",
            rank + 1,
            result.chunk.chunk_id,
            result.relevance_score,
            result.rank_score
        );
        println!(
            "    {} ({}, page {})",
            result.chunk.source_path,
            result.chunk.doc_type.label(),
            result.chunk.page_num
        );
        println!("    {}", snippet(&result.chunk.text));
    }

    Ok(())
}

fn snippet(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<&str>>().join(" ");
    if flattened.chars().count() <= 160 {
        return flattened;
    }
    let truncated = flattened.chars().take(160).collect::<String>();
    format!("{truncated}…")
}
