use std::collections::HashSet;
use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use groundcheck::store::VectorStore;
use groundcheck::validator::{annotate_uncited, validate};

use crate::cli::ValidateArgs;

pub fn run(args: ValidateArgs) -> Result<()> {
    let report_text = fs::read_to_string(&args.report_path)
        .with_context(|| format!("failed to read report: {}", args.report_path.display()))?;

    let store = VectorStore::load(&args.index_dir)
        .with_context(|| format!("failed to load store at {}", args.index_dir.display()))?;
    let known_chunk_ids = store.known_chunk_ids();
    let known_ref_ids = load_known_refs(&args)?;

    if let Some(annotate_path) = &args.annotate_out {
        let annotated = annotate_uncited(&report_text);
        fs::write(annotate_path, annotated).with_context(|| {
            format!("failed to write annotated report: {}", annotate_path.display())
        })?;
        info!(path = %annotate_path.display(), "wrote annotated report");
    }

    let report = validate(
        &report_text,
        &known_chunk_ids,
        &known_ref_ids,
        !args.no_scientific,
        args.strict,
    )?;

    for message in &report.messages {
        println!("{message}");
    }
    for preview in &report.uncited_paragraphs {
        println!("  uncited: {preview}");
    }

    if report.ok {
        println!("citation coverage OK");
    } else {
        println!("citation coverage FAILED");
    }

    Ok(())
}

fn load_known_refs(args: &ValidateArgs) -> Result<HashSet<String>> {
    let Some(refs_path) = &args.refs_path else {
        return Ok(HashSet::new());
    };

    let data = fs::read(refs_path)
        .with_context(|| format!("failed to read references: {}", refs_path.display()))?;
    let ids: Vec<String> = serde_json::from_slice(&data)
        .with_context(|| format!("failed to parse references: {}", refs_path.display()))?;
    Ok(ids.into_iter().collect())
}
