use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use groundcheck::chunker::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use groundcheck::semantic::DEFAULT_EMBEDDING_DIM;

#[derive(Parser, Debug)]
#[command(
    name = "groundcheck",
    version,
    about = "Local report grounding and citation coverage tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Query(QueryArgs),
    Validate(ValidateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = "docs")]
    pub docs_dir: PathBuf,

    #[arg(long, default_value = ".groundcheck/index")]
    pub index_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    pub overlap: usize,

    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".groundcheck/index")]
    pub index_dir: PathBuf,

    #[arg(long)]
    pub query: String,

    #[arg(long, default_value_t = 8)]
    pub top_k: usize,

    #[arg(long, default_value_t = false)]
    pub no_mmr: bool,

    #[arg(long, default_value_t = 0.6)]
    pub mmr_lambda: f32,

    #[arg(long)]
    pub fetch_k: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = ".groundcheck/index")]
    pub index_dir: PathBuf,

    #[arg(long)]
    pub report_path: PathBuf,

    /// JSON array of known external reference ids.
    #[arg(long)]
    pub refs_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_scientific: bool,

    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Write a copy of the report with uncited paragraphs annotated.
    #[arg(long)]
    pub annotate_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".groundcheck/index")]
    pub index_dir: PathBuf,
}
