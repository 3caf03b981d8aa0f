use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CACHE_ROOT: &str = ".cache/import-embeddings";
pub const DEFAULT_INPUT_PATH: &str = "embedding.csv";
pub const DEFAULT_DB_FILENAME: &str = "content.sqlite";

#[derive(Parser, Debug)]
#[command(
    name = "import-embeddings",
    version,
    about = "Load precomputed embeddings from CSV into the content store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attach one embedding per CSV row to the content entry matching its URL.
    Import(ImportArgs),
    /// Parse a few rows and report tokens that do not re-serialize identically.
    Verify(VerifyArgs),
    /// Summarize content entries and stored embeddings.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    pub input: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    pub input: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub max_rows: usize,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

pub fn resolve_db_path(cache_root: &std::path::Path, db_path: Option<&PathBuf>) -> PathBuf {
    db_path
        .cloned()
        .unwrap_or_else(|| cache_root.join(DEFAULT_DB_FILENAME))
}
