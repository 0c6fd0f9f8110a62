use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "textdup")]
#[command(about = "Find duplicate and near-duplicate text documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory tree for duplicate documents
    Scan {
        /// Root directory to scan
        root: PathBuf,
        /// Match mode: exact, canonical or near (overrides config)
        #[arg(long)]
        mode: Option<String>,
        /// Similarity threshold 0-100 for near mode (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Display the number of entries in the metadata cache
    CacheStats,
    /// Print configuration values
    PrintConfig,
    /// Empty the metadata cache
    ClearCache,
}
