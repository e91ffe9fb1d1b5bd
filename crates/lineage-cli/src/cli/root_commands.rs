use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Turn a simple definition file into a result document.
    CreateFlatResult(CreateFlatResultArgs),
    /// Resolve the provenance of every project and package in a result document.
    Resolve(ResolveArgs),
    /// Print the effective configuration.
    Config,
}

#[derive(Clone, Debug, Args)]
pub struct CreateFlatResultArgs {
    /// Definition file to read (`.json` or `.toml`).
    #[arg(short = 'i', long = "simple-definition-file")]
    pub definition_file: PathBuf,

    /// Result file to write (`.json` or `.toml`).
    #[arg(short = 'o', long = "result-file")]
    pub result_file: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct ResolveArgs {
    /// Result document to read.
    #[arg(short = 'i', long = "result-file")]
    pub input: PathBuf,

    /// Where to write the result with provenance. Defaults to the input file.
    #[arg(short = 'o', long = "output-file")]
    pub output: Option<PathBuf>,

    /// Do not read or write the provenance cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Override `resolver.max_concurrency`.
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Override `resolver.timeout_secs`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Leave out packages that only occur in excluded scopes.
    #[arg(long)]
    pub skip_excluded: bool,

    /// Fetch source artifacts into the local store below `storage.root`.
    #[arg(long)]
    pub store_sources: bool,
}
