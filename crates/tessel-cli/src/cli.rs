// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "tessel", version)]
#[command(about = "Apply, verify and query normalized record-cache patches")]
pub struct Cli {
    /// Directory of the config store read for default cache settings.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by every subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Schema JSON (`{"models": {...}}`).
    #[arg(long)]
    pub schema: PathBuf,
    /// JSON array of records applied as one `addRecord` batch first.
    #[arg(long)]
    pub seed: Option<PathBuf>,
    /// Cache settings JSON; overrides the config store.
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply an operation batch and print the patch result
    Apply {
        #[command(flatten)]
        cache: CacheArgs,
        /// JSON array of operations.
        #[arg(long)]
        ops: PathBuf,
    },
    /// Apply a batch, replay its inverse and check the state digest is restored
    Verify {
        #[command(flatten)]
        cache: CacheArgs,
        /// JSON array of operations.
        #[arg(long)]
        ops: PathBuf,
        /// Emit the report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a query expression against the seeded records
    Query {
        #[command(flatten)]
        cache: CacheArgs,
        /// Query expression JSON (`{"op": "findRecords", "type": "planet"}`).
        #[arg(long)]
        query: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Table,
}
