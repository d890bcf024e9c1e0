use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "attr",
    about = "Inspect and compare attribute tree snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with decode and comparison settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the contents of a snapshot
    Inspect(InspectArgs),
    /// Print the order-independent hash of a snapshot
    Hash(HashArgs),
    /// List the changes between two snapshots
    Diff(DiffArgs),
    /// Check whether one snapshot is contained in another
    Subset(SubsetArgs),
    /// Merge one snapshot into another
    Merge(MergeArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Also print the digest of the key-ordered encoding
    #[arg(long)]
    pub sorted: bool,
}

#[derive(Args)]
pub struct HashArgs {
    pub file: PathBuf,
    /// Key to leave out of the hash, at any depth
    #[arg(long)]
    pub ignore: Vec<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Full path to skip, e.g. `stats/temperature`
    #[arg(long)]
    pub ignore: Vec<String>,
}

#[derive(Args)]
pub struct SubsetArgs {
    pub subset: PathBuf,
    pub superset: PathBuf,
}

#[derive(Args)]
pub struct MergeArgs {
    pub dest: PathBuf,
    pub source: PathBuf,
    /// Where to write the result; defaults to overwriting `dest`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Compress the written snapshot with zstd
    #[arg(long)]
    pub compress: bool,
}
