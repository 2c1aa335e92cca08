//! CLI argument definitions
//!
//! Defines the clap arguments for the descdiff CLI.

use clap::Args;
use std::path::PathBuf;

use crate::common::config::BothFailPolicy;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Corpus root: a directory of <vendor>.<name>.<version> subdirectories,
    /// or a single descriptor file inside one
    pub root: PathBuf,

    /// Baseline (reference) tool; overrides [tools.baseline] in the config
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Modified (candidate) tool; overrides [tools.modified] in the config
    #[arg(long)]
    pub modified: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of entries processed in parallel
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Per-invocation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// How to classify entries where both tools fail
    #[arg(long, value_enum)]
    pub both_fail: Option<BothFailPolicy>,

    /// Descriptor file extension (default: svd)
    #[arg(long)]
    pub extension: Option<String>,

    /// Write one JSON record per entry to this file
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Keep raw tool output under this directory
    #[arg(long)]
    pub keep_output: Option<PathBuf>,

    /// Only discover and list corpus entries
    #[arg(long)]
    pub list: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
