//! Run summary and reporting
//!
//! The summary is owned by the single aggregating consumer in the runner;
//! workers never touch it directly.

mod render;
mod results;

use std::path::PathBuf;
use std::time::Duration;

pub use render::{render, Report};
pub use results::{write_results, InterruptedRecord, IssueRecord, ResultRecord};

use crate::compare::Verdict;
use crate::corpus::{CorpusEntry, CorpusIssue};
use crate::invoke::Invocation;

/// Process exit code when every entry matched
pub const EXIT_OK: i32 = 0;
/// Process exit code when any entry mismatched or errored, or the run was cut short
pub const EXIT_FAILURES: i32 = 1;
/// Process exit code for usage and setup errors
pub const EXIT_USAGE: i32 = 2;

/// What is kept of one tool invocation after its output has been compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRun {
    pub status: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl From<&Invocation> for ToolRun {
    fn from(inv: &Invocation) -> Self {
        Self {
            status: inv.status_label(),
            exit_code: inv.exit_code,
            duration: inv.duration,
        }
    }
}

/// Outcome of processing one corpus entry
#[derive(Debug, Clone)]
pub struct EntryResult {
    pub entry: CorpusEntry,
    pub verdict: Verdict,
    /// Set when a mismatch is covered by an accepted difference
    pub accepted: Option<String>,
    pub baseline: ToolRun,
    pub modified: ToolRun,
    /// Where the raw output of both tools was kept, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl EntryResult {
    /// Whether this entry should fail the run
    pub fn is_failure(&self) -> bool {
        match self.verdict {
            Verdict::Match => false,
            Verdict::Mismatch(_) => self.accepted.is_none(),
            Verdict::Error(_) => true,
        }
    }
}

/// Aggregate counts over the processed entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Entries discovered and scheduled
    pub total: usize,
    /// Entries that produced a verdict
    pub processed: usize,
    pub matches: usize,
    /// All mismatches, accepted ones included
    pub mismatches: usize,
    pub accepted: usize,
    pub errors: usize,
}

/// Everything a finished (or interrupted) run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    total: usize,
    results: Vec<EntryResult>,
    issues: Vec<CorpusIssue>,
    interrupted: bool,
}

impl RunSummary {
    /// Start a summary for `total` scheduled entries
    pub fn new(total: usize, issues: Vec<CorpusIssue>) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            issues,
            interrupted: false,
        }
    }

    /// Add one entry's result
    pub fn record(&mut self, result: EntryResult) {
        self.results.push(result);
    }

    /// Mark the run as cut short
    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Put results in key order so reports do not depend on completion order
    pub fn finish(mut self) -> Self {
        self.results.sort_by(|a, b| {
            a.entry
                .key
                .cmp(&b.entry.key)
                .then_with(|| a.entry.path.cmp(&b.entry.path))
        });
        self
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn results(&self) -> &[EntryResult] {
        &self.results
    }

    pub fn issues(&self) -> &[CorpusIssue] {
        &self.issues
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts {
            total: self.total,
            processed: self.results.len(),
            ..Counts::default()
        };
        for result in &self.results {
            match result.verdict {
                Verdict::Match => counts.matches += 1,
                Verdict::Mismatch(_) => {
                    counts.mismatches += 1;
                    if result.accepted.is_some() {
                        counts.accepted += 1;
                    }
                }
                Verdict::Error(_) => counts.errors += 1,
            }
        }
        counts
    }

    /// Mismatching entries in key order
    pub fn mismatches(&self) -> impl Iterator<Item = &EntryResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Mismatch(_)))
    }

    /// Errored entries in key order
    pub fn errors(&self) -> impl Iterator<Item = &EntryResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Error(_)))
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.interrupted || self.results.iter().any(EntryResult::is_failure) {
            EXIT_FAILURES
        } else {
            EXIT_OK
        }
    }
}
