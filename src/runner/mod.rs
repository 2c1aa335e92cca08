//! Worker pool
//!
//! A bounded number of workers pull corpus entries from a shared queue, run
//! both tools on each, and send the result to a single aggregating consumer
//! that owns the [`RunSummary`]. Cancelling the run aborts the workers, which
//! kills in-flight tools; results already received stay in the summary.

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::common::config::AcceptedDifference;
use crate::common::paths;
use crate::compare::{Comparator, Verdict};
use crate::corpus::{Corpus, CorpusEntry};
use crate::invoke::{Invocation, Invoker, Tool};
use crate::report::{EntryResult, RunSummary};

/// Scheduling options for a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum number of entries processed at once
    pub jobs: usize,
    /// Bound on each single tool invocation
    pub timeout: Duration,
    /// Keep raw tool output under this directory
    pub keep_output: Option<PathBuf>,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

/// Everything a worker needs to process an entry
struct Context<I> {
    invoker: I,
    baseline: Tool,
    modified: Tool,
    comparator: Comparator,
    accepted: Vec<AcceptedDifference>,
    options: RunOptions,
}

/// Runs a corpus through both tools
pub struct Runner<I> {
    ctx: Arc<Context<I>>,
}

impl<I: Invoker + 'static> Runner<I> {
    pub fn new(
        invoker: I,
        baseline: Tool,
        modified: Tool,
        comparator: Comparator,
        accepted: Vec<AcceptedDifference>,
        options: RunOptions,
    ) -> Self {
        Self {
            ctx: Arc::new(Context {
                invoker,
                baseline,
                modified,
                comparator,
                accepted,
                options,
            }),
        }
    }

    /// Process every entry of `corpus`, stopping early if `shutdown` completes
    pub async fn run<F>(&self, corpus: Corpus, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let total = corpus.entries.len();
        let jobs = self.ctx.options.jobs.clamp(1, total.max(1));
        let mut summary = RunSummary::new(total, corpus.issues);

        tracing::info!("Running {} entries with {} workers", total, jobs);

        let queue = Arc::new(Mutex::new(VecDeque::from(corpus.entries)));
        let (tx, mut rx) = mpsc::channel::<EntryResult>(jobs * 2);
        let mut workers = JoinSet::new();

        for worker in 0..jobs {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            workers.spawn(async move {
                while let Some(entry) = next_entry(&queue) {
                    tracing::debug!("Worker {} picked up {}", worker, entry.key);
                    let result = ctx.run_entry(entry).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        // The channel closes once the last worker is done
        drop(tx);

        let progress = self.progress_bar(total);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(result) => {
                        // Keep log lines from tearing the bar
                        progress.suspend(|| log_result(&result));
                        progress.inc(1);
                        summary.record(result);
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    tracing::warn!("Run cancelled, stopping in-flight tools");
                    summary.mark_interrupted();
                    workers.abort_all();
                    break;
                }
            }
        }

        // Keep whatever finished before the cancellation took effect
        rx.close();
        while let Ok(result) = rx.try_recv() {
            progress.suspend(|| log_result(&result));
            summary.record(result);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    tracing::error!("Worker panicked: {}", e);
                }
            }
        }

        progress.finish_and_clear();
        summary.finish()
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.ctx.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {pos}/{len} entries ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

impl<I: Invoker> Context<I> {
    /// Run both tools on one entry and classify the result
    async fn run_entry(&self, entry: CorpusEntry) -> EntryResult {
        let timeout = self.options.timeout;
        let (baseline, modified) = tokio::join!(
            self.invoker.invoke(&self.baseline, &entry.path, timeout),
            self.invoker.invoke(&self.modified, &entry.path, timeout),
        );

        let verdict = self.comparator.verdict(&entry.path, &baseline, &modified);

        let accepted = match verdict {
            Verdict::Mismatch(_) => {
                let key = &entry.key;
                self.accepted
                    .iter()
                    .find(|a| a.matches(&key.vendor, &key.name, &key.version, &entry.descriptor_stem()))
                    .map(|a| {
                        a.reason
                            .clone()
                            .unwrap_or_else(|| "listed as an accepted difference".to_string())
                    })
            }
            _ => None,
        };

        let output_dir = match &self.options.keep_output {
            Some(root) => keep_output(root, &entry, &baseline, &modified).await,
            None => None,
        };

        EntryResult {
            verdict,
            accepted,
            baseline: (&baseline).into(),
            modified: (&modified).into(),
            output_dir,
            entry,
        }
    }
}

fn next_entry(queue: &Mutex<VecDeque<CorpusEntry>>) -> Option<CorpusEntry> {
    // A poisoned queue only means another worker panicked; the data is intact
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    queue.pop_front()
}

fn log_result(result: &EntryResult) {
    match (&result.verdict, &result.accepted) {
        (Verdict::Match, _) => tracing::info!("{}: match", result.entry.key),
        (Verdict::Mismatch(diff), Some(_)) => {
            tracing::info!("{}: accepted mismatch ({})", result.entry.key, diff)
        }
        (Verdict::Mismatch(diff), None) => {
            tracing::warn!("{}: mismatch ({})", result.entry.key, diff)
        }
        (Verdict::Error(reason), _) => tracing::warn!("{}: error ({})", result.entry.key, reason),
    }
}

/// Write raw tool output for later inspection
async fn keep_output(
    root: &Path,
    entry: &CorpusEntry,
    baseline: &Invocation,
    modified: &Invocation,
) -> Option<PathBuf> {
    let dir = paths::entry_output_dir(root, &entry.key.to_string());
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        tracing::warn!("Could not create output directory {}: {}", dir.display(), e);
        return None;
    }

    let files = [
        ("baseline.stdout", &baseline.stdout),
        ("baseline.stderr", &baseline.stderr),
        ("modified.stdout", &modified.stdout),
        ("modified.stderr", &modified.stderr),
    ];
    for (name, content) in files {
        let path = dir.join(name);
        if let Err(e) = tokio::fs::write(&path, content).await {
            tracing::warn!("Could not write {}: {}", path.display(), e);
            return None;
        }
    }

    Some(dir)
}
