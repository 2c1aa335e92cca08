//! Output comparison and verdict policy
//!
//! Turns the two captured invocations for an entry into a [`Verdict`]:
//! - a timeout, launch failure or signal on either side is an error
//! - both tools succeeding is a match when their normalized output agrees
//! - exactly one tool failing is an error
//! - both tools failing is governed by [`BothFailPolicy`]

mod json;
mod normalize;

use std::fmt;
use std::path::Path;

pub use json::JsonDifference;
pub use normalize::{normalize, PathContext};

use crate::common::config::{BothFailPolicy, CompareConfig, Config, NormalizeConfig};
use crate::common::truncate_for_display;
use crate::invoke::{Invocation, Outcome, ToolRole};

/// Longest rendering of a differing line kept in a report
const MAX_LINE_LEN: usize = 160;

/// Output stream a difference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Where normalized outputs first diverge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub stream: Stream,
    /// `line N` for text comparison, a JSON path for structural comparison
    pub location: String,
    pub baseline: String,
    pub modified: String,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} differs at {}: baseline {:?}, modified {:?}",
            self.stream, self.location, self.baseline, self.modified
        )
    }
}

/// Per-entry classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch(Difference),
    Error(String),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Match => "match",
            Verdict::Mismatch(_) => "mismatch",
            Verdict::Error(_) => "error",
        }
    }

    /// Human-readable detail for non-matching verdicts
    pub fn detail(&self) -> Option<String> {
        match self {
            Verdict::Match => None,
            Verdict::Mismatch(diff) => Some(diff.to_string()),
            Verdict::Error(reason) => Some(reason.clone()),
        }
    }
}

/// Applies normalization and the verdict policy
#[derive(Debug, Clone)]
pub struct Comparator {
    normalize: NormalizeConfig,
    compare: CompareConfig,
    expected_exit_codes: Vec<i32>,
    both_fail: BothFailPolicy,
}

impl Comparator {
    pub fn new(
        normalize: NormalizeConfig,
        compare: CompareConfig,
        expected_exit_codes: Vec<i32>,
        both_fail: BothFailPolicy,
    ) -> Self {
        Self {
            normalize,
            compare,
            expected_exit_codes,
            both_fail,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.normalize.clone(),
            config.compare.clone(),
            config.run.expected_exit_codes.clone(),
            config.run.both_fail,
        )
    }

    /// Classify one entry from its two invocations
    pub fn verdict(&self, input: &Path, baseline: &Invocation, modified: &Invocation) -> Verdict {
        for (role, inv) in [(ToolRole::Baseline, baseline), (ToolRole::Modified, modified)] {
            match &inv.outcome {
                Outcome::LaunchFailed(reason) => {
                    return Verdict::Error(format!("{} tool failed to launch: {}", role, reason))
                }
                Outcome::TimedOut => {
                    return Verdict::Error(format!(
                        "{} tool timed out after {:.1}s",
                        role,
                        inv.duration.as_secs_f64()
                    ))
                }
                Outcome::Completed if inv.exit_code.is_none() => {
                    return Verdict::Error(format!("{} tool was killed by a signal", role))
                }
                Outcome::Completed => {}
            }
        }

        let baseline_ok = self.is_expected(baseline);
        let modified_ok = self.is_expected(modified);

        match (baseline_ok, modified_ok) {
            (true, true) => match self.first_difference(input, baseline, modified) {
                None => Verdict::Match,
                Some(diff) => Verdict::Mismatch(diff),
            },
            (true, false) => Verdict::Error(unexpected_exit(ToolRole::Modified, modified)),
            (false, true) => Verdict::Error(unexpected_exit(ToolRole::Baseline, baseline)),
            (false, false) => self.both_failed(input, baseline, modified),
        }
    }

    fn is_expected(&self, inv: &Invocation) -> bool {
        inv.exit_code
            .is_some_and(|code| self.expected_exit_codes.contains(&code))
    }

    fn both_failed(&self, input: &Path, baseline: &Invocation, modified: &Invocation) -> Verdict {
        let codes = format!(
            "both tools failed (baseline {}, modified {})",
            baseline.status_label(),
            modified.status_label()
        );

        match self.both_fail {
            BothFailPolicy::Error => Verdict::Error(codes),
            BothFailPolicy::Match if baseline.exit_code != modified.exit_code => Verdict::Error(codes),
            BothFailPolicy::Match => match self.first_difference(input, baseline, modified) {
                None => Verdict::Match,
                Some(diff) => Verdict::Error(format!("{}; {}", codes, diff)),
            },
        }
    }

    /// First difference between the normalized outputs, stdout before stderr
    pub fn first_difference(
        &self,
        input: &Path,
        baseline: &Invocation,
        modified: &Invocation,
    ) -> Option<Difference> {
        let norm = |inv: &Invocation, text: &str| {
            normalize(
                text,
                &self.normalize,
                PathContext {
                    input,
                    scratch: inv.scratch_dir.as_deref(),
                },
            )
        };

        let stdout_a = norm(baseline, &baseline.stdout);
        let stdout_b = norm(modified, &modified.stdout);
        if let Some(diff) = self.compare_stdout(&stdout_a, &stdout_b) {
            return Some(diff);
        }

        if self.compare.stderr {
            let stderr_a = norm(baseline, &baseline.stderr);
            let stderr_b = norm(modified, &modified.stderr);
            return first_line_difference(Stream::Stderr, &stderr_a, &stderr_b);
        }

        None
    }

    fn compare_stdout(&self, a: &str, b: &str) -> Option<Difference> {
        if self.compare.json {
            if let (Ok(va), Ok(vb)) = (
                serde_json::from_str::<serde_json::Value>(a),
                serde_json::from_str::<serde_json::Value>(b),
            ) {
                return json::first_difference(&va, &vb).map(|d| Difference {
                    stream: Stream::Stdout,
                    location: d.path,
                    baseline: d.baseline,
                    modified: d.modified,
                });
            }
            tracing::debug!("Output is not JSON on both sides, comparing as text");
        }
        first_line_difference(Stream::Stdout, a, b)
    }
}

fn unexpected_exit(role: ToolRole, inv: &Invocation) -> String {
    format!("unexpected {} from {} tool", inv.status_label(), role)
}

/// First differing line of two normalized texts (1-based)
fn first_line_difference(stream: Stream, a: &str, b: &str) -> Option<Difference> {
    if a == b {
        return None;
    }

    let mut lines_a = a.lines();
    let mut lines_b = b.lines();
    let mut number = 1;
    loop {
        match (lines_a.next(), lines_b.next()) {
            (Some(la), Some(lb)) if la == lb => number += 1,
            (None, None) => {
                // Only reachable when texts differ in ways lines() hides
                return Some(line_difference(stream, number, "<end of output>", "<end of output>"));
            }
            (la, lb) => {
                return Some(line_difference(
                    stream,
                    number,
                    la.unwrap_or("<end of output>"),
                    lb.unwrap_or("<end of output>"),
                ))
            }
        }
    }
}

fn line_difference(stream: Stream, number: usize, a: &str, b: &str) -> Difference {
    Difference {
        stream,
        location: format!("line {}", number),
        baseline: truncate_for_display(a, MAX_LINE_LEN),
        modified: truncate_for_display(b, MAX_LINE_LEN),
    }
}
