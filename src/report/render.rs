//! Human-readable run report

use std::fmt;

use colored::Colorize;

use super::{EntryResult, RunSummary};

/// Render the final report
pub fn render(summary: &RunSummary) -> String {
    Report(summary).to_string()
}

/// The final report of a run
///
/// Counts come first, then every non-matching entry in key order with
/// enough detail to reproduce it, then corpus issues.
pub struct Report<'a>(pub &'a RunSummary);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        let counts = summary.counts();

        let line = format!(
            "{} total, {} match, {} mismatch, {} error",
            counts.total, counts.matches, counts.mismatches, counts.errors
        );
        let line = if summary.exit_code() == super::EXIT_OK {
            line.green().bold()
        } else {
            line.red().bold()
        };
        writeln!(f, "{} {}", "Summary:".blue().bold(), line)?;

        if counts.accepted > 0 {
            writeln!(f, "  {} of the mismatches are accepted differences", counts.accepted)?;
        }
        let issues = summary.issues();
        if !issues.is_empty() {
            let noun = if issues.len() == 1 { "directory" } else { "directories" };
            writeln!(f, "  {} corpus {} skipped", issues.len(), noun)?;
        }
        if summary.interrupted() {
            writeln!(
                f,
                "  {} after {} of {} entries",
                "Run interrupted".yellow().bold(),
                counts.processed,
                counts.total
            )?;
        }

        let unaccepted: Vec<&EntryResult> = summary.mismatches().filter(|r| r.accepted.is_none()).collect();
        if !unaccepted.is_empty() {
            writeln!(f, "\n{}", "Mismatches:".red().bold())?;
            for result in unaccepted {
                write_entry(f, "✗".red(), result)?;
            }
        }

        let errors: Vec<&EntryResult> = summary.errors().collect();
        if !errors.is_empty() {
            writeln!(f, "\n{}", "Errors:".yellow().bold())?;
            for result in errors {
                write_entry(f, "!".yellow(), result)?;
            }
        }

        let accepted: Vec<&EntryResult> = summary.mismatches().filter(|r| r.accepted.is_some()).collect();
        if !accepted.is_empty() {
            writeln!(f, "\n{}", "Accepted mismatches:".cyan())?;
            for result in accepted {
                write_entry(f, "~".cyan(), result)?;
                if let Some(reason) = &result.accepted {
                    writeln!(f, "      accepted: {}", reason.dimmed())?;
                }
            }
        }

        if !issues.is_empty() {
            writeln!(f, "\n{}", "Corpus issues:".cyan())?;
            for issue in issues {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

fn write_entry(f: &mut fmt::Formatter<'_>, marker: impl fmt::Display, result: &EntryResult) -> fmt::Result {
    writeln!(
        f,
        "  {} {}  {}",
        marker,
        result.entry.key.to_string().bold(),
        result.entry.path.display().to_string().dimmed()
    )?;
    if let Some(detail) = result.verdict.detail() {
        writeln!(f, "      {}", detail)?;
    }
    writeln!(
        f,
        "      baseline: {} in {:.2}s, modified: {} in {:.2}s",
        result.baseline.status,
        result.baseline.duration.as_secs_f64(),
        result.modified.status,
        result.modified.duration.as_secs_f64()
    )?;
    if let Some(dir) = &result.output_dir {
        writeln!(f, "      output kept in {}", dir.display())?;
    }
    Ok(())
}
