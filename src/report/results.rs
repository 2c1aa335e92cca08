//! Machine-readable results file (JSON Lines)
//!
//! One record per entry in key order, then one per corpus issue, then an
//! `interrupted` record if the run was cut short.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{EntryResult, RunSummary, ToolRun};
use crate::common::{Error, Result};
use crate::corpus::CorpusIssue;

/// One line of the results file
#[derive(Debug, Serialize)]
pub struct ResultRecord<'a> {
    pub key: String,
    pub vendor: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub path: &'a Path,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<&'a str>,
    pub baseline: ToolRecord<'a>,
    pub modified: ToolRecord<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<&'a PathBuf>,
}

/// Per-tool part of a result record
#[derive(Debug, Serialize)]
pub struct ToolRecord<'a> {
    pub status: &'a str,
    pub exit_code: Option<i32>,
    pub duration_ms: u128,
}

impl<'a> From<&'a ToolRun> for ToolRecord<'a> {
    fn from(run: &'a ToolRun) -> Self {
        Self {
            status: &run.status,
            exit_code: run.exit_code,
            duration_ms: run.duration.as_millis(),
        }
    }
}

impl<'a> From<&'a EntryResult> for ResultRecord<'a> {
    fn from(result: &'a EntryResult) -> Self {
        let key = &result.entry.key;
        Self {
            key: key.to_string(),
            vendor: &key.vendor,
            name: &key.name,
            version: &key.version,
            path: &result.entry.path,
            verdict: result.verdict.label(),
            detail: result.verdict.detail(),
            accepted: result.accepted.as_deref(),
            baseline: (&result.baseline).into(),
            modified: (&result.modified).into(),
            output_dir: result.output_dir.as_ref(),
        }
    }
}

/// A corpus directory that was skipped
#[derive(Debug, Serialize)]
pub struct IssueRecord<'a> {
    pub verdict: &'static str,
    #[serde(flatten)]
    pub issue: &'a CorpusIssue,
}

/// Trailing marker for a run stopped before every entry was processed
#[derive(Debug, Serialize)]
pub struct InterruptedRecord {
    pub verdict: &'static str,
    pub processed: usize,
    pub total: usize,
}

/// Write the results of a finished run to `path`
pub fn write_results(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            crate::common::paths::ensure_dir(parent).map_err(|e| Error::file_write(parent, e))?;
        }
    }

    let file = std::fs::File::create(path).map_err(|e| Error::file_write(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for result in summary.results() {
        write_record(&mut writer, path, &ResultRecord::from(result))?;
    }
    for issue in summary.issues() {
        let record = IssueRecord {
            verdict: "corpus_issue",
            issue,
        };
        write_record(&mut writer, path, &record)?;
    }
    if summary.interrupted() {
        let counts = summary.counts();
        let record = InterruptedRecord {
            verdict: "interrupted",
            processed: counts.processed,
            total: counts.total,
        };
        write_record(&mut writer, path, &record)?;
    }
    writer.flush().map_err(|e| Error::file_write(path, e))?;

    tracing::info!(
        "Wrote {} result records and {} corpus issues to {}",
        summary.results().len(),
        summary.issues().len(),
        path.display()
    );
    Ok(())
}

fn write_record<W: Write, T: Serialize>(writer: &mut W, path: &Path, record: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n").map_err(|e| Error::file_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Verdict;
    use crate::corpus::IssueKind;
    use crate::report::tests::{mismatch, result};

    fn read_records(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_one_sorted_record_per_entry() {
        let mut summary = RunSummary::new(2, Vec::new());
        summary.record(result("VendorB.ChipY.2_1_0", Verdict::Match));
        summary.record(result("VendorA.ChipX.1_0_0", mismatch()));
        let summary = summary.finish();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("results.jsonl");
        write_results(&path, &summary).unwrap();

        let records = read_records(&path);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["key"], "VendorA.ChipX.1_0_0");
        assert_eq!(records[0]["verdict"], "mismatch");
        assert!(records[0]["detail"]
            .as_str()
            .unwrap()
            .contains("stdout differs at line 3"));
        assert_eq!(records[0]["baseline"]["exit_code"], 0);
        assert_eq!(records[0]["baseline"]["duration_ms"], 12);
        assert_eq!(records[1]["key"], "VendorB.ChipY.2_1_0");
        assert_eq!(records[1]["verdict"], "match");
        assert!(records[1].get("detail").is_none());
    }

    #[test]
    fn test_issues_and_interruption_recorded() {
        let issues = vec![
            CorpusIssue {
                path: PathBuf::from("/corpus/garbage"),
                kind: IssueKind::MalformedName,
            },
            CorpusIssue {
                path: PathBuf::from("/corpus/VendorD.Twice.1_0_0"),
                kind: IssueKind::MultipleDescriptors { count: 2 },
            },
        ];
        let mut summary = RunSummary::new(3, issues);
        summary.record(result("VendorA.ChipX.1_0_0", Verdict::Match));
        summary.mark_interrupted();
        let summary = summary.finish();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("results.jsonl");
        write_results(&path, &summary).unwrap();
        let records = read_records(&path);

        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["verdict"], "match");

        assert_eq!(records[1]["verdict"], "corpus_issue");
        assert_eq!(records[1]["kind"], "malformed_name");
        assert_eq!(records[1]["path"], "/corpus/garbage");
        assert_eq!(records[2]["kind"], "multiple_descriptors");
        assert_eq!(records[2]["count"], 2);

        assert_eq!(records[3]["verdict"], "interrupted");
        assert_eq!(records[3]["processed"], 1);
        assert_eq!(records[3]["total"], 3);
    }

    #[test]
    fn test_complete_run_has_no_interrupted_marker() {
        let mut summary = RunSummary::new(1, Vec::new());
        summary.record(result("VendorA.ChipX.1_0_0", Verdict::Match));
        let summary = summary.finish();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("results.jsonl");
        write_results(&path, &summary).unwrap();

        let records = read_records(&path);
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r["verdict"] != "interrupted"));
    }
}
