//! End-to-end tests for the descdiff CLI
//!
//! These tests build a small corpus in a temp directory, write shell-script
//! stand-ins for the baseline and modified tools, run the binary and check
//! the report and exit code.

#![cfg(unix)]

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Test context with paths and cleanup
struct TestContext {
    /// Temporary directory for this test
    temp_dir: PathBuf,
    /// Corpus root
    corpus_dir: PathBuf,
    /// Config directory (XDG_CONFIG_HOME), kept empty unless a test writes to it
    config_dir: PathBuf,
}

struct RunOutput {
    stdout: String,
    stderr: String,
    code: Option<i32>,
}

impl TestContext {
    fn new(test_name: &str) -> Self {
        let temp_dir = env::temp_dir().join("descdiff-tests").join(test_name);

        // Clean up any previous test artifacts
        let _ = fs::remove_dir_all(&temp_dir);
        let corpus_dir = temp_dir.join("corpus");
        let config_dir = temp_dir.join("config");
        fs::create_dir_all(&corpus_dir).expect("Failed to create corpus dir");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            corpus_dir,
            config_dir,
        }
    }

    /// Add `<corpus>/<dir_name>/<file_name>` and return its path
    fn add_entry(&self, dir_name: &str, file_name: &str) -> PathBuf {
        let dir = self.corpus_dir.join(dir_name);
        fs::create_dir_all(&dir).expect("Failed to create entry dir");
        let path = dir.join(file_name);
        fs::write(&path, "<device><name>TEST</name></device>\n").expect("Failed to write descriptor");
        path
    }

    /// Write an executable shell script standing in for a tool
    fn tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.temp_dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write tool script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod tool script");
        path
    }

    /// A tool that prints a stable line derived from the input file name
    fn well_behaved_tool(&self, name: &str) -> PathBuf {
        self.tool(name, r#"echo "parsed $(basename "$1")"
echo "peripherals: 3""#)
    }

    fn run(&self, args: &[&str]) -> RunOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_descdiff"))
            .args(args)
            .arg("--no-progress")
            .arg("--no-color")
            .env("XDG_CONFIG_HOME", &self.config_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run descdiff");

        RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        }
    }

    fn run_tools(&self, baseline: &Path, modified: &Path, extra: &[&str]) -> RunOutput {
        let corpus = self.corpus_dir.to_string_lossy().into_owned();
        let baseline = baseline.to_string_lossy().into_owned();
        let modified = modified.to_string_lossy().into_owned();
        let mut args = vec![
            corpus.as_str(),
            "--baseline",
            baseline.as_str(),
            "--modified",
            modified.as_str(),
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

#[test]
fn test_identical_tools_match() {
    let ctx = TestContext::new("identical_tools_match");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("VendorB.ChipY.2_1_0", "ChipY.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.well_behaved_tool("modified.sh");

    let out = ctx.run_tools(&baseline, &modified, &[]);

    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);
    assert!(out.stdout.contains("2 total, 2 match, 0 mismatch, 0 error"), "{}", out.stdout);
    assert!(!out.stdout.contains("Mismatches:"));
}

#[test]
fn test_extra_diagnostic_is_reported() {
    let ctx = TestContext::new("extra_diagnostic");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("VendorB.ChipY.2_1_0", "ChipY.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.tool(
        "modified.sh",
        r#"echo "parsed $(basename "$1")"
case "$1" in
  *ChipX*) echo "warning: register overlaps" ;;
esac
echo "peripherals: 3""#,
    );

    let out = ctx.run_tools(&baseline, &modified, &[]);

    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("2 total, 1 match, 1 mismatch, 0 error"), "{}", out.stdout);
    assert!(out.stdout.contains("Mismatches:"));
    assert!(out.stdout.contains("VendorA.ChipX.1_0_0"));
    assert!(out.stdout.contains("line 2"), "{}", out.stdout);
    assert!(!out.stdout.contains("VendorB.ChipY.2_1_0"));
}

#[test]
fn test_malformed_directory_is_skipped() {
    let ctx = TestContext::new("malformed_directory");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("garbage", "whatever.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.well_behaved_tool("modified.sh");

    let out = ctx.run_tools(&baseline, &modified, &[]);

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.contains("1 total, 1 match"), "{}", out.stdout);
    assert!(out.stdout.contains("1 corpus directory skipped"));
    assert!(out.stdout.contains("Corpus issues:"));
    assert!(out.stdout.contains("garbage"));
}

#[test]
fn test_hanging_tool_times_out() {
    let ctx = TestContext::new("hanging_tool");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.tool("modified.sh", "sleep 30");

    let started = std::time::Instant::now();
    let out = ctx.run_tools(&baseline, &modified, &["--timeout", "1"]);

    assert!(started.elapsed().as_secs() < 20, "hung tool was not killed");
    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("1 total, 0 match, 0 mismatch, 1 error"), "{}", out.stdout);
    assert!(out.stdout.contains("modified tool timed out"));
}

#[test]
fn test_missing_tool_binary_is_an_entry_error() {
    let ctx = TestContext::new("missing_tool_binary");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.temp_dir.join("does-not-exist");

    let out = ctx.run_tools(&baseline, &modified, &[]);

    assert_eq!(out.code, Some(1));
    assert!(out.stdout.contains("1 error"), "{}", out.stdout);
    assert!(out.stdout.contains("modified tool failed to launch"));
}

#[test]
fn test_missing_root_is_usage_error() {
    let ctx = TestContext::new("missing_root");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let missing = ctx.temp_dir.join("nowhere");
    let baseline = baseline.to_string_lossy().into_owned();
    let missing = missing.to_string_lossy().into_owned();

    let out = ctx.run(&[missing.as_str(), "--baseline", baseline.as_str(), "--modified", baseline.as_str()]);

    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("Error:"), "{}", out.stderr);
    assert!(out.stderr.contains("nowhere"));
}

#[test]
fn test_unconfigured_tool_is_usage_error() {
    let ctx = TestContext::new("unconfigured_tool");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let corpus = ctx.corpus_dir.to_string_lossy().into_owned();
    let baseline = baseline.to_string_lossy().into_owned();

    let out = ctx.run(&[corpus.as_str(), "--baseline", baseline.as_str()]);

    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("modified"), "{}", out.stderr);
}

#[test]
fn test_results_file_has_one_record_per_entry() {
    let ctx = TestContext::new("results_file");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("VendorB.ChipY.2_1_0", "ChipY.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.tool(
        "modified.sh",
        r#"case "$1" in
  *ChipY*) echo "crash" >&2; exit 3 ;;
esac
echo "parsed $(basename "$1")"
echo "peripherals: 3""#,
    );
    let results = ctx.temp_dir.join("out").join("results.jsonl");
    let results_arg = results.to_string_lossy().into_owned();

    let out = ctx.run_tools(&baseline, &modified, &["--results", &results_arg]);
    assert_eq!(out.code, Some(1));

    let content = fs::read_to_string(&results).expect("results file missing");
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("invalid JSON line"))
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["key"], "VendorA.ChipX.1_0_0");
    assert_eq!(records[0]["verdict"], "match");
    assert_eq!(records[1]["key"], "VendorB.ChipY.2_1_0");
    assert_eq!(records[1]["verdict"], "error");
    assert_eq!(records[1]["modified"]["exit_code"], 3);
    assert_eq!(records[1]["baseline"]["exit_code"], 0);
}

#[test]
fn test_accepted_difference_from_config() {
    let ctx = TestContext::new("accepted_difference");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.tool("modified.sh", r#"echo "parsed $(basename "$1") differently""#);

    let config = ctx.temp_dir.join("descdiff.toml");
    fs::write(
        &config,
        r#"
[[accepted]]
vendor = "VendorA"
name = "ChipX"
version = "1_0_0"
reason = "known register naming change"
"#,
    )
    .expect("Failed to write config");
    let config_arg = config.to_string_lossy().into_owned();

    let out = ctx.run_tools(&baseline, &modified, &["-c", &config_arg]);

    assert_eq!(out.code, Some(0), "{}", out.stdout);
    assert!(out.stdout.contains("1 mismatch"));
    assert!(out.stdout.contains("Accepted mismatches:"));
    assert!(out.stdout.contains("known register naming change"));
}

#[test]
fn test_tools_from_config_file() {
    let ctx = TestContext::new("tools_from_config");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.well_behaved_tool("modified.sh");

    let app_config = ctx.config_dir.join("descdiff");
    fs::create_dir_all(&app_config).expect("Failed to create app config dir");
    fs::write(
        app_config.join("config.toml"),
        format!(
            "[tools.baseline]\npath = {:?}\n\n[tools.modified]\npath = {:?}\n",
            baseline.to_string_lossy(),
            modified.to_string_lossy()
        ),
    )
    .expect("Failed to write config");

    let corpus = ctx.corpus_dir.to_string_lossy().into_owned();
    let out = ctx.run(&[corpus.as_str()]);

    assert_eq!(out.code, Some(0), "stdout: {}\nstderr: {}", out.stdout, out.stderr);
    assert!(out.stdout.contains("1 total, 1 match"));
}

#[test]
fn test_list_only_discovers() {
    let ctx = TestContext::new("list_only");
    ctx.add_entry("VendorB.ChipY.2_1_0", "ChipY.svd");
    ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("garbage", "whatever.svd");
    let corpus = ctx.corpus_dir.to_string_lossy().into_owned();

    let out = ctx.run(&[corpus.as_str(), "--list"]);

    assert_eq!(out.code, Some(0), "{}", out.stderr);
    let lines: Vec<&str> = out.stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{}", out.stdout);
    assert!(lines[0].starts_with("VendorA.ChipX.1_0_0\t"));
    assert!(lines[1].starts_with("VendorB.ChipY.2_1_0\t"));
    assert!(lines[2].starts_with("skipped\t"));
}

#[test]
fn test_single_file_root() {
    let ctx = TestContext::new("single_file_root");
    let file = ctx.add_entry("VendorA.ChipX.1_0_0", "ChipX.svd");
    ctx.add_entry("VendorB.ChipY.2_1_0", "ChipY.svd");
    let baseline = ctx.well_behaved_tool("baseline.sh");
    let modified = ctx.well_behaved_tool("modified.sh");
    let file = file.to_string_lossy().into_owned();
    let baseline = baseline.to_string_lossy().into_owned();
    let modified = modified.to_string_lossy().into_owned();

    let out = ctx.run(&[file.as_str(), "--baseline", baseline.as_str(), "--modified", modified.as_str()]);

    assert_eq!(out.code, Some(0), "{}", out.stderr);
    assert!(out.stdout.contains("1 total, 1 match"), "{}", out.stdout);
}
