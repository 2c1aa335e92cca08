//! Output normalization
//!
//! Strips differences that say nothing about tool behavior: where the
//! descriptor lives on disk, where the tool's scratch directory was, when it
//! ran, and the order of diagnostics that tools emit in no particular order.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::common::config::NormalizeConfig;

/// Paths that appear in tool output and must not affect the comparison
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
    /// The descriptor file passed to the tool
    pub input: &'a Path,
    /// The scratch directory the tool ran in
    pub scratch: Option<&'a Path>,
}

/// Normalize captured output according to `rules`
pub fn normalize(text: &str, rules: &NormalizeConfig, paths: PathContext<'_>) -> String {
    let mut text = text.replace("\r\n", "\n");

    if rules.paths {
        text = replace_paths(&text, paths);
    }

    let mut ordered = Vec::new();
    let mut unordered = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if rules
            .ignore_lines_containing
            .iter()
            .any(|needle| !needle.is_empty() && line.contains(needle.as_str()))
        {
            continue;
        }

        let line = if rules.timestamps {
            mask_timestamps(line)
        } else {
            line.to_string()
        };

        let trimmed = line.trim_start();
        if rules
            .unordered_line_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && trimmed.starts_with(prefix.as_str()))
        {
            unordered.push(line);
        } else {
            ordered.push(line);
        }
    }

    unordered.sort();
    ordered.extend(unordered);

    while ordered.last().is_some_and(|l| l.is_empty()) {
        ordered.pop();
    }

    ordered.join("\n")
}

/// Replace input and scratch paths with placeholders, longest first so a
/// directory never eats part of a file path below it
fn replace_paths(text: &str, paths: PathContext<'_>) -> String {
    let mut replacements: Vec<(String, &str)> = vec![(path_str(paths.input), "<INPUT>")];
    if let Some(dir) = paths.input.parent() {
        replacements.push((path_str(dir), "<DIR>"));
    }
    if let Some(scratch) = paths.scratch {
        replacements.push((path_str(scratch), "<TMP>"));
    }
    replacements.retain(|(from, _)| from.len() > 1);
    replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = text.to_string();
    for (from, to) in replacements {
        out = out.replace(&from, to);
    }
    out
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `YYYY-MM-DD` dates and `H:MM:SS[.frac]` times
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>\d{4}-\d{2}-\d{2})|(?P<time>\d{1,2}:\d{2}:\d{2}(?:\.\d+)?)")
        .expect("static timestamp pattern")
});

/// Replace dates and times that are not part of a longer number
fn mask_timestamps(line: &str) -> String {
    TIMESTAMP
        .replace_all(line, |caps: &Captures<'_>| {
            let Some(whole) = caps.get(0) else {
                return String::new();
            };
            let digit_before = line[..whole.start()].chars().next_back().is_some_and(|c| c.is_ascii_digit());
            let digit_after = line[whole.end()..].chars().next().is_some_and(|c| c.is_ascii_digit());
            if digit_before || digit_after {
                whole.as_str().to_string()
            } else if caps.name("date").is_some() {
                "<DATE>".to_string()
            } else {
                "<TIME>".to_string()
            }
        })
        .into_owned()
}
