//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// The two tools being compared
    #[serde(default)]
    pub tools: Tools,

    /// Corpus discovery settings
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Worker pool and verdict settings
    #[serde(default)]
    pub run: RunConfig,

    /// Which streams are compared and how
    #[serde(default)]
    pub compare: CompareConfig,

    /// Output normalization rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Known differences that do not fail the run
    #[serde(default)]
    pub accepted: Vec<AcceptedDifference>,
}

/// Baseline and modified tool definitions
#[derive(Debug, Deserialize, Default)]
pub struct Tools {
    pub baseline: Option<ToolConfig>,
    pub modified: Option<ToolConfig>,
}

/// Configuration for one external tool
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Path or bare name of the executable
    pub path: PathBuf,

    /// Arguments placed before the descriptor path
    #[serde(default)]
    pub args: Vec<String>,
}

/// Corpus discovery settings
#[derive(Debug, Deserialize)]
pub struct CorpusConfig {
    /// Extension of descriptor files, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "svd".to_string()
}

/// How to classify an entry where both tools exit with an unexpected code
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BothFailPolicy {
    /// Identical failures (same exit code, same normalized output) match
    #[default]
    Match,
    /// Any failure of both tools is an error
    Error,
}

/// Worker pool and verdict settings
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Number of parallel workers (default: available parallelism)
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Classification when both tools fail
    #[serde(default)]
    pub both_fail: BothFailPolicy,

    /// Exit codes that count as a successful run of a tool
    #[serde(default = "default_expected_exit_codes")]
    pub expected_exit_codes: Vec<i32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: None,
            timeout_secs: default_timeout(),
            both_fail: BothFailPolicy::default(),
            expected_exit_codes: default_expected_exit_codes(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_expected_exit_codes() -> Vec<i32> {
    vec![0]
}

/// Which streams are compared and how
#[derive(Debug, Deserialize, Clone)]
pub struct CompareConfig {
    /// Compare stderr in addition to stdout
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Compare stdout structurally when both sides are valid JSON
    #[serde(default)]
    pub json: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            stderr: true,
            json: false,
        }
    }
}

/// Output normalization rules
#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    /// Replace input and temp paths with placeholders
    #[serde(default = "default_true")]
    pub paths: bool,

    /// Replace dates and wall-clock times with placeholders
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Drop every line containing one of these substrings
    #[serde(default)]
    pub ignore_lines_containing: Vec<String>,

    /// Lines starting with one of these prefixes are compared as a sorted set
    #[serde(default)]
    pub unordered_line_prefixes: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            paths: true,
            timestamps: true,
            ignore_lines_containing: Vec::new(),
            unordered_line_prefixes: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A known difference for one corpus entry
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AcceptedDifference {
    pub vendor: String,
    pub name: String,
    pub version: String,
    /// Descriptor file stem; any descriptor of the entry when absent
    #[serde(default)]
    pub descriptor: Option<String>,
    /// Why the difference is accepted
    #[serde(default)]
    pub reason: Option<String>,
}

impl AcceptedDifference {
    /// Check whether this accepted difference covers the given entry
    pub fn matches(&self, vendor: &str, name: &str, version: &str, descriptor: &str) -> bool {
        self.vendor == vendor
            && self.name == name
            && self.version == version
            && self.descriptor.as_deref().map_or(true, |d| d == descriptor)
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and defaults are returned otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.run.jobs == Some(0) {
            return Err(Error::Config("run.jobs must be at least 1".to_string()));
        }
        if self.run.timeout_secs == 0 {
            return Err(Error::Config("run.timeout_secs must be at least 1".to_string()));
        }
        if self.run.expected_exit_codes.is_empty() {
            return Err(Error::Config(
                "run.expected_exit_codes must list at least one code".to_string(),
            ));
        }
        if self.corpus.extension.is_empty() || self.corpus.extension.starts_with('.') {
            return Err(Error::Config(format!(
                "corpus.extension must be a bare extension like \"svd\", got {:?}",
                self.corpus.extension
            )));
        }
        Ok(())
    }

    /// Resolve the tool for `role`, preferring a command-line override
    ///
    /// Bare names are looked up on PATH. A tool that cannot be found is
    /// still returned as given; launching it then fails per entry.
    pub fn resolve_tool(&self, role: &str, override_path: Option<PathBuf>) -> Result<ToolConfig> {
        let configured = match role {
            "baseline" => self.tools.baseline.as_ref(),
            "modified" => self.tools.modified.as_ref(),
            _ => return Err(Error::Internal(format!("unknown tool role '{}'", role))),
        };

        let mut tool = match (override_path, configured) {
            (Some(path), Some(cfg)) => ToolConfig {
                path,
                args: cfg.args.clone(),
            },
            (Some(path), None) => ToolConfig {
                path,
                args: Vec::new(),
            },
            (None, Some(cfg)) => cfg.clone(),
            (None, None) => {
                return Err(Error::ToolNotConfigured {
                    role: role.to_string(),
                })
            }
        };

        // Tools run inside a scratch directory, so relative paths must be
        // anchored to the directory the harness was started from
        match which::which(&tool.path) {
            Ok(found) => tool.path = std::path::absolute(found)?,
            Err(e) => {
                if tool.path.components().count() > 1 {
                    tool.path = std::path::absolute(&tool.path)?;
                }
                tracing::warn!(
                    "{} tool '{}' not found ({}); every entry will report a launch failure",
                    role,
                    tool.path.display(),
                    e
                );
            }
        }

        Ok(tool)
    }

    /// Number of workers to run
    pub fn jobs(&self) -> usize {
        self.run.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}
