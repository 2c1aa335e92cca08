//! Corpus discovery
//!
//! A corpus root holds one directory per device pack, named
//! `<vendor>.<name>.<version>`, each containing exactly one descriptor file.
//! Directories that break this convention are reported as issues and
//! skipped; they never abort the run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::{Error, Result};

/// Composite key identifying a corpus entry
///
/// Ordering is by vendor, then name, then version, which is the order every
/// report lists entries in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorpusKey {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

impl CorpusKey {
    /// Parse a `<vendor>.<name>.<version>` directory name
    ///
    /// Vendor and name may not contain dots; the version is everything after
    /// the second dot and may contain more of them.
    pub fn parse(dir_name: &str) -> Option<Self> {
        let (vendor, rest) = dir_name.split_once('.')?;
        let (name, version) = rest.split_once('.')?;
        if vendor.is_empty() || name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            vendor: vendor.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for CorpusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.vendor, self.name, self.version)
    }
}

/// One descriptor file to run both tools against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub key: CorpusKey,
    pub path: PathBuf,
}

impl CorpusEntry {
    /// File name of the descriptor without its extension
    pub fn descriptor_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Why a directory was not turned into a corpus entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// Directory name is not `<vendor>.<name>.<version>`
    MalformedName,
    /// No file with the descriptor extension
    NoDescriptor,
    /// More than one candidate descriptor file
    MultipleDescriptors { count: usize },
    /// The directory could not be listed
    Unreadable { reason: String },
}

/// A non-fatal discovery diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusIssue {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for CorpusIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            IssueKind::MalformedName => {
                write!(f, "{}: name is not <vendor>.<name>.<version>", path)
            }
            IssueKind::NoDescriptor => write!(f, "{}: no descriptor file", path),
            IssueKind::MultipleDescriptors { count } => {
                write!(f, "{}: {} descriptor files, expected exactly one", path, count)
            }
            IssueKind::Unreadable { reason } => write!(f, "{}: cannot be read ({})", path, reason),
        }
    }
}

/// Result of scanning a corpus root
#[derive(Debug, Default)]
pub struct Corpus {
    /// Entries sorted by key
    pub entries: Vec<CorpusEntry>,
    /// Skipped directories, in directory-name order
    pub issues: Vec<CorpusIssue>,
}

/// Discover corpus entries under `root`
///
/// `root` may also be a single descriptor file whose parent directory follows
/// the naming convention. Fails when the root does not exist or when nothing
/// runnable was found.
pub fn discover(root: &Path, extension: &str) -> Result<Corpus> {
    if !root.exists() {
        return Err(Error::RootNotFound(root.display().to_string()));
    }

    let corpus = if root.is_dir() {
        discover_dir(root, extension)?
    } else {
        discover_single_file(root, extension)?
    };

    for issue in &corpus.issues {
        tracing::warn!("Skipping corpus directory {}", issue);
    }

    if corpus.entries.is_empty() {
        return Err(Error::EmptyCorpus(root.display().to_string()));
    }

    tracing::info!(
        "Discovered {} corpus entries ({} skipped) under {}",
        corpus.entries.len(),
        corpus.issues.len(),
        root.display()
    );

    Ok(corpus)
}

fn discover_dir(root: &Path, extension: &str) -> Result<Corpus> {
    let unreadable = |e: std::io::Error| Error::RootUnreadable {
        path: root.display().to_string(),
        error: e.to_string(),
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        // Hidden directories (.git and friends) are not part of the corpus
        if name.starts_with('.') {
            continue;
        }
        dirs.push((name, path));
    }
    dirs.sort();

    let mut corpus = Corpus::default();
    for (name, path) in dirs {
        let Some(key) = CorpusKey::parse(&name) else {
            corpus.issues.push(CorpusIssue {
                path,
                kind: IssueKind::MalformedName,
            });
            continue;
        };

        let mut candidates = match descriptor_files(&path, extension) {
            Ok(candidates) => candidates,
            Err(e) => {
                corpus.issues.push(CorpusIssue {
                    path,
                    kind: IssueKind::Unreadable {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };
        match candidates.len() {
            0 => corpus.issues.push(CorpusIssue {
                path,
                kind: IssueKind::NoDescriptor,
            }),
            1 => {
                let descriptor = candidates.remove(0);
                tracing::debug!("Corpus entry {} -> {}", key, descriptor.display());
                corpus.entries.push(CorpusEntry {
                    key,
                    path: descriptor,
                });
            }
            count => corpus.issues.push(CorpusIssue {
                path,
                kind: IssueKind::MultipleDescriptors { count },
            }),
        }
    }

    corpus.entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(corpus)
}

fn discover_single_file(file: &Path, extension: &str) -> Result<Corpus> {
    let invalid = || Error::InvalidRoot(file.display().to_string());

    if !has_extension(file, extension) {
        return Err(invalid());
    }

    let path = std::path::absolute(file).map_err(|_| invalid())?;
    let key = path
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| CorpusKey::parse(&name.to_string_lossy()))
        .ok_or_else(invalid)?;

    Ok(Corpus {
        entries: vec![CorpusEntry { key, path }],
        issues: Vec::new(),
    })
}

/// Regular files in `dir` carrying the descriptor extension, sorted by name
fn descriptor_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(std::path::absolute(&path)?);
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
