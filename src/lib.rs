//! descdiff - differential test harness for descriptor-file tools
//!
//! This library discovers a corpus of descriptor files, runs a baseline and
//! a modified tool on each, and classifies every entry as a match, a
//! mismatch, or an error.

pub mod cli;
pub mod commands;
pub mod common;
pub mod compare;
pub mod corpus;
pub mod invoke;
pub mod report;
pub mod runner;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use compare::Verdict;
pub use corpus::{CorpusEntry, CorpusKey};
