//! Error types shared by the pcheck crates
//!
//! Missing inputs get their own variants so callers can tell "the file is
//! not there" apart from "the file could not be read".

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unparsable or settings inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dump, rule store or artifact path that is not a file
    #[error("Database file not found: {}", .0.display())]
    DatabaseMissing(PathBuf),

    /// The rule store has no table for a group, e.g. `Nokia_4G`
    #[error("Rule set {0} not found in rule store")]
    RuleSetMissing(String),

    /// A rule-store row that cannot form a validation rule
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Unparsable vendor, technology, group or flag name
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DatabaseMissing(_) | Error::RuleSetMissing(_))
    }
}
