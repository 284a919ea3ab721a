//! # pcheck Common Library
//!
//! Shared code for the parameter-check workspace:
//! - Error types
//! - Bootstrap configuration loading and path resolution
//! - Vendor/technology group model, dump files and result rows
//! - SQLite connection helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{DumpFile, Flag, Group, ResultRow, Technology, Vendor};
