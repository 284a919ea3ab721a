//! pcheck library interface
//!
//! Validates network-element configuration dumps against per-vendor rule
//! catalogs. Exposes the catalog, compiler and pipeline for the binary and
//! for integration testing.

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod pipeline;

pub use crate::catalog::{load_catalog, Operator, RuleCatalog, ValidationRule};
pub use crate::compiler::{compile, CompiledQueries, Dialect};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::pipeline::{run, FileReport, GroupReport, RunOptions, RunReport};
