//! Error types for the validation pipeline
//!
//! Only `CatalogUnavailable` and `TemplateUnavailable` abort a run. The other
//! variants are file-scope: they end processing of one dump file and are
//! recorded in the run report. Table-scope and row-scope failures never
//! surface as errors at all; they are logged and skipped.

use pcheck_common::Group;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rule set missing from or unreadable in the rule store (fatal)
    #[error("Rule catalog unavailable for {group}: {source}")]
    CatalogUnavailable {
        group: Group,
        #[source]
        source: pcheck_common::Error,
    },

    /// Output template missing or not a file (fatal)
    #[error("Output template unavailable: {0}")]
    TemplateUnavailable(PathBuf),

    /// Dump file could not be opened
    #[error("Failed to open dump {path}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: pcheck_common::Error,
    },

    /// Cloning the template into the output artifact failed
    #[error("Failed to create output artifact {path}: {source}")]
    ArtifactCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cloned artifact could not be opened for writing
    #[error("Failed to open output artifact {path}: {source}")]
    ArtifactOpen {
        path: PathBuf,
        #[source]
        source: pcheck_common::Error,
    },
}

impl PipelineError {
    /// Whether this error aborts the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::CatalogUnavailable { .. } | PipelineError::TemplateUnavailable(_)
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
