//! Per-file processing
//!
//! Runs every compiled query against one dump file, clones the output
//! template into the file's artifact and materializes the collected rows.
//! Queries run before the artifact exists, so a file whose every query fails
//! still gets an (empty) artifact.

use super::materializer::materialize;
use crate::compiler::CompiledQueries;
use crate::error::{PipelineError, PipelineResult};
use pcheck_common::db::{connect_readonly, connect_readwrite};
use pcheck_common::{DumpFile, ResultRow};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, ValueRef};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a file's artifact goes and what it is cloned from
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub template: PathBuf,
    pub output_dir: PathBuf,
    pub extension: String,
}

impl OutputTarget {
    pub fn artifact_path(&self, dump: &DumpFile) -> PathBuf {
        self.output_dir.join(dump.result_file_name(&self.extension))
    }
}

/// Outcome of one successfully processed dump file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub source: PathBuf,
    pub artifact: PathBuf,
    /// Tables whose query failed against the dump
    pub queries_failed: Vec<String>,
    pub tables_written: usize,
    pub tables_empty: usize,
    /// Tables that could not be created in the artifact
    pub tables_failed: Vec<String>,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Validate one dump file and write its artifact
pub async fn process_file(
    dump: &DumpFile,
    queries: &CompiledQueries,
    target: &OutputTarget,
) -> PipelineResult<FileReport> {
    let mut source = connect_readonly(&dump.path)
        .await
        .map_err(|source| PipelineError::SourceOpen {
            path: dump.path.clone(),
            source,
        })?;

    let (results, queries_failed) = collect_results(&mut source, queries).await;
    if let Err(e) = source.close().await {
        debug!(file = %dump.path.display(), error = %e, "Error closing dump");
    }

    let artifact = target.artifact_path(dump);
    clone_template(&target.template, &artifact).await?;

    let mut output = connect_readwrite(&artifact)
        .await
        .map_err(|source| PipelineError::ArtifactOpen {
            path: artifact.clone(),
            source,
        })?;
    let written = materialize(&mut output, &results).await;
    if let Err(e) = output.close().await {
        warn!(artifact = %artifact.display(), error = %e, "Error closing artifact");
    }

    info!(
        file = %dump.file_name(),
        artifact = %artifact.display(),
        tables = written.tables_written,
        rows = written.rows_written,
        failed_queries = queries_failed.len(),
        "File processed"
    );

    Ok(FileReport {
        source: dump.path.clone(),
        artifact,
        queries_failed,
        tables_written: written.tables_written,
        tables_empty: written.tables_empty,
        tables_failed: written.tables_failed,
        rows_written: written.rows_written,
        rows_skipped: written.rows_skipped,
    })
}

/// Run each table's query; a failing query only loses that table
async fn collect_results(
    conn: &mut SqliteConnection,
    queries: &CompiledQueries,
) -> (BTreeMap<String, Vec<ResultRow>>, Vec<String>) {
    let mut results = BTreeMap::new();
    let mut failed = Vec::new();

    for (table, sql) in queries.iter() {
        match sqlx::query(sql).fetch_all(&mut *conn).await {
            Ok(rows) => {
                debug!(table = %table, rows = rows.len(), "Query executed");
                results.insert(table.to_string(), rows.iter().map(decode_row).collect());
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Validation query failed; table skipped");
                failed.push(table.to_string());
            }
        }
    }

    (results, failed)
}

/// Copy the template into a fresh artifact, overwriting any previous run's
async fn clone_template(template: &Path, artifact: &Path) -> PipelineResult<()> {
    let creation_error = |source: std::io::Error| PipelineError::ArtifactCreation {
        path: artifact.to_path_buf(),
        source,
    };

    if let Some(parent) = artifact.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(creation_error)?;
    }
    tokio::fs::copy(template, artifact)
        .await
        .map_err(creation_error)?;
    Ok(())
}

/// Decode a result row with every cell rendered as text.
///
/// Column order is preserved. NULL becomes the empty string.
pub fn decode_row(row: &SqliteRow) -> ResultRow {
    let mut decoded = ResultRow::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        decoded.push(column.name(), cell_text(row, index));
    }
    decoded
}

fn cell_text(row: &SqliteRow, index: usize) -> String {
    match row.try_get_raw(index) {
        Ok(value) if value.is_null() => String::new(),
        Ok(_) => row
            .try_get::<String, _>(index)
            .or_else(|_| row.try_get::<i64, _>(index).map(|v| v.to_string()))
            .or_else(|_| row.try_get::<f64, _>(index).map(|v| v.to_string()))
            .or_else(|_| {
                row.try_get::<Vec<u8>, _>(index)
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
            })
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}
