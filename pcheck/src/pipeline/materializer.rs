//! Result materialization into an output artifact
//!
//! Each table with at least one result row is recreated in the artifact with
//! one TEXT column per result column, in the order the first row carries
//! them. Tables without rows are never created.
//!
//! Failures are scoped: a table that cannot be created is skipped, a row that
//! cannot be inserted is skipped. Neither aborts the file.

use pcheck_common::db::quote_identifier;
use pcheck_common::{Result, ResultRow};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of writing one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableWrite {
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Outcome of materializing all tables of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub tables_written: usize,
    pub tables_empty: usize,
    pub tables_failed: Vec<String>,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Write every table's rows into the artifact
pub async fn materialize(
    conn: &mut SqliteConnection,
    results: &BTreeMap<String, Vec<ResultRow>>,
) -> MaterializeReport {
    let mut report = MaterializeReport::default();

    for (table, rows) in results {
        if rows.is_empty() {
            debug!(table = %table, "No result rows; table not created");
            report.tables_empty += 1;
            continue;
        }

        match write_table(conn, table, rows).await {
            Ok(write) => {
                report.tables_written += 1;
                report.rows_written += write.rows_written;
                report.rows_skipped += write.rows_skipped;
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to write result table");
                report.tables_failed.push(table.clone());
            }
        }
    }

    report
}

/// Replace `table` in the artifact with the given rows.
///
/// The column set comes from the first row. Rows lacking any of those
/// columns are skipped. Drop, create and inserts share one transaction, so
/// a table that cannot be created leaves the artifact as it was.
pub async fn write_table(
    conn: &mut SqliteConnection,
    table: &str,
    rows: &[ResultRow],
) -> Result<TableWrite> {
    let Some(first) = rows.first() else {
        return Ok(TableWrite::default());
    };
    let columns: Vec<&str> = first.columns().collect();
    let quoted_table = quote_identifier(table);

    let mut tx = conn.begin().await?;

    // A stale copy from the template is replaced, absence is fine
    if let Err(e) = sqlx::query(&format!("DROP TABLE IF EXISTS {}", quoted_table))
        .execute(&mut *tx)
        .await
    {
        debug!(table = %table, error = %e, "Drop before create failed");
    }

    let column_defs = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ");
    sqlx::query(&format!("CREATE TABLE {} ({})", quoted_table, column_defs))
        .execute(&mut *tx)
        .await?;

    let write = insert_rows(&mut *tx, table, &columns, rows).await;
    tx.commit().await?;

    debug!(
        table = %table,
        rows_written = write.rows_written,
        rows_skipped = write.rows_skipped,
        "Result table written"
    );
    Ok(write)
}

/// Insert rows into an existing table, skipping any row that does not fit
/// `columns` or that SQLite rejects.
async fn insert_rows(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[&str],
    rows: &[ResultRow],
) -> TableWrite {
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let mut write = TableWrite::default();
    for (index, row) in rows.iter().enumerate() {
        let values: Option<Vec<&str>> = columns.iter().map(|c| row.get(c)).collect();
        let Some(values) = values else {
            warn!(
                table = %table,
                row = index,
                "Result row does not match table columns; skipped"
            );
            write.rows_skipped += 1;
            continue;
        };

        let mut query = sqlx::query(&insert_sql);
        for value in values {
            query = query.bind(value);
        }
        match query.execute(&mut *conn).await {
            Ok(_) => write.rows_written += 1,
            Err(e) => {
                warn!(table = %table, row = index, error = %e, "Failed to insert result row");
                write.rows_skipped += 1;
            }
        }
    }
    write
}
