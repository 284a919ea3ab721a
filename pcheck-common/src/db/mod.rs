//! SQLite access helpers
//!
//! Every dump file, the rule store and every output artifact is its own
//! SQLite database. Callers get a dedicated connection per file; connections
//! are never pooled or shared between files.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::Path;
use std::time::Duration;

mod tables;
pub use tables::{list_tables, table_exists};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a database in read-only mode. The file must already exist.
pub async fn connect_readonly(db_path: &Path) -> Result<SqliteConnection> {
    if !db_path.is_file() {
        return Err(Error::DatabaseMissing(db_path.to_path_buf()));
    }

    tracing::debug!("Opening {} (read-only)", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(BUSY_TIMEOUT);

    Ok(SqliteConnection::connect_with(&options).await?)
}

/// Open an existing database for writing. Never creates the file.
pub async fn connect_readwrite(db_path: &Path) -> Result<SqliteConnection> {
    if !db_path.is_file() {
        return Err(Error::DatabaseMissing(db_path.to_path_buf()));
    }

    tracing::debug!("Opening {} (read-write)", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(false)
        .busy_timeout(BUSY_TIMEOUT);

    Ok(SqliteConnection::connect_with(&options).await?)
}

/// Quote an identifier for SQLite (`"name"`, embedded quotes doubled)
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("CellId"), "\"CellId\"");
        assert_eq!(quote_identifier("Cell Name"), "\"Cell Name\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[tokio::test]
    async fn test_connect_missing_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.db");

        let err = connect_readonly(&missing).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseMissing(_)));

        let err = connect_readwrite(&missing).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseMissing(_)));
        assert!(!missing.exists(), "Write connection must not create the file");
    }
}
