//! Table listing queries

use crate::Result;
use sqlx::sqlite::SqliteConnection;

/// List user tables in alphabetical order, excluding SQLite internal tables
pub async fn list_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let tables = sqlx::query_scalar::<_, String>(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
          AND name NOT LIKE 'sqlite_%'
        ORDER BY name ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(tables)
}

/// Check whether a table exists (case-insensitive, as SQLite resolves names)
pub async fn table_exists(conn: &mut SqliteConnection, table_name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
    )
    .bind(table_name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    #[tokio::test]
    async fn test_list_tables_sorted_and_filtered() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        for ddl in [
            "CREATE TABLE zeta (a TEXT)",
            "CREATE TABLE alpha (a TEXT)",
            "CREATE TABLE mid (id INTEGER PRIMARY KEY AUTOINCREMENT)",
        ] {
            sqlx::query(ddl).execute(&mut conn).await.unwrap();
        }

        let tables = list_tables(&mut conn).await.unwrap();
        // AUTOINCREMENT creates sqlite_sequence, which must be hidden
        assert_eq!(tables, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_table_exists_ignores_case() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE Huawei_2G (a TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();

        assert!(table_exists(&mut conn, "Huawei_2G").await.unwrap());
        assert!(table_exists(&mut conn, "huawei_2g").await.unwrap());
        assert!(!table_exists(&mut conn, "Nokia_2G").await.unwrap());
    }
}
