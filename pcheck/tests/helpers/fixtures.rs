//! Database fixtures
//!
//! Dump files, rule stores, templates and artifacts are all SQLite files
//! created on disk inside a `TempDir`.

use anyhow::Result;
use pcheck::pipeline::processor::decode_row;
use pcheck_common::config::{Overrides, Settings, TomlConfig};
use pcheck_common::db::{list_tables, quote_identifier};
use pcheck_common::{DumpFile, Group};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One row of a group's rule table
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub table: &'static str,
    pub param: &'static str,
    pub attributes: &'static str,
    pub operator: &'static str,
    pub proposed: Option<&'static str>,
}

impl RuleSpec {
    pub fn new(
        table: &'static str,
        param: &'static str,
        attributes: &'static str,
        operator: &'static str,
        proposed: &'static str,
    ) -> Self {
        Self {
            table,
            param,
            attributes,
            operator,
            proposed: Some(proposed),
        }
    }
}

async fn open_rwc(path: &Path) -> Result<SqliteConnection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    Ok(SqliteConnection::connect_with(&options).await?)
}

/// Execute statements one by one against a connection
pub async fn run_sql(conn: &mut SqliteConnection, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Create (or extend) a SQLite file by running the given statements
pub async fn create_database(path: &Path, statements: &[&str]) -> Result<()> {
    let mut conn = open_rwc(path).await?;
    run_sql(&mut conn, statements).await?;
    conn.close().await?;
    Ok(())
}

/// Create a rule store holding one rule table per given group
pub async fn create_rule_store(path: &Path, groups: &[(Group, Vec<RuleSpec>)]) -> Result<()> {
    let mut conn = open_rwc(path).await?;
    for (group, rules) in groups {
        let table = quote_identifier(&group.catalog_table());
        sqlx::query(&format!(
            "CREATE TABLE {} (TableName TEXT, ParamName TEXT, AttributeColumn TEXT, \
             DataType TEXT, Operator TEXT, ProposedValue TEXT)",
            table
        ))
        .execute(&mut conn)
        .await?;

        for rule in rules {
            sqlx::query(&format!("INSERT INTO {} VALUES (?, ?, ?, 'string', ?, ?)", table))
                .bind(rule.table)
                .bind(rule.param)
                .bind(rule.attributes)
                .bind(rule.operator)
                .bind(rule.proposed)
                .execute(&mut conn)
                .await?;
        }
    }
    conn.close().await?;
    Ok(())
}

/// Create an output template carrying one table of its own
pub async fn create_template(path: &Path) -> Result<()> {
    create_database(
        path,
        &["CREATE TABLE \"TemplateInfo\" (Version TEXT)", "INSERT INTO \"TemplateInfo\" VALUES ('1')"],
    )
    .await
}

/// User tables of an artifact, sorted
pub async fn artifact_tables(path: &Path) -> Result<Vec<String>> {
    let mut conn = open_rwc(path).await?;
    let tables = list_tables(&mut conn).await?;
    conn.close().await?;
    Ok(tables)
}

/// All rows of a table as (column, text) cells, in rowid order
pub async fn read_table(path: &Path, table: &str) -> Result<Vec<Vec<(String, String)>>> {
    let mut conn = open_rwc(path).await?;
    let rows = sqlx::query(&format!(
        "SELECT * FROM {} ORDER BY rowid",
        quote_identifier(table)
    ))
    .fetch_all(&mut conn)
    .await?;
    conn.close().await?;
    Ok(rows.iter().map(|r| decode_row(r).cells().to_vec()).collect())
}

/// A root folder laid out with the default directory structure
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn rule_store(&self) -> PathBuf {
        self.path().join("dbconfig.db")
    }

    pub fn template(&self) -> PathBuf {
        self.path().join("EMPTY.db")
    }

    pub fn dump_path(&self, group: Group, name: &str) -> PathBuf {
        self.path().join(group.default_dump_dir()).join(name)
    }

    pub fn artifact_path(&self, group: Group, name: &str) -> PathBuf {
        let dump = DumpFile::new(self.dump_path(group, name), group);
        self.path()
            .join(group.default_output_dir())
            .join(dump.result_file_name("db"))
    }

    /// Settings restricted to `groups`, compiled defaults otherwise
    pub fn settings(&self, groups: &[Group], max_workers: usize) -> Result<Settings> {
        Ok(Settings::resolve(
            &TomlConfig::default(),
            &Overrides {
                root_folder: Some(self.path().to_path_buf()),
                max_workers: Some(max_workers),
                groups: groups.to_vec(),
            },
        )?)
    }
}
