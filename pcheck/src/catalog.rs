//! Rule catalog
//!
//! Loads the validation rules of one vendor/technology group from the rule
//! store. The store holds one table per group (`Huawei_2G`, `Nokia_4G`, ...)
//! with the columns `TableName, ParamName, AttributeColumn, DataType,
//! Operator, ProposedValue`. `AttributeColumn` is a semicolon-separated list.
//!
//! A loaded catalog is never mutated: the compiler borrows it once per run.

use pcheck_common::db::{connect_readonly, quote_identifier, table_exists};
use pcheck_common::{Error, Group, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a rule compares the proposed value against the current attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    /// Exact text equality; an empty proposed value means no constraint
    Equals,
    /// Inclusive numeric range written as `"<lower> to <upper>"`
    Between,
    /// Membership in a list written as `"v1 & v2 & v3"`
    Multi,
    /// Anything else: no constraint is enforced
    Default,
}

impl Operator {
    /// Parse the operator column. Unrecognized values map to `Default`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "equals" | "equal" => Operator::Equals,
            "between" => Operator::Between,
            "multi" => Operator::Multi,
            _ => Operator::Default,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Equals => "Equals",
            Operator::Between => "Between",
            Operator::Multi => "Multi",
            Operator::Default => "Default",
        };
        f.write_str(name)
    }
}

/// One validation rule for one parameter of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRule {
    pub table: String,
    pub param_name: String,
    /// Columns projected alongside the check; never empty
    pub attribute_columns: Vec<String>,
    pub data_type: String,
    pub operator: Operator,
    /// Empty when the store holds NULL
    pub proposed_value: String,
}

impl ValidationRule {
    pub fn new(
        table: impl Into<String>,
        param_name: impl Into<String>,
        attribute_columns: Vec<String>,
        data_type: impl Into<String>,
        operator: Operator,
        proposed_value: impl Into<String>,
    ) -> Result<Self> {
        let table = table.into().trim().to_string();
        let param_name = param_name.into().trim().to_string();
        // Result rows are keyed by column name, so a repeated column is kept once
        let mut columns: Vec<String> = Vec::with_capacity(attribute_columns.len());
        for column in attribute_columns {
            let column = column.trim();
            if !column.is_empty() && !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        let attribute_columns = columns;

        if table.is_empty() {
            return Err(Error::InvalidRule("Rule has no table name".to_string()));
        }
        if param_name.is_empty() {
            return Err(Error::InvalidRule(format!(
                "Rule for table {} has no parameter name",
                table
            )));
        }
        if attribute_columns.is_empty() {
            return Err(Error::InvalidRule(format!(
                "Rule {}.{} has no attribute columns",
                table, param_name
            )));
        }

        Ok(Self {
            table,
            param_name,
            attribute_columns,
            data_type: data_type.into(),
            operator,
            proposed_value: proposed_value.into(),
        })
    }
}

/// Split the `AttributeColumn` cell into trimmed column names
pub fn split_attribute_columns(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Raw row of a rule-store table. Every cell may be NULL after import.
#[derive(Debug, sqlx::FromRow)]
struct RuleRecord {
    #[sqlx(rename = "TableName")]
    table_name: Option<String>,
    #[sqlx(rename = "ParamName")]
    param_name: Option<String>,
    #[sqlx(rename = "AttributeColumn")]
    attribute_column: Option<String>,
    #[sqlx(rename = "DataType")]
    data_type: Option<String>,
    #[sqlx(rename = "Operator")]
    operator: Option<String>,
    #[sqlx(rename = "ProposedValue")]
    proposed_value: Option<String>,
}

impl RuleRecord {
    fn into_rule(self) -> Result<ValidationRule> {
        ValidationRule::new(
            self.table_name.unwrap_or_default(),
            self.param_name.unwrap_or_default(),
            split_attribute_columns(self.attribute_column.as_deref().unwrap_or_default()),
            self.data_type.unwrap_or_default(),
            Operator::parse(self.operator.as_deref().unwrap_or_default()),
            self.proposed_value.unwrap_or_default(),
        )
    }
}

/// Immutable rule set of one group, grouped by target table.
///
/// Tables iterate in name order; rules within a table keep store order.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    group: Group,
    tables: BTreeMap<String, Vec<ValidationRule>>,
}

impl RuleCatalog {
    pub fn from_rules(group: Group, rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        let mut tables: BTreeMap<String, Vec<ValidationRule>> = BTreeMap::new();
        for rule in rules {
            tables.entry(rule.table.clone()).or_default().push(rule);
        }
        Self { group, tables }
    }

    /// Load the group's rules over an open rule-store connection.
    ///
    /// Fails with `RuleSetMissing` when the store has no table for the group.
    /// Rows that cannot form a valid rule are skipped with a warning.
    pub async fn load(conn: &mut SqliteConnection, group: Group) -> Result<Self> {
        let table = group.catalog_table();
        if !table_exists(conn, &table).await? {
            return Err(Error::RuleSetMissing(table));
        }

        let sql = format!(
            "SELECT CAST(TableName AS TEXT) AS TableName, \
                    CAST(ParamName AS TEXT) AS ParamName, \
                    CAST(AttributeColumn AS TEXT) AS AttributeColumn, \
                    CAST(DataType AS TEXT) AS DataType, \
                    CAST(Operator AS TEXT) AS Operator, \
                    CAST(ProposedValue AS TEXT) AS ProposedValue \
             FROM {} ORDER BY rowid",
            quote_identifier(&table)
        );
        let records = sqlx::query_as::<_, RuleRecord>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        let total = records.len();
        let mut rules = Vec::with_capacity(total);
        for (index, record) in records.into_iter().enumerate() {
            match record.into_rule() {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!(group = %group, row = index + 1, "Skipping rule: {}", e),
            }
        }

        let catalog = Self::from_rules(group, rules);
        info!(
            group = %group,
            rules = catalog.rule_count(),
            tables = catalog.table_count(),
            skipped = total - catalog.rule_count(),
            "Rule catalog loaded"
        );
        for (table, rules) in &catalog.tables {
            debug!(group = %group, table = %table, rules = rules.len(), "Catalog table");
        }
        Ok(catalog)
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[ValidationRule])> {
        self.tables.iter().map(|(t, r)| (t.as_str(), r.as_slice()))
    }

    pub fn rules_for(&self, table: &str) -> Option<&[ValidationRule]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn rule_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Open the rule store read-only and load one group's catalog
pub async fn load_catalog(rule_store: &Path, group: Group) -> Result<RuleCatalog> {
    let mut conn = connect_readonly(rule_store).await?;
    RuleCatalog::load(&mut conn, group).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcheck_common::{Technology, Vendor};

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse("="), Operator::Equals);
        assert_eq!(Operator::parse(" Equals "), Operator::Equals);
        assert_eq!(Operator::parse("BETWEEN"), Operator::Between);
        assert_eq!(Operator::parse("Multi"), Operator::Multi);
        assert_eq!(Operator::parse(">="), Operator::Default);
        assert_eq!(Operator::parse(""), Operator::Default);
    }

    #[test]
    fn test_split_attribute_columns() {
        assert_eq!(
            split_attribute_columns(" BSCName; CellId ;;LAC "),
            vec!["BSCName", "CellId", "LAC"]
        );
        assert!(split_attribute_columns(" ; ").is_empty());
    }

    #[test]
    fn test_rule_requires_attribute_columns() {
        let err = ValidationRule::new("CELL", "TxPower", vec![" ".into()], "int", Operator::Equals, "5")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRule(_)));

        let rule = ValidationRule::new(" CELL ", "TxPower", vec!["CellId".into()], "int", Operator::Equals, "5")
            .unwrap();
        assert_eq!(rule.table, "CELL");
    }

    #[test]
    fn test_repeated_attribute_columns_kept_once() {
        let rule = ValidationRule::new(
            "BTS",
            "MODE",
            split_attribute_columns("BTSID; LAC;BTSID ;LAC;CELLID"),
            "",
            Operator::Multi,
            "ON & AUTO",
        )
        .unwrap();
        assert_eq!(rule.attribute_columns, vec!["BTSID", "LAC", "CELLID"]);
    }

    #[test]
    fn test_catalog_groups_by_table_in_order() {
        let rule = |table: &str, param: &str| {
            ValidationRule::new(table, param, vec!["Id".into()], "", Operator::Default, "").unwrap()
        };
        let catalog = RuleCatalog::from_rules(
            Group::new(Vendor::Huawei, Technology::TwoG),
            vec![rule("TRX", "B"), rule("CELL", "X"), rule("TRX", "A")],
        );

        let tables: Vec<&str> = catalog.tables().map(|(t, _)| t).collect();
        assert_eq!(tables, vec!["CELL", "TRX"]);
        let trx: Vec<&str> = catalog
            .rules_for("TRX")
            .unwrap()
            .iter()
            .map(|r| r.param_name.as_str())
            .collect();
        assert_eq!(trx, vec!["B", "A"]);
        assert_eq!(catalog.rule_count(), 3);
    }
}
