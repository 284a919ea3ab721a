//! Rule-to-query compiler
//!
//! Pure translation of a rule catalog into one validation query per table.
//! Every rule becomes one SELECT producing the projected attribute columns
//! followed by `Parameter`, `CurrentValue`, `ProposedValue` and `Flag`.
//! The SELECTs of one table are combined with `UNION ALL`.
//!
//! Compilation never fails. Rules whose proposed value cannot be interpreted
//! for their operator compile to a check that always reports `Match`.

mod dialect;
mod operators;

pub use dialect::Dialect;
pub use operators::{BetweenRange, MultiList};

use crate::catalog::{RuleCatalog, ValidationRule};
use operators::{compile_check, CheckContext, FlagRule};
use pcheck_common::{Flag, Group};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const PARAMETER_COLUMN: &str = "Parameter";
pub const CURRENT_VALUE_COLUMN: &str = "CurrentValue";
pub const PROPOSED_VALUE_COLUMN: &str = "ProposedValue";

/// Compiled validation queries of one group, keyed by source table.
///
/// Built once before fan-out and shared read-only by every file worker.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQueries {
    group: Group,
    dialect: Dialect,
    queries: BTreeMap<String, String>,
}

impl CompiledQueries {
    pub fn group(&self) -> Group {
        self.group
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get(&self, table: &str) -> Option<&str> {
        self.queries.get(table).map(String::as_str)
    }

    /// Tables and their queries in table-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries.iter().map(|(t, q)| (t.as_str(), q.as_str()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Compile every rule of the catalog
pub fn compile(catalog: &RuleCatalog, dialect: Dialect) -> CompiledQueries {
    let queries: BTreeMap<String, String> = catalog
        .tables()
        .map(|(table, rules)| (table.to_string(), compile_table(rules, dialect)))
        .collect();

    debug!(
        group = %catalog.group(),
        dialect = %dialect,
        tables = queries.len(),
        "Compiled validation queries"
    );

    CompiledQueries {
        group: catalog.group(),
        dialect,
        queries,
    }
}

/// Union of the checks of all rules targeting one table
pub fn compile_table(rules: &[ValidationRule], dialect: Dialect) -> String {
    rules
        .iter()
        .map(|rule| compile_rule(rule, dialect))
        .collect::<Vec<_>>()
        .join("\nUNION ALL\n")
}

/// Compile a single rule into one SELECT
pub fn compile_rule(rule: &ValidationRule, dialect: Dialect) -> String {
    let d = dialect;
    let param = d.quote_ident(&rule.param_name);
    let current = d.iif(
        &format!("{} IS NULL", param),
        &d.literal(""),
        &d.to_text(&param),
    );
    let projection = rule
        .attribute_columns
        .iter()
        .map(|column| d.quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let table = d.quote_ident(&rule.table);
    let parameter = d.literal(&rule.param_name);

    let check = compile_check(
        rule,
        &CheckContext {
            dialect,
            param: &param,
            current: &current,
        },
    );

    match check.flag {
        FlagRule::TextEquality => {
            let flag = d.iif(
                &format!("sub.{} = sub.{}", CURRENT_VALUE_COLUMN, PROPOSED_VALUE_COLUMN),
                &d.literal(Flag::Match.as_str()),
                &d.literal(Flag::NotMatched.as_str()),
            );
            format!(
                "SELECT sub.*, {flag} AS {flag_col}\n\
                 FROM (\n    \
                 SELECT {projection}, {parameter} AS {param_col}, {current} AS {current_col}, {proposed} AS {proposed_col}\n    \
                 FROM {table}\n\
                 ) AS sub",
                flag = flag,
                flag_col = Flag::COLUMN,
                projection = projection,
                parameter = parameter,
                param_col = PARAMETER_COLUMN,
                current = current,
                current_col = CURRENT_VALUE_COLUMN,
                proposed = check.proposed,
                proposed_col = PROPOSED_VALUE_COLUMN,
                table = table,
            )
        }
        FlagRule::Direct(flag) => format!(
            "SELECT {projection}, {parameter} AS {param_col}, {current} AS {current_col}, {proposed} AS {proposed_col},\n       \
             {flag} AS {flag_col}\n\
             FROM {table}",
            projection = projection,
            parameter = parameter,
            param_col = PARAMETER_COLUMN,
            current = current,
            current_col = CURRENT_VALUE_COLUMN,
            proposed = check.proposed,
            proposed_col = PROPOSED_VALUE_COLUMN,
            flag = flag,
            flag_col = Flag::COLUMN,
            table = table,
        ),
    }
}
