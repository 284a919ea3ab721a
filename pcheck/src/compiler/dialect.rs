//! SQL dialects the compiler can render
//!
//! The pipeline executes the SQLite rendering. The Access rendering spells the
//! same expressions with the legacy engine's functions (`CSTR`, `Val`, `&`)
//! so that compiled checks can be reviewed or replayed there.

use pcheck_common::db::quote_identifier;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Access,
}

impl Dialect {
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Dialect::Sqlite => quote_identifier(name),
            Dialect::Access => format!("[{}]", name),
        }
    }

    /// String literal with embedded quote characters doubled
    pub fn literal(&self, value: &str) -> String {
        match self {
            Dialect::Sqlite => format!("'{}'", value.replace('\'', "''")),
            Dialect::Access => format!("\"{}\"", value.replace('"', "\"\"")),
        }
    }

    pub fn to_text(&self, expr: &str) -> String {
        match self {
            Dialect::Sqlite => format!("CAST({} AS TEXT)", expr),
            Dialect::Access => format!("CSTR({})", expr),
        }
    }

    /// Leading-numeric-prefix conversion; non-numeric text becomes 0
    pub fn to_number(&self, expr: &str) -> String {
        match self {
            Dialect::Sqlite => format!("CAST({} AS REAL)", expr),
            Dialect::Access => format!("Val({})", expr),
        }
    }

    pub fn concat(&self, parts: &[&str]) -> String {
        let operator = match self {
            Dialect::Sqlite => " || ",
            Dialect::Access => " & ",
        };
        parts.join(operator)
    }

    pub fn iif(&self, condition: &str, then: &str, otherwise: &str) -> String {
        format!("IIF({}, {}, {})", condition, then, otherwise)
    }

    /// 1-based position of `needle` in `haystack`, 0 when absent
    pub fn instr(&self, haystack: &str, needle: &str) -> String {
        format!("INSTR({}, {})", haystack, needle)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => f.write_str("sqlite"),
            Dialect::Access => f.write_str("access"),
        }
    }
}
