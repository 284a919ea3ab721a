//! Per-operator check compilation
//!
//! Each operator resolves to a proposed-value expression plus the way the
//! flag is decided. Malformed proposed values never fail compilation: they
//! fall back to the pass-through check, which always yields `Match`.

use super::dialect::Dialect;
use crate::catalog::{Operator, ValidationRule};
use pcheck_common::Flag;

/// Separator between the bounds of a Between rule
const RANGE_SEPARATOR: &str = "to";

/// Separator between the values of a Multi rule
const MULTI_SEPARATOR: char = '&';

/// How the `Flag` column is computed for a compiled check
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FlagRule {
    /// `Match` iff CurrentValue and ProposedValue are equal text
    TextEquality,
    /// `Flag` is this expression, independent of the displayed values
    Direct(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Check {
    pub proposed: String,
    pub flag: FlagRule,
}

/// Inputs shared by every operator
pub(crate) struct CheckContext<'a> {
    pub dialect: Dialect,
    /// Quoted parameter column
    pub param: &'a str,
    /// Null-safe text of the parameter column
    pub current: &'a str,
}

pub(crate) fn compile_check(rule: &ValidationRule, ctx: &CheckContext<'_>) -> Check {
    match rule.operator {
        Operator::Equals => compile_equals(&rule.proposed_value, ctx),
        Operator::Between => compile_between(&rule.proposed_value, ctx),
        Operator::Multi => compile_multi(&rule.proposed_value, ctx),
        Operator::Default => pass_through(ctx),
    }
}

/// Proposed = current, so the flag is always `Match`
fn pass_through(ctx: &CheckContext<'_>) -> Check {
    Check {
        proposed: ctx.current.to_string(),
        flag: FlagRule::TextEquality,
    }
}

fn compile_equals(proposed: &str, ctx: &CheckContext<'_>) -> Check {
    if proposed.is_empty() {
        return pass_through(ctx);
    }
    Check {
        proposed: ctx.dialect.literal(proposed),
        flag: FlagRule::TextEquality,
    }
}

fn compile_between(proposed: &str, ctx: &CheckContext<'_>) -> Check {
    let Some(range) = BetweenRange::parse(proposed) else {
        return pass_through(ctx);
    };

    let d = ctx.dialect;
    let condition = format!(
        "{} BETWEEN {} AND {}",
        d.to_number(&d.to_text(ctx.param)),
        range.lower,
        range.upper
    );
    // In range: show the current value so the equality flag says Match.
    // Out of range: show the raw range text so it says NotMatched.
    Check {
        proposed: d.iif(&condition, &d.to_text(ctx.param), &d.literal(proposed)),
        flag: FlagRule::TextEquality,
    }
}

fn compile_multi(proposed: &str, ctx: &CheckContext<'_>) -> Check {
    let Some(list) = MultiList::parse(proposed) else {
        return pass_through(ctx);
    };

    let d = ctx.dialect;
    let comma = d.literal(",");
    let found = format!(
        "{} > 0",
        d.instr(
            &d.literal(&list.bounded()),
            &d.concat(&[&comma, ctx.current, &comma]),
        )
    );
    Check {
        proposed: d.literal(proposed),
        flag: FlagRule::Direct(d.iif(
            &found,
            &d.literal(Flag::Match.as_str()),
            &d.literal(Flag::NotMatched.as_str()),
        )),
    }
}

/// Bounds of a `"<lower> to <upper>"` range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetweenRange {
    pub lower: String,
    pub upper: String,
}

impl BetweenRange {
    /// `None` unless splitting on `to` yields exactly two finite numbers
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(RANGE_SEPARATOR).map(str::trim).collect();
        let [lower, upper] = parts.as_slice() else {
            return None;
        };
        if !is_finite_number(lower) || !is_finite_number(upper) {
            return None;
        }
        Some(Self {
            lower: lower.to_string(),
            upper: upper.to_string(),
        })
    }
}

fn is_finite_number(text: &str) -> bool {
    // Only plain decimal notation is spliced into SQL
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && text.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// Values of a `"v1 & v2 & v3"` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiList {
    pub items: Vec<String>,
}

impl MultiList {
    /// `None` when the list holds no values
    pub fn parse(raw: &str) -> Option<Self> {
        let items: Vec<String> = raw
            .split(MULTI_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(Self { items })
        }
    }

    /// Comma-joined list with leading and trailing commas, so that a
    /// `,value,` search only matches whole tokens
    pub fn bounded(&self) -> String {
        format!(",{},", self.items.join(","))
    }
}
