//! Test Helper Utilities
//!
//! Shared fixtures for pcheck integration tests

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::{
    artifact_tables, create_database, create_rule_store, create_template, read_table,
    run_sql, Fixture, RuleSpec,
};
