//! Plan Execution Tests
//!
//! End-to-end tests of the bridge against an in-memory authoring project:
//! - Plan scenarios (commit, rollback, read-only, chained results)
//! - Index and rollback invariants
//! - Failure escalation (timeouts, failed cancels, lost connections)
//! - Configuration files

mod common;

mod config_file;
mod failures;
mod invariants;
mod scenarios;
