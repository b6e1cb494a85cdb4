//! Shared helpers for integration tests that need a real PostgreSQL.
//!
//! Integration tests compile as separate crates, so helpers used by more than
//! one suite live here and are pulled in with `mod support;`.

pub mod cluster_skip;
pub mod embedded_postgres;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::{provision_migrated_database, shared_cluster};

/// Render a `postgres` error with its SQLSTATE and detail.
///
/// The `Display` impl collapses server errors to `db error`, which hides the
/// part that explains a failing seed statement.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!("postgres error {:?}: {}", db_error.code(), db_error.message());
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}
