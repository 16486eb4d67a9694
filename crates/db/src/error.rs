//! Repository-level error taxonomy.
//!
//! Single-statement CRUD methods return `sqlx::Error` directly; operations
//! that enforce invariants (restore, parent assignment, batch reorder,
//! guarded delete) return [`RepoError`] so callers can distinguish validation
//! failures from storage failures. Validation variants are always detected
//! before any mutation and are never retried; `Storage` during a multi-step
//! atomic sequence means the whole transaction was rolled back.

use slate_core::error::CoreError;
use slate_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("version {version_number} of page {page_id} not found")]
    VersionNotFound { page_id: DbId, version_number: i32 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("assigning parent {parent_id} to node {node_id} would create a cycle")]
    Cycle { node_id: DbId, parent_id: DbId },

    #[error("parent namespace '{parent_kind}' does not match node namespace '{node_kind}'")]
    NamespaceMismatch {
        node_kind: String,
        parent_kind: String,
    },

    #[error("slug '{slug}' already exists in this scope")]
    UniquenessConflict { slug: String },

    #[error("node {id} still has children")]
    HasChildren { id: DbId },

    #[error("node {id} is referenced by existing content")]
    InUse { id: DbId },

    #[error("page {page_id} is missing the fields required for a snapshot")]
    PageIncomplete { page_id: DbId },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

/// Whether `err` is a PostgreSQL unique-constraint violation (code 23505)
/// on the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
