//! Page version entity model.
//!
//! Versions form an append-only log keyed by `(page_id, version_number)`:
//! rows are only ever inserted, never updated or deleted (they disappear
//! solely through the `ON DELETE CASCADE` when their page is removed).

use serde::Serialize;
use slate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `page_versions` table.
///
/// `title` and `content` are a verbatim snapshot of the page at the moment
/// the version was written. Workflow status is deliberately not part of the
/// snapshot: content history and publish state are independent axes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PageVersion {
    pub id: DbId,
    pub page_id: DbId,
    pub version_number: i32,
    pub title: String,
    pub content: String,
    pub author_id: DbId,
    pub change_summary: Option<String>,
    pub created_at: Timestamp,
}
