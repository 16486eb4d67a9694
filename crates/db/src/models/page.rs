//! Page entity model and DTOs.

use serde::{Deserialize, Serialize};
use slate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `pages` table.
///
/// `status` is one of the constants in [`slate_core::pages`] (`draft` or
/// `published`). At most one published page carries `is_home = true`; that
/// invariant is enforced by [`PageRepo::set_home`], not by the store.
///
/// [`PageRepo::set_home`]: crate::repositories::PageRepo::set_home
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: Option<String>,
    pub status: String,
    pub is_home: bool,
    pub category_id: Option<DbId>,
    pub author_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    /// Whether the page carries everything a version snapshot needs.
    ///
    /// A page missing its title or content indicates a caller bug, not a
    /// data problem; snapshotting such a page is skipped rather than allowed
    /// to fail the surrounding mutation.
    pub fn is_snapshotable(&self) -> bool {
        self.id > 0 && !self.title.trim().is_empty() && !self.content.is_empty()
    }
}

/// DTO for creating a new page.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePage {
    pub title: String,
    /// Generated from the title when absent.
    pub slug: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    /// Defaults to `draft`.
    pub status: Option<String>,
    pub category_id: Option<DbId>,
    pub author_id: DbId,
}

/// DTO for updating a page. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePage {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub category_id: Option<DbId>,
    /// Recorded on the snapshot version the edit produces.
    pub change_summary: Option<String>,
}
