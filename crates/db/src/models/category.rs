//! Category entity model and DTOs.

use serde::{Deserialize, Serialize};
use slate_core::tree::TreeRow;
use slate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `categories` table.
///
/// `kind` is the namespace key: parent/child links and slug uniqueness are
/// both scoped to one `kind`, so the same slug may recur under a different
/// parent or namespace. The parent graph within a namespace is a forest.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub parent_id: Option<DbId>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TreeRow for Category {
    fn id(&self) -> DbId {
        self.id
    }
    fn parent_id(&self) -> Option<DbId> {
        self.parent_id
    }
    fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

/// DTO for creating a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    /// Generated from the name when absent.
    pub slug: Option<String>,
    pub kind: String,
    pub parent_id: Option<DbId>,
}

/// One move in a batch reorder: reparent and/or reposition a single node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeMove {
    pub id: DbId,
    /// Target parent; `None` moves the node to the root level.
    pub new_parent_id: Option<DbId>,
    pub new_order: i32,
}
