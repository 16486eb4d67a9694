//! Menu item entity model and DTOs.

use serde::{Deserialize, Serialize};
use slate_core::tree::TreeRow;
use slate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `menu_items` table.
///
/// Menu items share a single implicit namespace; the parent graph over the
/// whole table is a forest.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MenuItem {
    pub id: DbId,
    pub title: String,
    pub url: String,
    pub parent_id: Option<DbId>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TreeRow for MenuItem {
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

/// DTO for creating a new menu item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenuItem {
    pub title: String,
    pub url: String,
    pub parent_id: Option<DbId>,
}
