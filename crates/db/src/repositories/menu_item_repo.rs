//! Repository for the `menu_items` table.
//!
//! Menu items form a single-namespace tree: the same forest invariants as
//! categories, minus the namespace key and slug scoping (items are addressed
//! by id and carry a free-form URL).

use std::collections::HashSet;

use slate_core::error::CoreError;
use slate_core::tree::{build_tree, TreeNode};
use slate_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::atomic::run_atomic;
use crate::error::{RepoError, RepoResult};
use crate::models::category::NodeMove;
use crate::models::menu_item::{CreateMenuItem, MenuItem};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, url, parent_id, sort_order, created_at, updated_at";

/// Provides CRUD and reorder operations for menu items.
pub struct MenuItemRepo;

impl MenuItemRepo {
    /// Insert a new menu item, appending it after its siblings.
    pub async fn insert(pool: &PgPool, input: &CreateMenuItem) -> RepoResult<MenuItem> {
        if input.title.trim().is_empty() {
            return Err(CoreError::Validation("Title must not be empty".into()).into());
        }
        if input.url.trim().is_empty() {
            return Err(CoreError::Validation("URL must not be empty".into()).into());
        }

        let input = input.clone();
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                if let Some(parent_id) = input.parent_id {
                    Self::validate_parent_in_tx(&mut *conn, None, parent_id).await?;
                }

                let query = format!(
                    "INSERT INTO menu_items (title, url, parent_id, sort_order)
                     VALUES ($1, $2, $3,
                             COALESCE((SELECT MAX(m.sort_order) FROM menu_items m
                                       WHERE m.parent_id IS NOT DISTINCT FROM $3), 0) + 1)
                     RETURNING {COLUMNS}"
                );
                let item = sqlx::query_as::<_, MenuItem>(&query)
                    .bind(&input.title)
                    .bind(&input.url)
                    .bind(input.parent_id)
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(item)
            })
        })
        .await
    }

    /// Find a menu item by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MenuItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM menu_items WHERE id = $1");
        sqlx::query_as::<_, MenuItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all menu items, siblings ordered by `(sort_order, id)`.
    pub async fn list(pool: &PgPool) -> Result<Vec<MenuItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM menu_items ORDER BY sort_order, id");
        sqlx::query_as::<_, MenuItem>(&query).fetch_all(pool).await
    }

    /// Materialize the menu forest.
    pub async fn tree(pool: &PgPool) -> Result<Vec<TreeNode<MenuItem>>, sqlx::Error> {
        let rows = Self::list(pool).await?;
        Ok(build_tree(rows))
    }

    /// Check whether `candidate_parent_id` is a legal parent for `node_id`,
    /// without mutating anything.
    pub async fn validate_parent(
        pool: &PgPool,
        node_id: Option<DbId>,
        candidate_parent_id: DbId,
    ) -> RepoResult<()> {
        let mut conn = pool.acquire().await.map_err(RepoError::Storage)?;
        Self::validate_parent_in_tx(&mut conn, node_id, candidate_parent_id).await
    }

    /// Apply a batch of reparent/reposition moves in one transaction.
    ///
    /// All-or-nothing: one failing move rolls back the entire batch.
    pub async fn reorder_batch(pool: &PgPool, moves: &[NodeMove]) -> RepoResult<Vec<MenuItem>> {
        let moves = moves.to_vec();
        let updated = run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                let mut updated = Vec::with_capacity(moves.len());
                for mv in &moves {
                    let node = Self::lock_for_update(&mut *conn, mv.id).await?.ok_or(
                        RepoError::NotFound {
                            entity: "menu item",
                            id: mv.id,
                        },
                    )?;
                    if mv.new_parent_id != node.parent_id {
                        if let Some(parent_id) = mv.new_parent_id {
                            Self::validate_parent_in_tx(&mut *conn, Some(mv.id), parent_id)
                                .await?;
                        }
                    }

                    let query = format!(
                        "UPDATE menu_items SET parent_id = $2, sort_order = $3
                         WHERE id = $1
                         RETURNING {COLUMNS}"
                    );
                    let row = sqlx::query_as::<_, MenuItem>(&query)
                        .bind(mv.id)
                        .bind(mv.new_parent_id)
                        .bind(mv.new_order)
                        .fetch_one(&mut *conn)
                        .await?;
                    updated.push(row);
                }
                Ok(updated)
            })
        })
        .await?;

        tracing::info!(moves = updated.len(), "Menu reorder applied");
        Ok(updated)
    }

    /// Delete a menu item. Fails with `HasChildren` while any item lists it
    /// as parent.
    pub async fn delete(pool: &PgPool, id: DbId) -> RepoResult<()> {
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                Self::lock_for_update(&mut *conn, id)
                    .await?
                    .ok_or(RepoError::NotFound {
                        entity: "menu item",
                        id,
                    })?;

                let has_children: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM menu_items WHERE parent_id = $1)",
                )
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
                if has_children {
                    return Err(RepoError::HasChildren { id });
                }

                sqlx::query("DELETE FROM menu_items WHERE id = $1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await
    }

    /// Single-namespace variant of the category ancestor walk.
    pub(crate) async fn validate_parent_in_tx(
        conn: &mut PgConnection,
        node_id: Option<DbId>,
        candidate_parent_id: DbId,
    ) -> RepoResult<()> {
        let candidate: Option<(Option<DbId>,)> =
            sqlx::query_as("SELECT parent_id FROM menu_items WHERE id = $1")
                .bind(candidate_parent_id)
                .fetch_optional(&mut *conn)
                .await?;
        let (mut cursor,) = candidate.ok_or(RepoError::NotFound {
            entity: "menu item",
            id: candidate_parent_id,
        })?;

        let Some(node_id) = node_id else {
            return Ok(());
        };
        if candidate_parent_id == node_id {
            return Err(RepoError::Cycle {
                node_id,
                parent_id: candidate_parent_id,
            });
        }

        let mut seen = HashSet::from([candidate_parent_id]);
        while let Some(ancestor) = cursor {
            if ancestor == node_id || !seen.insert(ancestor) {
                return Err(RepoError::Cycle {
                    node_id,
                    parent_id: candidate_parent_id,
                });
            }
            cursor = sqlx::query_scalar("SELECT parent_id FROM menu_items WHERE id = $1")
                .bind(ancestor)
                .fetch_optional(&mut *conn)
                .await?
                .flatten();
        }
        Ok(())
    }

    async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<MenuItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM menu_items WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, MenuItem>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
