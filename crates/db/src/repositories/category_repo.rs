//! Repository for the `categories` table.
//!
//! Categories are a self-referencing tree persisted as flat rows. Every
//! structural mutation validates the forest invariant (no cycles, no
//! cross-namespace links, scoped slug uniqueness) before touching any row,
//! and multi-row mutations run through [`run_atomic`].

use std::collections::HashSet;

use slate_core::error::CoreError;
use slate_core::pages;
use slate_core::tree::{build_tree, TreeNode};
use slate_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::atomic::run_atomic;
use crate::error::{is_unique_violation, RepoError, RepoResult};
use crate::models::category::{Category, CreateCategory, NodeMove};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, slug, kind, parent_id, sort_order, created_at, updated_at";

/// Provides CRUD, reparenting, and reorder operations for categories.
pub struct CategoryRepo;

impl CategoryRepo {
    /// Insert a new category, appending it after its siblings.
    ///
    /// The slug is generated from the name when absent. The parent (if any)
    /// must exist in the same namespace, and the slug must be free within
    /// `(kind, parent_id)` scope.
    pub async fn insert(pool: &PgPool, input: &CreateCategory) -> RepoResult<Category> {
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Name must not be empty".into()).into());
        }
        let slug = input
            .slug
            .clone()
            .unwrap_or_else(|| pages::generate_slug(&input.name));
        pages::validate_slug(&slug)?;

        let input = input.clone();
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                if let Some(parent_id) = input.parent_id {
                    // A node being created cannot be anyone's ancestor, so
                    // only existence and namespace are checked here.
                    Self::validate_parent_in_tx(&mut *conn, None, parent_id, &input.kind).await?;
                }
                Self::check_slug_free(&mut *conn, &input.kind, input.parent_id, &slug, None)
                    .await?;

                let query = format!(
                    "INSERT INTO categories (name, slug, kind, parent_id, sort_order)
                     VALUES ($1, $2, $3, $4,
                             COALESCE((SELECT MAX(c.sort_order) FROM categories c
                                       WHERE c.kind = $3 AND c.parent_id IS NOT DISTINCT FROM $4), 0) + 1)
                     RETURNING {COLUMNS}"
                );
                let category = sqlx::query_as::<_, Category>(&query)
                    .bind(&input.name)
                    .bind(&slug)
                    .bind(&input.kind)
                    .bind(input.parent_id)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err, "uq_categories_slug_scope") {
                            RepoError::UniquenessConflict { slug: slug.clone() }
                        } else {
                            RepoError::Storage(err)
                        }
                    })?;
                Ok(category)
            })
        })
        .await
    }

    /// Find a category by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all categories in a namespace, siblings ordered by
    /// `(sort_order, id)`.
    pub async fn list(pool: &PgPool, kind: &str) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM categories
             WHERE kind = $1
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(kind)
            .fetch_all(pool)
            .await
    }

    /// Materialize the category forest for a namespace.
    pub async fn tree(pool: &PgPool, kind: &str) -> Result<Vec<TreeNode<Category>>, sqlx::Error> {
        let rows = Self::list(pool, kind).await?;
        Ok(build_tree(rows))
    }

    /// Check whether `candidate_parent_id` is a legal parent for a node in
    /// `kind`, without mutating anything.
    ///
    /// `node_id` is `None` when validating the parent of a node that does
    /// not exist yet (inserts), in which case no cycle is possible.
    pub async fn validate_parent(
        pool: &PgPool,
        node_id: Option<DbId>,
        candidate_parent_id: DbId,
        kind: &str,
    ) -> RepoResult<()> {
        let mut conn = pool.acquire().await.map_err(RepoError::Storage)?;
        Self::validate_parent_in_tx(&mut conn, node_id, candidate_parent_id, kind).await
    }

    /// Move a category under a new parent (or to the root level),
    /// appending it after its new siblings.
    pub async fn set_parent(
        pool: &PgPool,
        id: DbId,
        new_parent_id: Option<DbId>,
    ) -> RepoResult<Category> {
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                let node = Self::lock_for_update(&mut *conn, id)
                    .await?
                    .ok_or(RepoError::NotFound {
                        entity: "category",
                        id,
                    })?;
                if let Some(parent_id) = new_parent_id {
                    Self::validate_parent_in_tx(&mut *conn, Some(id), parent_id, &node.kind)
                        .await?;
                }
                Self::check_slug_free(&mut *conn, &node.kind, new_parent_id, &node.slug, Some(id))
                    .await?;

                let query = format!(
                    "UPDATE categories SET
                        parent_id = $2,
                        sort_order = COALESCE((SELECT MAX(c.sort_order) FROM categories c
                                               WHERE c.kind = $3 AND c.parent_id IS NOT DISTINCT FROM $2
                                                 AND c.id <> $1), 0) + 1
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                let category = sqlx::query_as::<_, Category>(&query)
                    .bind(id)
                    .bind(new_parent_id)
                    .bind(&node.kind)
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(category)
            })
        })
        .await
    }

    /// Apply a batch of reparent/reposition moves in one transaction.
    ///
    /// Every node is locked, validated, and updated in sequence; if any
    /// single move fails, the whole batch rolls back and no sort order or
    /// parent link changes are observable.
    pub async fn reorder_batch(pool: &PgPool, moves: &[NodeMove]) -> RepoResult<Vec<Category>> {
        let moves = moves.to_vec();
        let updated = run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                let mut updated = Vec::with_capacity(moves.len());
                for mv in &moves {
                    let node = Self::lock_for_update(&mut *conn, mv.id).await?.ok_or(
                        RepoError::NotFound {
                            entity: "category",
                            id: mv.id,
                        },
                    )?;
                    if mv.new_parent_id != node.parent_id {
                        if let Some(parent_id) = mv.new_parent_id {
                            Self::validate_parent_in_tx(
                                &mut *conn,
                                Some(mv.id),
                                parent_id,
                                &node.kind,
                            )
                            .await?;
                        }
                        Self::check_slug_free(
                            &mut *conn,
                            &node.kind,
                            mv.new_parent_id,
                            &node.slug,
                            Some(mv.id),
                        )
                        .await?;
                    }

                    let query = format!(
                        "UPDATE categories SET parent_id = $2, sort_order = $3
                         WHERE id = $1
                         RETURNING {COLUMNS}"
                    );
                    let row = sqlx::query_as::<_, Category>(&query)
                        .bind(mv.id)
                        .bind(mv.new_parent_id)
                        .bind(mv.new_order)
                        .fetch_one(&mut *conn)
                        .await
                        .map_err(|err| {
                            if is_unique_violation(&err, "uq_categories_slug_scope") {
                                RepoError::UniquenessConflict {
                                    slug: node.slug.clone(),
                                }
                            } else {
                                RepoError::Storage(err)
                            }
                        })?;
                    updated.push(row);
                }
                Ok(updated)
            })
        })
        .await?;

        tracing::info!(moves = updated.len(), "Category reorder applied");
        Ok(updated)
    }

    /// Delete a category.
    ///
    /// Fails with `HasChildren` while any category lists it as parent, and
    /// with `InUse` while any page references it. Both checks and the DELETE
    /// run in one transaction.
    pub async fn delete(pool: &PgPool, id: DbId) -> RepoResult<()> {
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                Self::lock_for_update(&mut *conn, id)
                    .await?
                    .ok_or(RepoError::NotFound {
                        entity: "category",
                        id,
                    })?;

                let has_children: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM categories WHERE parent_id = $1)",
                )
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
                if has_children {
                    return Err(RepoError::HasChildren { id });
                }

                let in_use: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM pages WHERE category_id = $1)",
                )
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
                if in_use {
                    return Err(RepoError::InUse { id });
                }

                sqlx::query("DELETE FROM categories WHERE id = $1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .await
    }

    /// Walk the candidate parent's ancestor chain looking for `node_id`.
    ///
    /// The walk follows `parent_id` until NULL and is bounded by the node
    /// count of the namespace; a revisited id means the stored chain is
    /// already looped and is reported as a cycle rather than walked forever.
    pub(crate) async fn validate_parent_in_tx(
        conn: &mut PgConnection,
        node_id: Option<DbId>,
        candidate_parent_id: DbId,
        kind: &str,
    ) -> RepoResult<()> {
        let candidate: Option<(String, Option<DbId>)> =
            sqlx::query_as("SELECT kind, parent_id FROM categories WHERE id = $1")
                .bind(candidate_parent_id)
                .fetch_optional(&mut *conn)
                .await?;
        let (candidate_kind, mut cursor) = candidate.ok_or(RepoError::NotFound {
            entity: "category",
            id: candidate_parent_id,
        })?;
        if candidate_kind != kind {
            return Err(RepoError::NamespaceMismatch {
                node_kind: kind.to_string(),
                parent_kind: candidate_kind,
            });
        }

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
            cursor = sqlx::query_scalar("SELECT parent_id FROM categories WHERE id = $1")
                .bind(ancestor)
                .fetch_optional(&mut *conn)
                .await?
                .flatten();
        }
        Ok(())
    }

    async fn check_slug_free(
        conn: &mut PgConnection,
        kind: &str,
        parent_id: Option<DbId>,
        slug: &str,
        exclude_id: Option<DbId>,
    ) -> RepoResult<()> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories
              WHERE kind = $1 AND parent_id IS NOT DISTINCT FROM $2 AND slug = $3
                AND ($4::bigint IS NULL OR id <> $4))",
        )
        .bind(kind)
        .bind(parent_id)
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&mut *conn)
        .await?;
        if taken {
            return Err(RepoError::UniquenessConflict {
                slug: slug.to_string(),
            });
        }
        Ok(())
    }

    async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
