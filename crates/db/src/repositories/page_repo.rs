//! Repository for the `pages` table.
//!
//! Edits that change page content pair the row mutation with an append to
//! the version log inside one transaction, so history and live state can
//! never drift apart.

use slate_core::error::CoreError;
use slate_core::pages;
use slate_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::atomic::run_atomic;
use crate::error::{is_unique_violation, RepoError, RepoResult};
use crate::models::page::{CreatePage, Page, UpdatePage};
use crate::repositories::PageVersionRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, slug, content, summary, status, is_home, \
    category_id, author_id, created_at, updated_at";

/// Provides CRUD and home-page operations for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a new page and record its initial version in one transaction.
    ///
    /// The slug is generated from the title when absent. An empty-content
    /// page is created without an initial version (there is nothing worth
    /// snapshotting yet).
    pub async fn create(pool: &PgPool, input: &CreatePage) -> RepoResult<Page> {
        pages::validate_title(&input.title)?;
        pages::validate_content(&input.content)?;
        if let Some(summary) = &input.summary {
            pages::validate_summary(summary)?;
        }
        if let Some(status) = &input.status {
            pages::validate_status(status)?;
        }
        let slug = input
            .slug
            .clone()
            .unwrap_or_else(|| pages::generate_slug(&input.title));
        pages::validate_slug(&slug)?;

        let input = input.clone();
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                let query = format!(
                    "INSERT INTO pages (title, slug, content, summary, status, category_id, author_id)
                     VALUES ($1, $2, $3, $4, COALESCE($5, 'draft'), $6, $7)
                     RETURNING {COLUMNS}"
                );
                let page = sqlx::query_as::<_, Page>(&query)
                    .bind(&input.title)
                    .bind(&slug)
                    .bind(&input.content)
                    .bind(&input.summary)
                    .bind(&input.status)
                    .bind(input.category_id)
                    .bind(input.author_id)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err, "uq_pages_slug") {
                            RepoError::UniquenessConflict { slug: slug.clone() }
                        } else {
                            RepoError::Storage(err)
                        }
                    })?;

                if page.is_snapshotable() {
                    PageVersionRepo::create_in_tx(
                        &mut *conn,
                        &page,
                        input.author_id,
                        Some("Initial version"),
                    )
                    .await?;
                }
                Ok(page)
            })
        })
        .await
    }

    /// Find a page by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a page by its globally unique slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE slug = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List pages with pagination, most recently updated first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages
             ORDER BY updated_at DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count the total number of pages.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Update a page. Only non-`None` fields in `input` are applied.
    ///
    /// Runs as one transaction: the page row is locked, patched, and the
    /// resulting state appended to the version log. A page whose resulting
    /// state is incomplete (empty title or content) is updated without a
    /// snapshot rather than failing the edit.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePage,
        author_id: DbId,
    ) -> RepoResult<Option<Page>> {
        if let Some(title) = &input.title {
            pages::validate_title(title)?;
        }
        if let Some(content) = &input.content {
            pages::validate_content(content)?;
        }
        if let Some(summary) = &input.summary {
            pages::validate_summary(summary)?;
        }
        if let Some(status) = &input.status {
            pages::validate_status(status)?;
        }

        let input = input.clone();
        run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                if Self::lock_for_update(&mut *conn, id).await?.is_none() {
                    return Ok(None);
                }

                let query = format!(
                    "UPDATE pages SET
                        title = COALESCE($2, title),
                        content = COALESCE($3, content),
                        summary = COALESCE($4, summary),
                        status = COALESCE($5, status),
                        category_id = COALESCE($6, category_id)
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                let page = sqlx::query_as::<_, Page>(&query)
                    .bind(id)
                    .bind(&input.title)
                    .bind(&input.content)
                    .bind(&input.summary)
                    .bind(&input.status)
                    .bind(input.category_id)
                    .fetch_one(&mut *conn)
                    .await?;

                if page.is_snapshotable() {
                    PageVersionRepo::create_in_tx(
                        &mut *conn,
                        &page,
                        author_id,
                        input.change_summary.as_deref(),
                    )
                    .await?;
                }
                Ok(Some(page))
            })
        })
        .await
    }

    /// Mark a page as the site home page, un-marking any previously flagged
    /// page in the same transaction. Only a published page may become the
    /// home page, which keeps the at-most-one-published-home invariant.
    pub async fn set_home(pool: &PgPool, page_id: DbId) -> RepoResult<Page> {
        let page = run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;
                let page = Self::lock_for_update(&mut *conn, page_id)
                    .await?
                    .ok_or(RepoError::NotFound {
                        entity: "page",
                        id: page_id,
                    })?;
                if page.status != pages::STATUS_PUBLISHED {
                    return Err(CoreError::Validation(
                        "Only a published page can be set as home".into(),
                    )
                    .into());
                }

                // Unmark current home (if any)
                sqlx::query("UPDATE pages SET is_home = false WHERE is_home = true AND id <> $1")
                    .bind(page_id)
                    .execute(&mut *conn)
                    .await?;

                let query =
                    format!("UPDATE pages SET is_home = true WHERE id = $1 RETURNING {COLUMNS}");
                let page = sqlx::query_as::<_, Page>(&query)
                    .bind(page_id)
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(page)
            })
        })
        .await?;

        tracing::info!(page_id, "Home page changed");
        Ok(page)
    }

    /// Delete a page. Its versions are removed by the FK cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Load a page row and hold a `FOR UPDATE` lock on it for the rest of
    /// the caller's transaction. Serializes concurrent multi-step mutations
    /// of the same page (edits, restores, home-page swaps).
    pub(crate) async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
