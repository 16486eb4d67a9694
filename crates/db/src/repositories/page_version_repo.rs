//! Repository for the `page_versions` table.
//!
//! The version log is append-only: this module only ever inserts rows, and
//! nothing in the crate updates or deletes them. Per-page version numbers
//! are strictly increasing; the `(page_id, version_number)` unique
//! constraint backstops the allocation under concurrent writers.

use slate_core::types::{ActingUser, DbId};
use sqlx::{PgConnection, PgPool};

use crate::atomic::run_atomic;
use crate::error::{is_unique_violation, RepoError, RepoResult};
use crate::models::page::Page;
use crate::models::page_version::PageVersion;
use crate::repositories::PageRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, page_id, version_number, title, content, author_id, \
    change_summary, created_at";

/// How many times a pool-level snapshot retries after losing a version-number
/// race to a concurrent writer.
const VERSION_CONFLICT_RETRIES: u32 = 3;

/// Provides append, read, and restore operations for page versions.
pub struct PageVersionRepo;

impl PageVersionRepo {
    /// Append a snapshot of `page` to its version log.
    ///
    /// The version number is allocated as `MAX(version_number) + 1` inside
    /// the INSERT itself; if a concurrent writer claims the same number
    /// first, the unique constraint rejects this insert and the allocation
    /// is retried with a fresh read.
    ///
    /// Fails with `PageIncomplete` when the page lacks an id, title, or
    /// content. A malformed source object indicates a caller bug, so callers
    /// wrapping an edit skip the snapshot instead of failing the edit.
    pub async fn create(
        pool: &PgPool,
        page: &Page,
        author_id: DbId,
        change_summary: Option<&str>,
    ) -> RepoResult<PageVersion> {
        if !page.is_snapshotable() {
            return Err(RepoError::PageIncomplete { page_id: page.id });
        }

        let mut attempts = 0;
        loop {
            match Self::insert_next(pool, page, author_id, change_summary).await {
                Ok(version) => return Ok(version),
                Err(err)
                    if is_unique_violation(&err, "uq_page_versions_page_version")
                        && attempts < VERSION_CONFLICT_RETRIES =>
                {
                    attempts += 1;
                    tracing::debug!(
                        page_id = page.id,
                        attempts,
                        "lost version number race, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Append a snapshot of `page` within the caller's transaction.
    ///
    /// The caller must already hold the page row `FOR UPDATE` (see
    /// [`PageRepo::lock_for_update`]), which serializes number allocation
    /// without needing the retry loop.
    pub(crate) async fn create_in_tx(
        conn: &mut PgConnection,
        page: &Page,
        author_id: DbId,
        change_summary: Option<&str>,
    ) -> RepoResult<PageVersion> {
        if !page.is_snapshotable() {
            return Err(RepoError::PageIncomplete { page_id: page.id });
        }
        Ok(Self::insert_next(conn, page, author_id, change_summary).await?)
    }

    async fn insert_next<'e, E: sqlx::PgExecutor<'e>>(
        executor: E,
        page: &Page,
        author_id: DbId,
        change_summary: Option<&str>,
    ) -> Result<PageVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_versions
                (page_id, version_number, title, content, author_id, change_summary)
             VALUES ($1,
                     COALESCE((SELECT MAX(version_number) FROM page_versions WHERE page_id = $1), 0) + 1,
                     $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page.id)
            .bind(&page.title)
            .bind(&page.content)
            .bind(author_id)
            .bind(change_summary)
            .fetch_one(executor)
            .await
    }

    /// List all versions of a page, newest first. Recomputed per call.
    pub async fn list_for_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<PageVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions
             WHERE page_id = $1
             ORDER BY version_number DESC"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    /// Find a specific version by page and version number.
    pub async fn find_by_page_and_version(
        pool: &PgPool,
        page_id: DbId,
        version_number: i32,
    ) -> Result<Option<PageVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions
             WHERE page_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .bind(version_number)
            .fetch_optional(pool)
            .await
    }

    /// Like [`Self::find_by_page_and_version`] but fails with
    /// `VersionNotFound` when absent.
    pub async fn get(
        pool: &PgPool,
        page_id: DbId,
        version_number: i32,
    ) -> RepoResult<PageVersion> {
        Self::find_by_page_and_version(pool, page_id, version_number)
            .await?
            .ok_or(RepoError::VersionNotFound {
                page_id,
                version_number,
            })
    }

    /// Load two versions of the same page for side-by-side comparison.
    ///
    /// Pure read; both sides must exist. Comparison itself is verbatim
    /// snapshot against snapshot, so no further shaping happens here.
    pub async fn compare(
        pool: &PgPool,
        page_id: DbId,
        left: i32,
        right: i32,
    ) -> RepoResult<(PageVersion, PageVersion)> {
        let left = Self::get(pool, page_id, left).await?;
        let right = Self::get(pool, page_id, right).await?;
        Ok((left, right))
    }

    /// Count the versions recorded for a page.
    pub async fn count_for_page(pool: &PgPool, page_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM page_versions WHERE page_id = $1")
                .bind(page_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Restore a page to the state captured by `version_number`.
    ///
    /// Runs as one atomic unit:
    /// 1. load the target version (`VersionNotFound` if absent);
    /// 2. lock the live page row (`NotFound` if absent) and check that the
    ///    acting user is the page's author or an admin (`Forbidden`);
    /// 3. append a backup snapshot of the current live state;
    /// 4. overwrite the live title/content with the target snapshot;
    /// 5. append a marker version recording the restoration.
    ///
    /// Net effect: exactly two new version rows, and the live content is a
    /// verbatim copy of the restored snapshot. Workflow `status` is not part
    /// of the snapshot and is never touched by a restore.
    ///
    /// Returns the marker's version number.
    pub async fn restore(
        pool: &PgPool,
        page_id: DbId,
        version_number: i32,
        acting: ActingUser,
    ) -> RepoResult<i32> {
        let marker = run_atomic(pool, move |tx| {
            Box::pin(async move {
                let conn = &mut **tx;

                let target = Self::find_in_conn(&mut *conn, page_id, version_number)
                    .await?
                    .ok_or(RepoError::VersionNotFound {
                        page_id,
                        version_number,
                    })?;

                let page = PageRepo::lock_for_update(&mut *conn, page_id)
                    .await?
                    .ok_or(RepoError::NotFound {
                        entity: "page",
                        id: page_id,
                    })?;
                if page.author_id != acting.id && !acting.is_admin {
                    return Err(RepoError::Forbidden(
                        "only the page author or an admin may restore versions".into(),
                    ));
                }

                // Backup the state being overwritten, unless the live page is
                // malformed (skip policy, same as edits).
                if page.is_snapshotable() {
                    Self::insert_next(
                        &mut *conn,
                        &page,
                        acting.id,
                        Some(&format!("Backup before restoring version {version_number}")),
                    )
                    .await?;
                }

                sqlx::query(
                    "UPDATE pages SET title = $2, content = $3 WHERE id = $1",
                )
                .bind(page_id)
                .bind(&target.title)
                .bind(&target.content)
                .execute(&mut *conn)
                .await?;

                let restored = Page {
                    title: target.title.clone(),
                    content: target.content.clone(),
                    ..page
                };
                let marker = Self::insert_next(
                    &mut *conn,
                    &restored,
                    acting.id,
                    Some(&format!("Restored from version {version_number}")),
                )
                .await?;
                Ok(marker.version_number)
            })
        })
        .await?;

        tracing::info!(
            page_id,
            restored_from = version_number,
            marker_version = marker,
            user_id = acting.id,
            "Page version restored"
        );
        Ok(marker)
    }

    async fn find_in_conn(
        conn: &mut PgConnection,
        page_id: DbId,
        version_number: i32,
    ) -> Result<Option<PageVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions
             WHERE page_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .bind(version_number)
            .fetch_optional(conn)
            .await
    }
}
