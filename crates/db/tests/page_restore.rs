//! Integration tests for the version restore protocol.
//!
//! - Restore appends exactly two rows (backup + marker) and copies the
//!   target snapshot back onto the live page verbatim
//! - Workflow status survives a restore untouched
//! - Only the author or an admin may restore
//! - Restoring a missing version fails before any mutation

use slate_core::types::ActingUser;
use slate_db::error::RepoError;
use slate_db::models::page::{CreatePage, UpdatePage};
use slate_db::models::user::CreateUser;
use slate_db::repositories::{PageRepo, PageVersionRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, username: &str, is_admin: bool) -> ActingUser {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            is_admin: Some(is_admin),
        },
    )
    .await
    .unwrap()
    .as_acting()
}

fn new_page(author_id: i64, title: &str, content: &str) -> CreatePage {
    CreatePage {
        title: title.to_string(),
        slug: None,
        content: content.to_string(),
        summary: None,
        status: None,
        category_id: None,
        author_id,
    }
}

fn edit_content(content: &str) -> UpdatePage {
    UpdatePage {
        content: Some(content.to_string()),
        ..Default::default()
    }
}

/// Create a page and edit it twice: versions 1..=3 with distinct content.
async fn page_with_three_versions(pool: &PgPool, author: ActingUser) -> i64 {
    let page = PageRepo::create(pool, &new_page(author.id, "History", "one"))
        .await
        .unwrap();
    PageRepo::update(pool, page.id, &edit_content("two"), author.id)
        .await
        .unwrap();
    PageRepo::update(pool, page.id, &edit_content("three"), author.id)
        .await
        .unwrap();
    page.id
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_appends_backup_and_marker(pool: PgPool) {
    let author = new_user(&pool, "restore_author", false).await;
    let page_id = page_with_three_versions(&pool, author).await;

    let marker = PageVersionRepo::restore(&pool, page_id, 1, author)
        .await
        .unwrap();
    assert_eq!(marker, 5);

    let versions = PageVersionRepo::list_for_page(&pool, page_id).await.unwrap();
    assert_eq!(versions.len(), 5);

    // Version 4 backs up the pre-restore state; version 5 marks the restore.
    let backup = &versions[1];
    assert_eq!(backup.version_number, 4);
    assert_eq!(backup.content, "three");
    assert_eq!(
        backup.change_summary.as_deref(),
        Some("Backup before restoring version 1")
    );

    let restored = &versions[0];
    assert_eq!(restored.version_number, 5);
    assert_eq!(restored.content, "one");
    assert_eq!(
        restored.change_summary.as_deref(),
        Some("Restored from version 1")
    );

    let live = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(live.content, "one");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_leaves_status_untouched(pool: PgPool) {
    let author = new_user(&pool, "restore_status", false).await;
    let page_id = page_with_three_versions(&pool, author).await;

    // Publish after the versions were recorded: the snapshots all say draft,
    // but restoring must not touch workflow state.
    PageRepo::update(
        &pool,
        page_id,
        &UpdatePage {
            status: Some("published".to_string()),
            ..Default::default()
        },
        author.id,
    )
    .await
    .unwrap();

    PageVersionRepo::restore(&pool, page_id, 1, author)
        .await
        .unwrap();

    let live = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(live.status, "published");
    assert_eq!(live.content, "one");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_is_itself_restorable(pool: PgPool) {
    let author = new_user(&pool, "restore_twice", false).await;
    let page_id = page_with_three_versions(&pool, author).await;

    PageVersionRepo::restore(&pool, page_id, 1, author)
        .await
        .unwrap();
    // Undo the restore by restoring the backup.
    let marker = PageVersionRepo::restore(&pool, page_id, 4, author)
        .await
        .unwrap();
    assert_eq!(marker, 7);

    let live = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(live.content, "three");
}

// ---------------------------------------------------------------------------
// Authorization and failure cases
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_forbidden_for_non_author(pool: PgPool) {
    let author = new_user(&pool, "restore_owner", false).await;
    let intruder = new_user(&pool, "restore_intruder", false).await;
    let page_id = page_with_three_versions(&pool, author).await;

    let err = PageVersionRepo::restore(&pool, page_id, 1, intruder)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Forbidden(_)));

    // Nothing changed.
    let live = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(live.content, "three");
    let count = PageVersionRepo::count_for_page(&pool, page_id).await.unwrap();
    assert_eq!(count, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_allowed_for_admin(pool: PgPool) {
    let author = new_user(&pool, "restore_author2", false).await;
    let admin = new_user(&pool, "restore_admin", true).await;
    let page_id = page_with_three_versions(&pool, author).await;

    PageVersionRepo::restore(&pool, page_id, 2, admin)
        .await
        .unwrap();
    let live = PageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(live.content, "two");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_missing_version_fails_cleanly(pool: PgPool) {
    let author = new_user(&pool, "restore_missing", false).await;
    let page_id = page_with_three_versions(&pool, author).await;

    let err = PageVersionRepo::restore(&pool, page_id, 99, author)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::VersionNotFound { .. }));

    let count = PageVersionRepo::count_for_page(&pool, page_id).await.unwrap();
    assert_eq!(count, 3);
}
