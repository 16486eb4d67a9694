//! Integration tests for the category tree.
//!
//! - Inserts append after siblings and respect scoped slug uniqueness
//! - Parent assignment rejects cycles, cross-namespace links, and missing
//!   parents
//! - Deletes are blocked by children and by referencing pages
//! - The materialized forest is nested and deterministically ordered

use slate_db::error::RepoError;
use slate_db::models::category::{Category, CreateCategory, NodeMove};
use slate_db::models::page::CreatePage;
use slate_db::models::user::CreateUser;
use slate_db::repositories::{CategoryRepo, PageRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_category(name: &str, kind: &str, parent_id: Option<i64>) -> CreateCategory {
    CreateCategory {
        name: name.to_string(),
        slug: None,
        kind: kind.to_string(),
        parent_id,
    }
}

async fn insert(pool: &PgPool, name: &str, kind: &str, parent_id: Option<i64>) -> Category {
    CategoryRepo::insert(pool, &new_category(name, kind, parent_id))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_appends_after_siblings(pool: PgPool) {
    let a = insert(&pool, "Alpha", "topic", None).await;
    let b = insert(&pool, "Beta", "topic", None).await;
    let child = insert(&pool, "Gamma", "topic", Some(a.id)).await;

    assert_eq!(a.sort_order, 1);
    assert_eq!(b.sort_order, 2);
    // Sibling ordering is per parent scope, so the first child starts over.
    assert_eq!(child.sort_order, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_slug_unique_within_scope_only(pool: PgPool) {
    let a = insert(&pool, "News", "topic", None).await;
    let b = insert(&pool, "Archive", "topic", None).await;

    // Same slug under a different parent is fine.
    insert(&pool, "Local", "topic", Some(a.id)).await;
    insert(&pool, "Local", "topic", Some(b.id)).await;
    // Same slug in a different namespace is fine.
    insert(&pool, "Local", "region", None).await;

    // Same slug in the same (kind, parent) scope is not.
    let err = CategoryRepo::insert(&pool, &new_category("Local", "topic", Some(a.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::UniquenessConflict { .. }));

    // Root level is a single scope too.
    let err = CategoryRepo::insert(&pool, &new_category("News", "topic", None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::UniquenessConflict { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_with_missing_parent_fails(pool: PgPool) {
    let err = CategoryRepo::insert(&pool, &new_category("Orphan", "topic", Some(9999)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_across_namespaces_fails(pool: PgPool) {
    let region = insert(&pool, "Europe", "region", None).await;
    let err = CategoryRepo::insert(&pool, &new_category("Politics", "topic", Some(region.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NamespaceMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Parent validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_assignment_rejects_direct_cycle(pool: PgPool) {
    // A is root, B's parent is A; making B the parent of A loops.
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", Some(a.id)).await;

    let err = CategoryRepo::validate_parent(&pool, Some(a.id), b.id, "topic")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Cycle { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_assignment_rejects_deep_cycle(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", Some(a.id)).await;
    let c = insert(&pool, "C", "topic", Some(b.id)).await;
    let d = insert(&pool, "D", "topic", Some(c.id)).await;

    let err = CategoryRepo::validate_parent(&pool, Some(a.id), d.id, "topic")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Cycle { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_assignment_rejects_self(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let err = CategoryRepo::validate_parent(&pool, Some(a.id), a.id, "topic")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Cycle { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_assignment_accepts_sibling(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", None).await;
    CategoryRepo::validate_parent(&pool, Some(b.id), a.id, "topic")
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_parent_moves_subtree_root(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", None).await;
    let child = insert(&pool, "Child", "topic", Some(a.id)).await;

    let moved = CategoryRepo::set_parent(&pool, child.id, Some(b.id))
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(b.id));
    assert_eq!(moved.sort_order, 1);

    // Moving B under its own descendant must fail.
    let err = CategoryRepo::set_parent(&pool, b.id, Some(child.id))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Cycle { .. }));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_blocked_by_children(pool: PgPool) {
    let a = insert(&pool, "Parent", "topic", None).await;
    let child = insert(&pool, "Child", "topic", Some(a.id)).await;

    let err = CategoryRepo::delete(&pool, a.id).await.unwrap_err();
    assert!(matches!(err, RepoError::HasChildren { .. }));

    // Leaf nodes delete fine.
    CategoryRepo::delete(&pool, child.id).await.unwrap();
    CategoryRepo::delete(&pool, a.id).await.unwrap();
    assert!(CategoryRepo::find_by_id(&pool, a.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_blocked_by_referencing_page(pool: PgPool) {
    let a = insert(&pool, "Docs", "topic", None).await;
    let author = UserRepo::create(
        &pool,
        &CreateUser {
            username: "cat_author".to_string(),
            is_admin: None,
        },
    )
    .await
    .unwrap();
    PageRepo::create(
        &pool,
        &CreatePage {
            title: "Guide".to_string(),
            slug: None,
            content: "body".to_string(),
            summary: None,
            status: None,
            category_id: Some(a.id),
            author_id: author.id,
        },
    )
    .await
    .unwrap();

    let err = CategoryRepo::delete(&pool, a.id).await.unwrap_err();
    assert!(matches!(err, RepoError::InUse { .. }));
}

// ---------------------------------------------------------------------------
// Tree materialization + batch reorder
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tree_is_nested_and_namespaced(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", Some(a.id)).await;
    insert(&pool, "C", "topic", Some(b.id)).await;
    insert(&pool, "Elsewhere", "region", None).await;

    let forest = CategoryRepo::tree(&pool, "topic").await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].row.name, "A");
    assert_eq!(forest[0].children[0].row.name, "B");
    assert_eq!(forest[0].children[0].children[0].row.name, "C");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reorder_batch_swaps_siblings(pool: PgPool) {
    let a = insert(&pool, "First", "topic", None).await;
    let b = insert(&pool, "Second", "topic", None).await;

    CategoryRepo::reorder_batch(
        &pool,
        &[
            NodeMove {
                id: a.id,
                new_parent_id: None,
                new_order: 2,
            },
            NodeMove {
                id: b.id,
                new_parent_id: None,
                new_order: 1,
            },
        ],
    )
    .await
    .unwrap();

    let names: Vec<String> = CategoryRepo::list(&pool, "topic")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Second".to_string(), "First".to_string()]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reorder_batch_rolls_back_entirely(pool: PgPool) {
    let a = insert(&pool, "First", "topic", None).await;
    let b = insert(&pool, "Second", "topic", None).await;

    // The second move names a nonexistent node, so the first move must not
    // stick either.
    let err = CategoryRepo::reorder_batch(
        &pool,
        &[
            NodeMove {
                id: a.id,
                new_parent_id: None,
                new_order: 2,
            },
            NodeMove {
                id: 9999,
                new_parent_id: None,
                new_order: 1,
            },
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    let reloaded_a = CategoryRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    let reloaded_b = CategoryRepo::find_by_id(&pool, b.id).await.unwrap().unwrap();
    assert_eq!(reloaded_a.sort_order, 1);
    assert_eq!(reloaded_b.sort_order, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reorder_batch_rejects_cycle_move(pool: PgPool) {
    let a = insert(&pool, "A", "topic", None).await;
    let b = insert(&pool, "B", "topic", Some(a.id)).await;

    let err = CategoryRepo::reorder_batch(
        &pool,
        &[NodeMove {
            id: a.id,
            new_parent_id: Some(b.id),
            new_order: 1,
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepoError::Cycle { .. }));

    let reloaded_a = CategoryRepo::find_by_id(&pool, a.id).await.unwrap().unwrap();
    assert_eq!(reloaded_a.parent_id, None);
}
