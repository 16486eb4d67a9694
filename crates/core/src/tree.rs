//! Tree materialization over flat parent/child rows.
//!
//! Hierarchical entities (categories, menu items) are persisted as flat rows
//! with a nullable `parent_id` self-reference. The nested shape is never held
//! in memory between requests; it is rebuilt on read by [`build_tree`], which
//! is a pure function of its input: the same rows produce structurally
//! identical output regardless of input order.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::DbId;

/// Accessors a flat row must expose to participate in tree building.
pub trait TreeRow {
    fn id(&self) -> DbId;
    fn parent_id(&self) -> Option<DbId>;
    fn sort_order(&self) -> i32;
}

/// A row together with its recursively nested children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub row: T,
    pub children: Vec<TreeNode<T>>,
}

/// Materialize a forest from flat rows.
///
/// Rows are grouped under their `parent_id`, recursively, starting from roots
/// (`parent_id == NULL`). Siblings are ordered by `(sort_order, id)`. Rows
/// whose parent is absent from the input (or that name themselves as parent)
/// are kept as roots rather than silently dropped. O(n) grouping plus an
/// O(n log n) sibling sort.
pub fn build_tree<T: TreeRow>(rows: Vec<T>) -> Vec<TreeNode<T>> {
    let ids: HashSet<DbId> = rows.iter().map(|r| r.id()).collect();

    let mut buckets: HashMap<Option<DbId>, Vec<T>> = HashMap::new();
    for row in rows {
        let key = row
            .parent_id()
            .filter(|p| *p != row.id() && ids.contains(p));
        buckets.entry(key).or_default().push(row);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by_key(|r| (r.sort_order(), r.id()));
    }

    assemble(&mut buckets, None)
}

fn assemble<T: TreeRow>(
    buckets: &mut HashMap<Option<DbId>, Vec<T>>,
    parent: Option<DbId>,
) -> Vec<TreeNode<T>> {
    let Some(rows) = buckets.remove(&parent) else {
        return Vec::new();
    };
    rows.into_iter()
        .map(|row| {
            let children = assemble(buckets, Some(row.id()));
            TreeNode { row, children }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
