//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument. Multi-row mutations go through
//! [`crate::atomic::run_atomic`] so partial updates are never observable.

pub mod category_repo;
pub mod menu_item_repo;
pub mod page_repo;
pub mod page_version_repo;
pub mod user_repo;

pub use category_repo::CategoryRepo;
pub use menu_item_repo::MenuItemRepo;
pub use page_repo::PageRepo;
pub use page_version_repo::PageVersionRepo;
pub use user_repo::UserRepo;
