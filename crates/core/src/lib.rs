//! Slate domain core.
//!
//! Pure domain logic with zero internal dependencies: shared type aliases,
//! the domain error enum, page field validation and slug generation, and
//! tree materialization over flat parent/child rows. Used by the `slate-db`
//! persistence layer and by any future CLI or worker tooling.

pub mod error;
pub mod pages;
pub mod tree;
pub mod types;
