//! User entity model and DTOs.
//!
//! Credential issuance (password hashing, tokens) lives outside this crate;
//! this table exists so `author_id` foreign keys and ownership checks have a
//! real referent.

use serde::{Deserialize, Serialize};
use slate_core::types::{ActingUser, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub is_admin: bool,
    pub created_at: Timestamp,
}

impl User {
    /// The identity/role pair ownership checks consume.
    pub fn as_acting(&self) -> ActingUser {
        ActingUser {
            id: self.id,
            is_admin: self.is_admin,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub is_admin: Option<bool>,
}
