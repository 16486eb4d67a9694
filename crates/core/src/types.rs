use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The identity and coarse role of the user performing an operation.
///
/// Authentication and role resolution happen outside this crate; callers
/// pass only the already-verified id and admin flag, which ownership checks
/// (e.g. version restore) consume as a yes/no decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: DbId,
    pub is_admin: bool,
}
