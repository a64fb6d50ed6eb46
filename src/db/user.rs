//! User model for gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::parse_id;
use crate::datetime::parse_db_timestamp;
use crate::GatorError;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// Login name (unique).
    pub name: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// New user for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name.
    pub name: String,
}

impl NewUser {
    /// Create a new user with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raw `users` row as stored.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = GatorError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&row.id)?,
            name: row.name,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}
