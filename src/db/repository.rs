//! User repository for gator.
//!
//! This module provides CRUD operations for users in the database.

use chrono::Utc;
use uuid::Uuid;

use super::user::{NewUser, User, UserRow};
use super::{is_unique_violation, DbPool};
use crate::datetime::to_db_timestamp;
use crate::{GatorError, Result};

const USER_COLUMNS: &str = "id, name, created_at, updated_at";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Fails with a validation error when the name is already taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let name = new_user.name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("user name cannot be empty".to_string()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let stamp = to_db_timestamp(&now);

        sqlx::query("INSERT INTO users (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(id.to_string())
            .bind(name)
            .bind(&stamp)
            .bind(&stamp)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    GatorError::Validation(format!("user {name} already exists"))
                } else {
                    e.into()
                }
            })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {id}")))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE name = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// List all users in registration order.
    pub async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, name");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete every user.
    ///
    /// Feeds, follows and posts go with them through `ON DELETE CASCADE`.
    /// Returns the number of users removed.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Count registered users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
