//! libSQL backend: async `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::registration::model::{Gender, UserProfile};
use crate::store::migrations;
use crate::store::traits::ProfileStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

const USER_COLUMNS: &str =
    "user_id, name, age, gender, weight, height, allergies, goal, timeframe";

/// Map a libsql Row to a UserProfile.
///
/// Column order matches USER_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("read users row: {e}"));

    let gender_str: String = row.get(3).map_err(read)?;
    let gender: Gender = gender_str
        .parse()
        .map_err(|e: String| DatabaseError::Serialization(e))?;

    let age: i64 = row.get(2).map_err(read)?;
    let age = u8::try_from(age)
        .map_err(|_| DatabaseError::Serialization(format!("age out of range: {age}")))?;

    let height: i64 = row.get(5).map_err(read)?;
    let height = i32::try_from(height)
        .map_err(|_| DatabaseError::Serialization(format!("height out of range: {height}")))?;

    Ok(UserProfile {
        user_id: row.get(0).map_err(read)?,
        name: row.get(1).map_err(read)?,
        age,
        gender,
        weight: row.get(4).map_err(read)?,
        height,
        allergies: row.get(6).map_err(read)?,
        goal: row.get(7).map_err(read)?,
        timeframe: row.get(8).map_err(read)?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn save(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (user_id, name, age, gender, weight, height, allergies, goal, timeframe, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT (user_id) DO UPDATE SET
                name = ?2, age = ?3, gender = ?4, weight = ?5, height = ?6,
                allergies = ?7, goal = ?8, timeframe = ?9, updated_at = ?10",
            params![
                profile.user_id,
                profile.name.as_str(),
                i64::from(profile.age),
                profile.gender.as_str(),
                profile.weight,
                i64::from(profile.height),
                profile.allergies.as_str(),
                profile.goal.as_str(),
                profile.timeframe.as_str(),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("save user: {e}")))?;

        debug!(user_id = profile.user_id, "Profile saved");
        Ok(())
    }

    async fn get(&self, user_id: i64) -> Result<Option<UserProfile>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get user: {e}"))),
        }
    }

    async fn delete(&self, user_id: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM users WHERE user_id = ?1", params![user_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete user: {e}")))?;
        debug!(user_id, removed = count > 0, "Profile delete");
        Ok(count > 0)
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM users", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count users: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let n = row
                    .get::<i64>(0)
                    .map_err(|e| DatabaseError::Query(format!("count users: {e}")))?;
                Ok(u64::try_from(n).unwrap_or(0))
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count users: {e}"))),
        }
    }
}
