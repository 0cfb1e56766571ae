//! `ProfileStore` trait: the persistence contract for completed profiles.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::registration::model::UserProfile;

/// Backend-agnostic storage of completed registrations.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Insert or overwrite the profile for `profile.user_id`.
    async fn save(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// Fetch a stored profile.
    async fn get(&self, user_id: i64) -> Result<Option<UserProfile>, DatabaseError>;

    /// Erase a stored profile. Deleting an absent user is not an error.
    ///
    /// Returns whether a row was actually removed.
    async fn delete(&self, user_id: i64) -> Result<bool, DatabaseError>;

    /// Number of stored profiles.
    async fn count(&self) -> Result<u64, DatabaseError>;
}
