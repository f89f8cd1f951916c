use async_trait::async_trait;
use std::sync::Arc;

use crate::error::DatastoreError;
use crate::model::{NewProfile, ProfileRecord, Skill};

/// Every datastore round trip the application makes.
///
/// Implementations are constructed once at startup and shared as
/// [`SharedDatastore`]; nothing in the workspace reaches for a global client.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// All profiles with their joined skills.
    async fn fetch_all_profiles(&self) -> Result<Vec<ProfileRecord>, DatastoreError>;

    /// One profile, or [`DatastoreError::NotFound`] when no row matches.
    async fn fetch_profile_by_id(&self, user_id: &str) -> Result<ProfileRecord, DatastoreError>;

    /// Pre-insert check. "No row" is `Ok(false)`, not an error.
    async fn profile_exists(&self, user_id: &str) -> Result<bool, DatastoreError>;

    /// Inserts the profile and returns the identifier echoed by the backend.
    async fn create_profile(&self, profile: &NewProfile) -> Result<String, DatastoreError>;

    async fn attach_skill(&self, user_id: &str, skill_id: i64) -> Result<(), DatastoreError>;

    async fn fetch_skills(&self) -> Result<Vec<Skill>, DatastoreError>;

    /// Removes one profile and its join rows.
    async fn delete_profile(&self, user_id: &str) -> Result<(), DatastoreError>;

    async fn delete_all_skill_attachments(&self) -> Result<(), DatastoreError>;

    async fn delete_all_profiles(&self) -> Result<(), DatastoreError>;
}

pub type SharedDatastore = Arc<dyn Datastore>;
