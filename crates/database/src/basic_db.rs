//! Embedded datastore on a local libmdbx environment.
//!
//! Tables mirror the hosted schema: `users` keyed by `user_id`, `skills` keyed
//! by the decimal id, `user_skill` keyed by the JSON pair `[user_id, skill_id]`.
//! Values are the JSON rows.

use async_trait::async_trait;
use libmdbx::{Database, DatabaseOptions, TableFlags, WriteFlags, WriteMap};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::DatastoreError;
use crate::model::{
    NewProfile, ProfileRecord, Skill, SkillAttachment, UserSkill, SKILLS_TABLE, USERS_TABLE,
    USER_SKILL_TABLE,
};
use crate::store::Datastore;

#[derive(Clone)]
pub struct EmbeddedDatastore {
    db: Arc<Mutex<Database<WriteMap>>>,
}

fn fetch_err(e: impl std::fmt::Display) -> DatastoreError {
    DatastoreError::Fetch(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> DatastoreError {
    DatastoreError::Write(e.to_string())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DatastoreError> {
    serde_json::from_slice(bytes).map_err(fetch_err)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DatastoreError> {
    serde_json::to_vec(value).map_err(write_err)
}

fn skill_key(id: i64) -> Vec<u8> {
    id.to_string().into_bytes()
}

impl EmbeddedDatastore {
    /// Opens (creating if needed) the environment under `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatastoreError> {
        std::fs::create_dir_all(path.as_ref())
            .map_err(|e| DatastoreError::Config(format!("cannot create {:?}: {}", path.as_ref(), e)))?;

        let mut options = DatabaseOptions::default();
        options.max_tables = Some(16);
        let db = Database::<WriteMap>::open_with_options(path, options)
            .map_err(|e| DatastoreError::Config(e.to_string()))?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Writes reference skills, replacing rows with the same id.
    pub fn seed_skills(&self, skills: &[Skill]) -> Result<(), DatastoreError> {
        let mut items = Vec::with_capacity(skills.len());
        for skill in skills {
            items.push((skill_key(skill.id), encode(skill)?));
        }
        self.batch_write(&items, SKILLS_TABLE).map_err(write_err)
    }

    fn lock(&self) -> MutexGuard<'_, Database<WriteMap>> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, key: &[u8], value: &[u8], table: &str, flags: WriteFlags) -> Result<(), libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        transaction.put(&table, key, value, flags)?;
        transaction.commit()?;
        Ok(())
    }

    fn read(&self, key: &[u8], table: &str) -> Result<Option<Vec<u8>>, libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let result = transaction.get(&table, key)?;
            return Ok(result);
        }

        Ok(None)
    }

    fn read_all(&self, table: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, libmdbx::Error> {
        let mut rows = Vec::new();
        let db = self.lock();
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let cursor = transaction.cursor(&table)?;

            for item in cursor {
                let (key, value) = item?;
                rows.push((key.to_vec(), value.to_vec()));
            }
        }

        Ok(rows)
    }

    fn batch_write<K, V>(&self, items: &[(K, V)], table: &str) -> Result<(), libmdbx::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        for (key, value) in items {
            transaction.put(&table, key, value, WriteFlags::default())?;
        }

        transaction.commit()?;
        Ok(())
    }

    fn batch_remove<K: AsRef<[u8]>>(&self, keys: &[K], table: &str) -> Result<(), libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        for key in keys {
            transaction.del(&table, key, None)?;
        }

        transaction.commit()?;
        Ok(())
    }

    fn clear(&self, table: &str) -> Result<(), libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        transaction.clear_table(&table)?;
        transaction.commit()?;
        Ok(())
    }

    fn attachments(&self) -> Result<Vec<(Vec<u8>, SkillAttachment)>, DatastoreError> {
        let mut attachments = Vec::new();
        for (key, value) in self.read_all(USER_SKILL_TABLE).map_err(fetch_err)? {
            attachments.push((key, decode::<SkillAttachment>(&value)?));
        }
        Ok(attachments)
    }

    fn skills_by_id(&self) -> Result<HashMap<i64, Skill>, DatastoreError> {
        let mut skills = HashMap::new();
        for (_, value) in self.read_all(SKILLS_TABLE).map_err(fetch_err)? {
            let skill: Skill = decode(&value)?;
            skills.insert(skill.id, skill);
        }
        Ok(skills)
    }

    fn joined_skills(
        user_id: &str,
        attachments: &[(Vec<u8>, SkillAttachment)],
        skills: &HashMap<i64, Skill>,
    ) -> Vec<UserSkill> {
        attachments
            .iter()
            .filter(|(_, attachment)| attachment.user_id == user_id)
            .filter_map(|(_, attachment)| skills.get(&attachment.skill_id))
            .map(|skill| UserSkill { skills: skill.clone() })
            .collect()
    }
}

impl EmbeddedDatastore {
    /// Runs a libmdbx task on the blocking pool so no runtime worker waits on
    /// the environment lock.
    async fn blocking<T, F>(&self, task: F) -> Result<T, DatastoreError>
    where
        T: Send + 'static,
        F: FnOnce(&EmbeddedDatastore) -> Result<T, DatastoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || task(&store))
            .await
            .map_err(|e| DatastoreError::Fetch(format!("embedded datastore task failed: {}", e)))?
    }

    fn load_all_profiles(&self) -> Result<Vec<ProfileRecord>, DatastoreError> {
        let attachments = self.attachments()?;
        let skills = self.skills_by_id()?;

        let mut profiles = Vec::new();
        for (_, value) in self.read_all(USERS_TABLE).map_err(fetch_err)? {
            let row: NewProfile = decode(&value)?;
            let joined = Self::joined_skills(&row.user_id, &attachments, &skills);
            profiles.push(ProfileRecord::from_row(row, joined));
        }
        Ok(profiles)
    }

    fn load_profile(&self, user_id: &str) -> Result<ProfileRecord, DatastoreError> {
        let value = self
            .read(user_id.as_bytes(), USERS_TABLE)
            .map_err(fetch_err)?
            .ok_or_else(|| DatastoreError::NotFound(user_id.to_string()))?;
        let row: NewProfile = decode(&value)?;

        let joined = Self::joined_skills(user_id, &self.attachments()?, &self.skills_by_id()?);
        Ok(ProfileRecord::from_row(row, joined))
    }

    fn insert_profile(&self, profile: &NewProfile) -> Result<String, DatastoreError> {
        let value = encode(profile)?;
        match self.write(profile.user_id.as_bytes(), &value, USERS_TABLE, WriteFlags::NO_OVERWRITE) {
            Ok(()) => Ok(profile.user_id.clone()),
            Err(libmdbx::Error::KeyExist) => Err(DatastoreError::Write(format!(
                "duplicate key value violates unique constraint \"users_pkey\" ({})",
                profile.user_id
            ))),
            Err(e) => Err(write_err(e)),
        }
    }

    fn insert_attachment(&self, user_id: &str, skill_id: i64) -> Result<(), DatastoreError> {
        if self.read(user_id.as_bytes(), USERS_TABLE).map_err(write_err)?.is_none() {
            return Err(DatastoreError::Write(format!(
                "user_skill.user_id references missing user {}",
                user_id
            )));
        }
        if self.read(&skill_key(skill_id), SKILLS_TABLE).map_err(write_err)?.is_none() {
            return Err(DatastoreError::Write(format!(
                "user_skill.skill_id references missing skill {}",
                skill_id
            )));
        }

        let attachment = SkillAttachment {
            user_id: user_id.to_string(),
            skill_id,
        };
        let key = encode(&(user_id, skill_id))?;
        self.write(&key, &encode(&attachment)?, USER_SKILL_TABLE, WriteFlags::default())
            .map_err(write_err)
    }

    fn remove_profile(&self, user_id: &str) -> Result<(), DatastoreError> {
        let keys: Vec<Vec<u8>> = self
            .attachments()
            .map_err(write_err)?
            .into_iter()
            .filter(|(_, attachment)| attachment.user_id == user_id)
            .map(|(key, _)| key)
            .collect();

        self.batch_remove(&keys, USER_SKILL_TABLE).map_err(write_err)?;
        self.batch_remove(&[user_id.as_bytes()], USERS_TABLE).map_err(write_err)
    }
}

#[async_trait]
impl Datastore for EmbeddedDatastore {
    async fn fetch_all_profiles(&self) -> Result<Vec<ProfileRecord>, DatastoreError> {
        self.blocking(|db| db.load_all_profiles()).await
    }

    async fn fetch_profile_by_id(&self, user_id: &str) -> Result<ProfileRecord, DatastoreError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.load_profile(&user_id)).await
    }

    async fn profile_exists(&self, user_id: &str) -> Result<bool, DatastoreError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| {
            let value = db.read(user_id.as_bytes(), USERS_TABLE).map_err(fetch_err)?;
            Ok(value.is_some())
        })
        .await
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<String, DatastoreError> {
        let profile = profile.clone();
        self.blocking(move |db| db.insert_profile(&profile)).await
    }

    async fn attach_skill(&self, user_id: &str, skill_id: i64) -> Result<(), DatastoreError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.insert_attachment(&user_id, skill_id))
            .await
    }

    async fn fetch_skills(&self) -> Result<Vec<Skill>, DatastoreError> {
        self.blocking(|db| {
            let mut skills: Vec<Skill> = db.skills_by_id()?.into_values().collect();
            skills.sort_by_key(|skill| skill.id);
            Ok(skills)
        })
        .await
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), DatastoreError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.remove_profile(&user_id)).await
    }

    async fn delete_all_skill_attachments(&self) -> Result<(), DatastoreError> {
        self.blocking(|db| db.clear(USER_SKILL_TABLE).map_err(write_err))
            .await
    }

    async fn delete_all_profiles(&self) -> Result<(), DatastoreError> {
        self.blocking(|db| db.clear(USERS_TABLE).map_err(write_err))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded(path: &Path) -> Result<EmbeddedDatastore, DatastoreError> {
        let db = EmbeddedDatastore::open(path)?;
        db.seed_skills(&[
            Skill { id: 2, name: "Rust".to_string() },
            Skill { id: 1, name: "React".to_string() },
        ])?;
        Ok(db)
    }

    fn profile(user_id: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.to_string(),
            name: "山田太郎".to_string(),
            description: "よろしくお願いします".to_string(),
            github_id: Some("yamada".to_string()),
            qiita_id: None,
            x_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_attach_and_fetch() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        assert!(!db.profile_exists("coding").await?);
        let user_id = db.create_profile(&profile("coding")).await?;
        assert_eq!(user_id, "coding");
        db.attach_skill(&user_id, 1).await?;

        assert!(db.profile_exists("coding").await?);
        let record = db.fetch_profile_by_id("coding").await?;
        assert_eq!(record.name, "山田太郎");
        assert_eq!(record.github_id.as_deref(), Some("yamada"));
        let names: Vec<&str> = record.skills().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["React"]);

        let all = db.fetch_all_profiles().await?;
        assert_eq!(all, vec![record]);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        match db.fetch_profile_by_id("nobody").await {
            Err(DatastoreError::NotFound(id)) => assert_eq!(id, "nobody"),
            other => panic!("expected NotFound, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_user_id_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        db.create_profile(&profile("coding")).await?;
        let result = db.create_profile(&profile("coding")).await;
        assert!(matches!(result, Err(DatastoreError::Write(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_unknown_skill_fails() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        db.create_profile(&profile("coding")).await?;
        let result = db.attach_skill("coding", 99).await;
        assert!(matches!(result, Err(DatastoreError::Write(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_profile_removes_join_rows() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        db.create_profile(&profile("coding")).await?;
        db.attach_skill("coding", 2).await?;
        db.create_profile(&profile("other")).await?;
        db.attach_skill("other", 1).await?;

        db.delete_profile("coding").await?;

        assert!(!db.profile_exists("coding").await?);
        let remaining = db.attachments()?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].1.user_id, "other");
        Ok(())
    }

    #[tokio::test]
    async fn test_purge_empties_both_tables() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        db.create_profile(&profile("coding")).await?;
        db.attach_skill("coding", 1).await?;

        db.delete_all_skill_attachments().await?;
        db.delete_all_profiles().await?;

        assert!(db.fetch_all_profiles().await?.is_empty());
        assert!(db.attachments()?.is_empty());
        // reference data survives
        assert_eq!(db.fetch_skills().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_skills_are_ordered_by_id() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        let ids: Vec<i64> = db.fetch_skills().await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_tasks_share_the_environment() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = seeded(&temp_dir.path().join("test_db"))?;

        let mut handles = Vec::new();
        for n in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let user_id = db.create_profile(&profile(&format!("user_{}", n))).await?;
                db.attach_skill(&user_id, 1).await?;
                db.fetch_profile_by_id(&user_id).await
            }));
        }
        for handle in handles {
            let record = handle.await??;
            assert_eq!(record.skills().count(), 1);
        }

        assert_eq!(db.fetch_all_profiles().await?.len(), 8);
        Ok(())
    }
}
