//! In-memory [`Datastore`] that records every call and can be told to fail.

use async_trait::async_trait;
use meishi_database::{
    Datastore, DatastoreError, NewProfile, ProfileRecord, Skill, UserSkill,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::form::RegistrationForm;

pub fn filled_form() -> RegistrationForm {
    RegistrationForm {
        user_id: "coding".to_string(),
        name: "山田太郎".to_string(),
        description: "Rust と React が好きです".to_string(),
        skill_id: "1".to_string(),
        github_id: "yamada_taro".to_string(),
        qiita_id: String::new(),
        x_id: String::new(),
    }
}

#[derive(Default)]
pub struct FakeStore {
    calls: Mutex<Vec<&'static str>>,
    profiles: Mutex<HashMap<String, ProfileRecord>>,
    skills: Vec<Skill>,
    failing: HashSet<&'static str>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            skills: vec![
                Skill { id: 1, name: "React".to_string() },
                Skill { id: 2, name: "Rust".to_string() },
            ],
            ..Self::default()
        }
    }

    /// Makes the named trait method return an error.
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn with_profile(self, record: ProfileRecord) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|call| **call == op).count()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.profiles.lock().unwrap().contains_key(user_id)
    }

    fn record(&self, op: &'static str) -> Result<(), DatastoreError> {
        self.calls.lock().unwrap().push(op);
        if self.failing.contains(op) {
            return Err(if op.starts_with("fetch") || op == "profile_exists" {
                DatastoreError::Fetch(format!("simulated {} failure", op))
            } else {
                DatastoreError::Write(format!("simulated {} failure", op))
            });
        }
        Ok(())
    }
}

pub fn profile(user_id: &str, name: &str) -> ProfileRecord {
    ProfileRecord {
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: "bio".to_string(),
        github_id: Some("yamada".to_string()),
        qiita_id: None,
        x_id: None,
        user_skill: vec![UserSkill {
            skills: Skill { id: 1, name: "React".to_string() },
        }],
    }
}

#[async_trait]
impl Datastore for FakeStore {
    async fn fetch_all_profiles(&self) -> Result<Vec<ProfileRecord>, DatastoreError> {
        self.record("fetch_all_profiles")?;
        Ok(self.profiles.lock().unwrap().values().cloned().collect())
    }

    async fn fetch_profile_by_id(&self, user_id: &str) -> Result<ProfileRecord, DatastoreError> {
        self.record("fetch_profile_by_id")?;
        self.profiles
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| DatastoreError::NotFound(user_id.to_string()))
    }

    async fn profile_exists(&self, user_id: &str) -> Result<bool, DatastoreError> {
        self.record("profile_exists")?;
        Ok(self.contains(user_id))
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<String, DatastoreError> {
        self.record("create_profile")?;
        let record = ProfileRecord {
            user_id: profile.user_id.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            github_id: profile.github_id.clone(),
            qiita_id: profile.qiita_id.clone(),
            x_id: profile.x_id.clone(),
            user_skill: Vec::new(),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), record);
        Ok(profile.user_id.clone())
    }

    async fn attach_skill(&self, user_id: &str, skill_id: i64) -> Result<(), DatastoreError> {
        self.record("attach_skill")?;
        let skill = self
            .skills
            .iter()
            .find(|skill| skill.id == skill_id)
            .cloned()
            .ok_or_else(|| DatastoreError::Write(format!("unknown skill {}", skill_id)))?;
        if let Some(record) = self.profiles.lock().unwrap().get_mut(user_id) {
            record.user_skill.push(UserSkill { skills: skill });
        }
        Ok(())
    }

    async fn fetch_skills(&self) -> Result<Vec<Skill>, DatastoreError> {
        self.record("fetch_skills")?;
        Ok(self.skills.clone())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), DatastoreError> {
        self.record("delete_profile")?;
        self.profiles.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn delete_all_skill_attachments(&self) -> Result<(), DatastoreError> {
        self.record("delete_all_skill_attachments")?;
        for record in self.profiles.lock().unwrap().values_mut() {
            record.user_skill.clear();
        }
        Ok(())
    }

    async fn delete_all_profiles(&self) -> Result<(), DatastoreError> {
        self.record("delete_all_profiles")?;
        self.profiles.lock().unwrap().clear();
        Ok(())
    }
}
