use meishi_database::{SharedDatastore, Skill};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::RegistrationError;
use crate::form::{FieldErrors, RegistrationForm, ValidRegistration};
use crate::notice::Notice;

const FAILURE_TITLE: &str = "登録に失敗しました";
const ERROR_TITLE: &str = "エラー";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPhase {
    Idle,
    LoadingSkills,
    Ready,
    Submitting,
    Success,
    Failed,
}

/// Everything the registration screen renders.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPage {
    pub phase: RegistrationPhase,
    pub skills: Vec<Skill>,
    pub form: RegistrationForm,
    pub errors: FieldErrors,
    pub notice: Option<Notice>,
}

impl Default for RegistrationPage {
    fn default() -> Self {
        Self {
            phase: RegistrationPhase::Idle,
            skills: Vec::new(),
            form: RegistrationForm::default(),
            errors: FieldErrors::default(),
            notice: None,
        }
    }
}

impl RegistrationPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_loading(&mut self) {
        self.transition(RegistrationPhase::LoadingSkills);
    }

    pub fn skills_loaded(&mut self, skills: Vec<Skill>) {
        self.skills = skills;
        self.transition(RegistrationPhase::Ready);
    }

    /// The skill selector stays disabled until the skill list has loaded.
    pub fn skill_selector_enabled(&self) -> bool {
        !matches!(
            self.phase,
            RegistrationPhase::Idle | RegistrationPhase::LoadingSkills
        )
    }

    pub fn can_submit(&self) -> bool {
        matches!(
            self.phase,
            RegistrationPhase::Ready | RegistrationPhase::Success
        )
    }

    fn reject(&mut self, form: RegistrationForm, errors: FieldErrors, notice: Notice) {
        self.form = form;
        self.errors = errors;
        self.notice = Some(notice);
    }

    fn begin_submit(&mut self, form: RegistrationForm) {
        if self.phase == RegistrationPhase::Success {
            self.transition(RegistrationPhase::Ready);
        }
        self.form = form;
        self.errors = FieldErrors::default();
        self.notice = None;
        self.transition(RegistrationPhase::Submitting);
    }

    fn succeed(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.form.reset();
        self.transition(RegistrationPhase::Success);
    }

    fn fail(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.transition(RegistrationPhase::Failed);
        self.transition(RegistrationPhase::Ready);
    }

    fn transition(&mut self, next: RegistrationPhase) {
        use RegistrationPhase::*;

        let expected = matches!(
            (self.phase, next),
            (Idle, LoadingSkills)
                | (LoadingSkills, Ready)
                | (Ready, Submitting)
                | (Submitting, Success)
                | (Submitting, Failed)
                | (Failed, Ready)
                | (Success, Ready)
        );
        if !expected {
            tracing::warn!(from = ?self.phase, to = ?next, "Unexpected registration phase change");
        }
        tracing::debug!(from = ?self.phase, to = ?next, "Registration phase");
        self.phase = next;
    }
}

impl RegistrationError {
    /// The notice shown for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            RegistrationError::Validation(_) => {
                Notice::error(FAILURE_TITLE, "入力内容を確認してください。")
            }
            RegistrationError::InFlight(_) => {
                Notice::error(FAILURE_TITLE, "送信中です。しばらくお待ちください。")
            }
            RegistrationError::Duplicate(_) => {
                Notice::error(FAILURE_TITLE, "このユーザーIDは既に存在します。")
            }
            other => Notice::error(ERROR_TITLE, other.to_string()),
        }
    }
}

/// Creates profiles: duplicate check, insert, skill attachment.
pub struct RegistrationService {
    store: SharedDatastore,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases an in-flight claim when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

impl RegistrationService {
    pub fn new(store: SharedDatastore) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Skill options for the form. A failed fetch is logged and yields none.
    pub async fn load_skills(&self) -> Vec<Skill> {
        match self.store.fetch_skills().await {
            Ok(skills) => skills,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching skills");
                Vec::new()
            }
        }
    }

    pub async fn open(&self) -> RegistrationPage {
        let mut page = RegistrationPage::new();
        page.begin_loading();
        let skills = self.load_skills().await;
        page.skills_loaded(skills);
        page
    }

    /// Validates `form` and registers it, updating `page` with the outcome.
    /// Returns the new identifier on success.
    pub async fn submit(
        &self,
        page: &mut RegistrationPage,
        form: RegistrationForm,
    ) -> Result<String, RegistrationError> {
        let registration = match form.validate() {
            Ok(registration) => registration,
            Err(e) => {
                let errors = e.0.clone();
                let e = RegistrationError::from(e);
                page.reject(form, errors, e.notice());
                return Err(e);
            }
        };

        page.begin_submit(form);
        let result = self.register(registration).await;
        match &result {
            Ok(user_id) => page.succeed(Notice::registered(user_id)),
            Err(e) => page.fail(e.notice()),
        }
        result
    }

    /// Checks for a duplicate, inserts the profile, then attaches the skill.
    ///
    /// If attaching the skill fails the new profile is deleted again, so a
    /// failed registration leaves no profile without a skill behind.
    pub async fn register(
        &self,
        registration: ValidRegistration,
    ) -> Result<String, RegistrationError> {
        let ValidRegistration { profile, skill_id } = registration;
        let _claim = self.claim(&profile.user_id)?;

        match self.store.profile_exists(&profile.user_id).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!(user_id = %profile.user_id, "user_id already taken");
                return Err(RegistrationError::Duplicate(profile.user_id));
            }
            Err(e) => {
                tracing::error!(user_id = %profile.user_id, error = %e, "Existence check failed");
                return Err(RegistrationError::ExistenceCheck(e));
            }
        }

        let user_id = self.store.create_profile(&profile).await.map_err(|e| {
            tracing::error!(user_id = %profile.user_id, error = %e, "Error inserting user");
            RegistrationError::CreateProfile(e)
        })?;

        if let Err(source) = self.store.attach_skill(&user_id, skill_id).await {
            tracing::error!(%user_id, skill_id, error = %source, "Error attaching skill");
            let rolled_back = match self.store.delete_profile(&user_id).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "Rollback failed, profile has no skill");
                    false
                }
            };
            return Err(RegistrationError::AttachSkill {
                source,
                rolled_back,
            });
        }

        tracing::info!(%user_id, skill_id, "Registered profile");
        Ok(user_id)
    }

    fn claim(&self, user_id: &str) -> Result<InFlightGuard<'_>, RegistrationError> {
        if !self.lock().insert(user_id.to_string()) {
            return Err(RegistrationError::InFlight(user_id.to_string()));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            user_id: user_id.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
