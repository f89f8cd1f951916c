use meishi_database::NewProfile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;

pub const USER_ID_REQUIRED: &str = "英単語の入力は必須です";
pub const NAME_REQUIRED: &str = "名前の入力は必須です";
pub const FIELD_REQUIRED: &str = "入力必須項目です";
pub const HANDLE_PATTERN_MESSAGE: &str = "英数字とアンダースコアのみで入力してください";
pub const USER_ID_RESERVED: &str = "このIDは使用できません";

/// Identifiers that would shadow a fixed `/cards/...` route.
pub const RESERVED_USER_IDS: [&str; 1] = ["register"];

static HANDLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("handle pattern is a valid regex"));

/// The inputs of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    UserId,
    Name,
    Description,
    SkillId,
    GithubId,
    QiitaId,
    XId,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::UserId,
        Field::Name,
        Field::Description,
        Field::SkillId,
        Field::GithubId,
        Field::QiitaId,
        Field::XId,
    ];
}

/// Raw form values exactly as submitted. Missing fields deserialize as "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub skill_id: String,
    pub github_id: String,
    pub qiita_id: String,
    pub x_id: String,
}

/// Per-field validation messages, ordered by [`Field`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A form that passed validation, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub profile: NewProfile,
    pub skill_id: i64,
}

/// Checks one field. `None` means the value is acceptable.
///
/// Required text fields reject empty and whitespace-only input. Handles are
/// optional, but when present must match `^[A-Za-z0-9_]+$`.
pub fn validate_field(field: Field, value: &str) -> Option<&'static str> {
    let blank = value.trim().is_empty();
    match field {
        Field::UserId if blank => Some(USER_ID_REQUIRED),
        Field::UserId => RESERVED_USER_IDS
            .contains(&value.trim())
            .then_some(USER_ID_RESERVED),
        Field::Name => blank.then_some(NAME_REQUIRED),
        Field::Description => blank.then_some(FIELD_REQUIRED),
        Field::SkillId => parse_skill_id(value).is_none().then_some(FIELD_REQUIRED),
        Field::GithubId | Field::QiitaId | Field::XId => {
            (!value.is_empty() && !HANDLE_PATTERN.is_match(value)).then_some(HANDLE_PATTERN_MESSAGE)
        }
    }
}

fn parse_skill_id(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn optional_handle(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl RegistrationForm {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::UserId => &self.user_id,
            Field::Name => &self.name,
            Field::Description => &self.description,
            Field::SkillId => &self.skill_id,
            Field::GithubId => &self.github_id,
            Field::QiitaId => &self.qiita_id,
            Field::XId => &self.x_id,
        }
    }

    /// Validates every field at once, collecting all messages.
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        let mut errors = FieldErrors::default();
        for field in Field::ALL {
            if let Some(message) = validate_field(field, self.value(field)) {
                errors.insert(field, message);
            }
        }

        match (errors.is_empty(), parse_skill_id(&self.skill_id)) {
            (true, Some(skill_id)) => Ok(ValidRegistration {
                profile: NewProfile {
                    user_id: self.user_id.trim().to_string(),
                    name: self.name.clone(),
                    description: self.description.clone(),
                    github_id: optional_handle(&self.github_id),
                    qiita_id: optional_handle(&self.qiita_id),
                    x_id: optional_handle(&self.x_id),
                },
                skill_id,
            }),
            _ => Err(ValidationError(errors)),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::filled_form;

    #[test]
    fn test_valid_form_builds_profile() -> Result<(), Box<dyn std::error::Error>> {
        let valid = filled_form().validate()?;

        assert_eq!(valid.skill_id, 1);
        assert_eq!(valid.profile.user_id, "coding");
        assert_eq!(valid.profile.github_id.as_deref(), Some("yamada_taro"));
        assert_eq!(valid.profile.qiita_id, None);
        assert_eq!(valid.profile.x_id, None);
        Ok(())
    }

    #[test]
    fn test_empty_form_reports_every_required_field() {
        let Err(ValidationError(errors)) = RegistrationForm::default().validate() else {
            panic!("empty form must not validate");
        };

        assert_eq!(errors.get(Field::UserId), Some(USER_ID_REQUIRED));
        assert_eq!(errors.get(Field::Name), Some(NAME_REQUIRED));
        assert_eq!(errors.get(Field::Description), Some(FIELD_REQUIRED));
        assert_eq!(errors.get(Field::SkillId), Some(FIELD_REQUIRED));
        assert_eq!(errors.get(Field::GithubId), None);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_whitespace_only_identifier_is_empty() {
        assert_eq!(validate_field(Field::UserId, "   "), Some(USER_ID_REQUIRED));

        let mut form = filled_form();
        form.user_id = "  coding ".to_string();
        let valid = form.validate().map(|valid| valid.profile.user_id);
        assert_eq!(valid, Ok("coding".to_string()));
    }

    #[test]
    fn test_route_names_are_reserved() {
        assert_eq!(validate_field(Field::UserId, "register"), Some(USER_ID_RESERVED));
        assert_eq!(validate_field(Field::UserId, " register "), Some(USER_ID_RESERVED));
        assert_eq!(validate_field(Field::UserId, "registered"), None);

        let mut form = filled_form();
        form.user_id = "register".to_string();
        let Err(ValidationError(errors)) = form.validate() else {
            panic!("reserved identifier should be rejected");
        };
        assert_eq!(errors.get(Field::UserId), Some(USER_ID_RESERVED));
    }

    #[test]
    fn test_handle_pattern() {
        assert_eq!(validate_field(Field::GithubId, "a_b9"), None);
        assert_eq!(validate_field(Field::QiitaId, ""), None);
        assert_eq!(validate_field(Field::XId, "a-b"), Some(HANDLE_PATTERN_MESSAGE));
        assert_eq!(validate_field(Field::GithubId, "日本"), Some(HANDLE_PATTERN_MESSAGE));
        assert_eq!(validate_field(Field::GithubId, " abc"), Some(HANDLE_PATTERN_MESSAGE));
    }

    #[test]
    fn test_skill_id_must_be_numeric() {
        assert_eq!(validate_field(Field::SkillId, "2"), None);
        assert_eq!(validate_field(Field::SkillId, "React"), Some(FIELD_REQUIRED));
    }

    #[test]
    fn test_reset_clears_values() {
        let mut form = filled_form();
        form.reset();
        assert_eq!(form, RegistrationForm::default());
    }
}
