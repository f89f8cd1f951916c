use serde::{Deserialize, Serialize};

/// Projection used for every profile read, joining the one level of
/// `user_skill -> skills`.
pub const PROFILE_SELECT: &str =
    "user_id,name,description,github_id,qiita_id,x_id,user_skill(skills(id,name))";

pub const USERS_TABLE: &str = "users";
pub const SKILLS_TABLE: &str = "skills";
pub const USER_SKILL_TABLE: &str = "user_skill";

/// A row of the `skills` reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
}

/// One embedded `user_skill` row as returned by the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSkill {
    pub skills: Skill,
}

/// A `users` row together with its attached skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub github_id: Option<String>,
    pub qiita_id: Option<String>,
    pub x_id: Option<String>,
    #[serde(default)]
    pub user_skill: Vec<UserSkill>,
}

impl ProfileRecord {
    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.user_skill.iter().map(|attached| &attached.skills)
    }

    pub(crate) fn from_row(row: NewProfile, user_skill: Vec<UserSkill>) -> Self {
        Self {
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            github_id: row.github_id,
            qiita_id: row.qiita_id,
            x_id: row.x_id,
            user_skill,
        }
    }
}

/// Insert payload for `users`. Absent handles are written as null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub github_id: Option<String>,
    pub qiita_id: Option<String>,
    pub x_id: Option<String>,
}

/// A `user_skill` join row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillAttachment {
    pub user_id: String,
    pub skill_id: i64,
}

/// Row shape returned by `select=user_id`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserIdRow {
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_record_from_join_json() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "user_id": "coding",
            "name": "山田太郎",
            "description": "<b>hello</b>",
            "github_id": "yamada",
            "qiita_id": null,
            "x_id": null,
            "user_skill": [{ "skills": { "id": 1, "name": "React" } }]
        }"#;

        let record: ProfileRecord = serde_json::from_str(json)?;

        assert_eq!(record.user_id, "coding");
        assert_eq!(record.github_id.as_deref(), Some("yamada"));
        assert!(record.qiita_id.is_none());
        let names: Vec<&str> = record.skills().map(|skill| skill.name.as_str()).collect();
        assert_eq!(names, vec!["React"]);
        Ok(())
    }

    #[test]
    fn test_missing_join_defaults_to_no_skills() -> Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "user_id": "solo",
            "name": "Solo",
            "description": "bio",
            "github_id": null,
            "qiita_id": null,
            "x_id": null
        }"#;

        let record: ProfileRecord = serde_json::from_str(json)?;
        assert_eq!(record.skills().count(), 0);
        Ok(())
    }
}
