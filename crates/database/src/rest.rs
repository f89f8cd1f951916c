//! Client for the hosted PostgREST endpoint (`{url}/rest/v1/{table}`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::error::DatastoreError;
use crate::model::{
    NewProfile, ProfileRecord, Skill, SkillAttachment, UserIdRow, PROFILE_SELECT, SKILLS_TABLE,
    USERS_TABLE, USER_SKILL_TABLE,
};
use crate::store::Datastore;

/// Error code PostgREST returns when a single-object read matches no row.
pub const NOT_FOUND_CODE: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const PREFER: &str = "Prefer";
// PostgREST refuses DELETE without a filter; this one is true for every row.
const EVERY_ROW: [(&str, &str); 1] = [("user_id", "not.is.null")];

/// Error payload returned by PostgREST.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Error, Debug)]
enum RestFailure {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{} (HTTP {})", .body.message, .status)]
    Api { status: StatusCode, body: ApiErrorBody },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl RestFailure {
    fn is_not_found(&self) -> bool {
        match self {
            RestFailure::Api { body, .. } => body.code.as_deref() == Some(NOT_FOUND_CODE),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct RestDatastore {
    client: reqwest::Client,
    base_url: String,
}

impl RestDatastore {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, DatastoreError> {
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| DatastoreError::Config(format!("invalid api key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| DatastoreError::Config(format!("invalid api key: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DatastoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn select_profiles(&self) -> RequestBuilder {
        self.client
            .get(self.table(USERS_TABLE))
            .query(&[("select", PROFILE_SELECT)])
    }
}

async fn send_text(request: RequestBuilder) -> Result<String, RestFailure> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        Ok(text)
    } else {
        let body = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or_else(|_| ApiErrorBody {
            message: text,
            ..ApiErrorBody::default()
        });
        Err(RestFailure::Api { status, body })
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RestFailure> {
    let text = send_text(request).await?;
    serde_json::from_str(&text).map_err(|e| RestFailure::Decode(e.to_string()))
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl Datastore for RestDatastore {
    async fn fetch_all_profiles(&self) -> Result<Vec<ProfileRecord>, DatastoreError> {
        send_json::<Vec<ProfileRecord>>(self.select_profiles())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error fetching user data");
                DatastoreError::Fetch(e.to_string())
            })
    }

    async fn fetch_profile_by_id(&self, user_id: &str) -> Result<ProfileRecord, DatastoreError> {
        let request = self
            .select_profiles()
            .query(&[("user_id", eq(user_id))])
            .header(ACCEPT, SINGLE_OBJECT);

        match send_json::<ProfileRecord>(request).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_not_found() => {
                tracing::debug!(user_id, "User not found");
                Err(DatastoreError::NotFound(user_id.to_string()))
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Error fetching user data");
                Err(DatastoreError::Fetch(e.to_string()))
            }
        }
    }

    async fn profile_exists(&self, user_id: &str) -> Result<bool, DatastoreError> {
        let request = self
            .client
            .get(self.table(USERS_TABLE))
            .query(&[("select", "user_id".to_string()), ("user_id", eq(user_id))])
            .header(ACCEPT, SINGLE_OBJECT);

        match send_json::<UserIdRow>(request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(DatastoreError::Fetch(e.to_string())),
        }
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<String, DatastoreError> {
        let request = self
            .client
            .post(self.table(USERS_TABLE))
            .header(PREFER, "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(profile);

        let row = send_json::<UserIdRow>(request)
            .await
            .map_err(|e| DatastoreError::Write(e.to_string()))?;
        tracing::debug!(user_id = %row.user_id, "Inserted users row");
        Ok(row.user_id)
    }

    async fn attach_skill(&self, user_id: &str, skill_id: i64) -> Result<(), DatastoreError> {
        let attachment = SkillAttachment {
            user_id: user_id.to_string(),
            skill_id,
        };
        let request = self
            .client
            .post(self.table(USER_SKILL_TABLE))
            .header(PREFER, "return=minimal")
            .json(&attachment);

        send_text(request)
            .await
            .map_err(|e| DatastoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn fetch_skills(&self) -> Result<Vec<Skill>, DatastoreError> {
        let request = self
            .client
            .get(self.table(SKILLS_TABLE))
            .query(&[("select", "id,name"), ("order", "id.asc")]);

        send_json::<Vec<Skill>>(request)
            .await
            .map_err(|e| DatastoreError::Fetch(e.to_string()))
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), DatastoreError> {
        for table in [USER_SKILL_TABLE, USERS_TABLE] {
            let request = self
                .client
                .delete(self.table(table))
                .query(&[("user_id", eq(user_id))]);
            send_text(request)
                .await
                .map_err(|e| DatastoreError::Write(format!("{}: {}", table, e)))?;
        }
        Ok(())
    }

    async fn delete_all_skill_attachments(&self) -> Result<(), DatastoreError> {
        let request = self.client.delete(self.table(USER_SKILL_TABLE)).query(&EVERY_ROW);
        send_text(request)
            .await
            .map_err(|e| DatastoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn delete_all_profiles(&self) -> Result<(), DatastoreError> {
        let request = self.client.delete(self.table(USERS_TABLE)).query(&EVERY_ROW);
        send_text(request)
            .await
            .map_err(|e| DatastoreError::Write(e.to_string()))?;
        Ok(())
    }
}
