use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Root configuration shared by the web server and the purge job.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub datastore: DatastoreSettings,
    pub query: QuerySettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which datastore implementation the binaries construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The hosted PostgREST endpoint.
    Rest,
    /// A local libmdbx environment under `datastore.path`.
    Embedded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreSettings {
    pub backend: Backend,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    pub path: PathBuf,
    pub timeout_secs: u64,
    /// Reference skills written into the embedded store at startup.
    #[serde(default)]
    pub skills: Vec<SeedSkill>,
}

impl DatastoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedSkill {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    /// Extra attempts after a failed read. 1 means at most two requests.
    pub retry: u32,
    pub cache_ttl_secs: u64,
}

impl QuerySettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// How the profile bio is written into the card page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BioMarkup {
    /// Inserted verbatim; the registration form advertises HTML support.
    Raw,
    Escaped,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSettings {
    pub bio_markup: BioMarkup,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datastore.backend == Backend::Rest
            && (self.datastore.url.trim().is_empty() || self.datastore.api_key.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "datastore.url and datastore.api_key must be set for the rest backend \
                 (SUPABASE_URL / SUPABASE_ANON_KEY)"
                    .to_string(),
            ));
        }
        if self.datastore.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "datastore.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
