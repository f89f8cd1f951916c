//! Configuration for the meishi binaries.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. an optional `meishi.toml` (or the file named by `MEISHI_CONFIG`),
//! 3. `MEISHI__SECTION__KEY` environment variables,
//! 4. the legacy `SUPABASE_URL` / `SUPABASE_ANON_KEY` pair (and their `VITE_`
//!    prefixed spellings) for the datastore endpoint and key.
//!
//! A `.env` file in the working directory is loaded before any of these.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use std::env;

pub mod error;
pub mod logging;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    Backend, BioMarkup, DatastoreSettings, QuerySettings, RenderSettings, SeedSkill,
    ServerSettings, Settings,
};

const CONFIG_PATH_VAR: &str = "MEISHI_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "meishi";
const ENV_PREFIX: &str = "MEISHI";
const LEGACY_URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const LEGACY_KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

/// Loads settings from every source described in the crate docs.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let file = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

    let builder = defaults()?
        .add_source(File::with_name(&file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("datastore.url", first_env(&LEGACY_URL_VARS))?
        .set_override_option("datastore.api_key", first_env(&LEGACY_KEY_VARS))?;

    finish(builder)
}

/// Builds settings from defaults plus one TOML document, ignoring the environment.
pub fn settings_from_toml(source: &str) -> Result<Settings, ConfigError> {
    let builder = defaults()?.add_source(File::from_str(source, FileFormat::Toml));
    finish(builder)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("datastore.backend", "rest")?
        .set_default("datastore.path", "./data")?
        .set_default("datastore.timeout_secs", 10)?
        .set_default("query.retry", 1)?
        .set_default("query.cache_ttl_secs", 0)?
        .set_default("render.bio_markup", "raw")?;
    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_settings_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let settings = settings_from_toml(
            r#"
            [datastore]
            url = "https://example.supabase.co"
            api_key = "anon-key"
            "#,
        )?;

        assert_eq!(settings.datastore.backend, Backend::Rest);
        assert_eq!(settings.datastore.url, "https://example.supabase.co");
        assert_eq!(settings.server.address(), "0.0.0.0:3000");
        assert_eq!(settings.query.retry, 1);
        assert_eq!(settings.query.cache_ttl().as_secs(), 0);
        assert_eq!(settings.render.bio_markup, BioMarkup::Raw);
        assert!(settings.datastore.skills.is_empty());
        Ok(())
    }

    #[test]
    fn test_rest_backend_requires_credentials() {
        let result = settings_from_toml(
            r#"
            [datastore]
            url = "https://example.supabase.co"
            "#,
        );

        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("api_key")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_backend_with_seed_skills() -> Result<(), Box<dyn std::error::Error>> {
        let settings = settings_from_toml(
            r#"
            [server]
            port = 8080

            [datastore]
            backend = "embedded"
            path = "/tmp/meishi"

            [[datastore.skills]]
            id = 1
            name = "React"

            [[datastore.skills]]
            id = 2
            name = "Rust"

            [render]
            bio_markup = "escaped"
            "#,
        )?;

        assert_eq!(settings.datastore.backend, Backend::Embedded);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.datastore.skills.len(), 2);
        assert_eq!(
            settings.datastore.skills[1],
            SeedSkill { id: 2, name: "Rust".to_string() }
        );
        assert_eq!(settings.render.bio_markup, BioMarkup::Escaped);
        Ok(())
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = settings_from_toml(
            r#"
            [datastore]
            backend = "sqlite"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
