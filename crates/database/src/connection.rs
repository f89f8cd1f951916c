use meishi_config::{Backend, DatastoreSettings};
use std::sync::Arc;

use crate::basic_db::EmbeddedDatastore;
use crate::error::DatastoreError;
use crate::model::Skill;
use crate::rest::RestDatastore;
use crate::store::SharedDatastore;

/// Builds the datastore selected by `settings.backend`.
///
/// For the embedded backend the configured reference skills are written
/// before the handle is returned.
pub fn connect(settings: &DatastoreSettings) -> Result<SharedDatastore, DatastoreError> {
    match settings.backend {
        Backend::Rest => {
            tracing::info!(url = %settings.url, "Using hosted datastore");
            let store = RestDatastore::new(&settings.url, &settings.api_key, settings.timeout())?;
            Ok(Arc::new(store))
        }
        Backend::Embedded => {
            tracing::info!(path = ?settings.path, "Using embedded datastore");
            let store = EmbeddedDatastore::open(&settings.path)?;
            let skills: Vec<Skill> = settings
                .skills
                .iter()
                .map(|seed| Skill {
                    id: seed.id,
                    name: seed.name.clone(),
                })
                .collect();
            if !skills.is_empty() {
                store.seed_skills(&skills)?;
            }
            Ok(Arc::new(store))
        }
    }
}
