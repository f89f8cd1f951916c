use meishi_config::Settings;
use meishi_database::SharedDatastore;
use meishi_service::{ProfileQueries, QueryOptions, RegistrationService};
use std::sync::Arc;

use crate::render::Renderer;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<ProfileQueries>,
    pub registration: Arc<RegistrationService>,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    pub fn new(store: SharedDatastore, settings: &Settings) -> Result<Self, minijinja::Error> {
        let options = QueryOptions {
            retry: settings.query.retry,
            cache_ttl: settings.query.cache_ttl(),
        };

        Ok(Self {
            queries: Arc::new(ProfileQueries::new(store.clone(), options)),
            registration: Arc::new(RegistrationService::new(store)),
            renderer: Arc::new(Renderer::new(settings.render.bio_markup)?),
        })
    }
}
