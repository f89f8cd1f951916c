use axum::{
    http,
    routing::{get, post},
    Router,
};
use meishi_config::Settings;
use meishi_database::SharedDatastore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::error::AppError;
use crate::pages::*;
use crate::router::*;
use crate::state::AppState;

pub fn collect_components() -> Vec<(String, Router<AppState>)> {
    // HTML views
    let router_landing = route_builder("/", get(landing).post(search));
    let router_card_placeholder = get_router_builder("/cards", card_placeholder);
    let router_register = route_builder("/cards/register", get(register_form).post(register_submit));
    let router_card = get_router_builder("/cards/{user_id}", card);

    // JSON API
    let router_profiles = get_router_builder("/api/profiles", list_profiles);
    let router_profile = get_router_builder("/api/profiles/{user_id}", get_profile);
    let router_skills = get_router_builder("/api/skills", list_skills);
    let router_validate = post_router_builder("/api/register/validate", validate_registration_field);
    let router_health = get_router_builder("/api/health", health);

    vec![
        router_landing,
        router_card_placeholder,
        router_register,
        router_card,
        router_profiles,
        router_profile,
        router_skills,
        router_validate,
        router_health,
    ]
}

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    main_router(collect_components(), state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn build_server(settings: &Settings, store: SharedDatastore) -> Result<(), AppError> {
    let state = AppState::new(store, settings)?;
    let app = build_app(state);

    let address = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Web server listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
