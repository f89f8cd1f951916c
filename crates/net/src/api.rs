use axum::extract::{Path, State};
use axum::Json;
use meishi_database::{ProfileRecord, Skill};
use meishi_service::{validate_field, Field, QueryState};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

fn settle<T>(state: QueryState<T>, what: &str) -> Result<T, AppError> {
    match state {
        QueryState::Ready(value) => Ok(value),
        QueryState::Failed(e) => Err(e.into()),
        QueryState::Idle | QueryState::Loading => Err(AppError::NotFound(what.to_string())),
    }
}

pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileRecord>>, AppError> {
    let profiles = settle(state.queries.all_profiles().await, "profiles")?;
    Ok(Json(profiles))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileRecord>, AppError> {
    let profile = settle(state.queries.profile_by_id(Some(&user_id)).await, &user_id)?;
    Ok(Json(profile))
}

pub async fn list_skills(State(state): State<AppState>) -> Result<Json<Vec<Skill>>, AppError> {
    let skills = settle(state.queries.skills().await, "skills")?;
    Ok(Json(skills))
}

#[derive(Debug, Deserialize)]
pub struct FieldInput {
    field: Field,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Serialize)]
pub struct FieldResult {
    field: Field,
    message: Option<&'static str>,
}

/// Single-field check used by the registration form on blur.
pub async fn validate_registration_field(Json(input): Json<FieldInput>) -> Json<FieldResult> {
    Json(FieldResult {
        field: input.field,
        message: validate_field(input.field, &input.value),
    })
}

pub async fn health() -> &'static str {
    "OK"
}
