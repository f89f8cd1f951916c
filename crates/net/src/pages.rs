//! HTML views: landing and lookup, card display, registration.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use meishi_service::{CardView, Notice, QueryState, RegistrationError, RegistrationForm};
use serde::Deserialize;
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

const SEARCH_REQUIRED: &str = "ユーザーIDを入力してください";
const PATH_BASE: &str = "http://localhost/";

#[derive(Debug, Deserialize)]
pub struct LandingQuery {
    registered: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    user_id: String,
}

/// `/cards/{user_id}` with the identifier percent-encoded.
pub fn card_path(user_id: &str) -> Result<String, AppError> {
    let mut url = Url::parse(PATH_BASE)?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push("cards")
        .push(user_id);
    Ok(url.path().to_string())
}

/// `/?registered={user_id}`, the landing page announcing a new card.
pub fn registered_path(user_id: &str) -> Result<String, AppError> {
    let mut url = Url::parse(PATH_BASE)?;
    url.query_pairs_mut().append_pair("registered", user_id);
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

/// Announces `registered` only when that card exists.
pub async fn landing(
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
) -> Result<Html<String>, AppError> {
    let registered = query.registered.as_deref();
    let notice = match state.queries.profile_by_id(registered).await {
        QueryState::Ready(record) => Some(Notice::registered(&record.user_id)),
        _ => None,
    };
    let html = state.renderer.landing("", None, notice.as_ref())?;
    Ok(Html(html))
}

/// Lookup form. A blank identifier re-renders the landing page inline.
pub async fn search(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let user_id = form.user_id.trim();
    if user_id.is_empty() {
        let html = state
            .renderer
            .landing(&form.user_id, Some(SEARCH_REQUIRED), None)?;
        return Ok((StatusCode::BAD_REQUEST, Html(html)).into_response());
    }

    Ok(Redirect::see_other(&card_path(user_id)?).into_response())
}

pub async fn card_placeholder(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.renderer.card(&CardView::Placeholder)?))
}

pub async fn card(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let view = state.queries.card(Some(&user_id)).await;
    Ok(Html(state.renderer.card(&view)?))
}

pub async fn register_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = state.registration.open().await;
    Ok(Html(state.renderer.register(&page)?))
}

/// Registers and redirects to the landing page, or re-renders the form
/// with the entered values, field messages and the failure notice.
pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    let mut page = state.registration.open().await;

    match state.registration.submit(&mut page, form).await {
        Ok(user_id) => Ok(Redirect::see_other(&registered_path(&user_id)?).into_response()),
        Err(e) => {
            let status = match e {
                RegistrationError::Validation(_) => StatusCode::BAD_REQUEST,
                RegistrationError::Duplicate(_) | RegistrationError::InFlight(_) => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let html = state.renderer.register(&page)?;
            Ok((status, Html(html)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_path_encodes_identifier() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(card_path("coding")?, "/cards/coding");
        assert_eq!(card_path("a b/c")?, "/cards/a%20b%2Fc");
        Ok(())
    }

    #[test]
    fn test_registered_path() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(registered_path("coding")?, "/?registered=coding");
        Ok(())
    }
}
