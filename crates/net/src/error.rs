use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meishi_service::QueryError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),

    #[error("Invalid redirect target: {0}")]
    Redirect(#[from] url::ParseError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Query(QueryError::NotFound(user_id)) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("No profile for {}", user_id) }),
            ),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::Query(e) => {
                tracing::error!(error = %e, "Query error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to load data" }),
                )
            }
            other => {
                tracing::error!(error = %other, "Internal error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
