//! HTTP surface: HTML views and a small JSON API over the shared services.

pub mod api;
pub mod error;
pub mod pages;
pub mod render;
pub mod router;
pub mod server;
pub mod state;

pub use error::AppError;
pub use server::{build_app, build_server};
pub use state::AppState;
