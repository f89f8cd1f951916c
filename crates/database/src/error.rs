use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatastoreError {
    /// The backend answered "no row" for a single-row read.
    #[error("No row found for user_id {0}")]
    NotFound(String),

    #[error("Failed to fetch data: {0}")]
    Fetch(String),

    #[error("Failed to write data: {0}")]
    Write(String),

    #[error("Invalid datastore configuration: {0}")]
    Config(String),
}
