use meishi_database::DatastoreError;
use thiserror::Error;

use crate::form::FieldErrors;

/// Failure settled into a cached query. Cloneable so every waiter gets a copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("ユーザーが見つかりません: {0}")]
    NotFound(String),

    #[error("データ取得エラー: {0}")]
    Fetch(String),
}

impl From<DatastoreError> for QueryError {
    fn from(error: DatastoreError) -> Self {
        match error {
            DatastoreError::NotFound(user_id) => QueryError::NotFound(user_id),
            other => QueryError::Fetch(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationError(pub FieldErrors);

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A submission for {0} is already in progress")]
    InFlight(String),

    #[error("user_id {0} already exists")]
    Duplicate(String),

    #[error("ユーザーIDのチェック中にエラーが発生: {0}")]
    ExistenceCheck(#[source] DatastoreError),

    #[error("ユーザー登録エラー: {0}")]
    CreateProfile(#[source] DatastoreError),

    #[error("スキル登録エラー: {source}")]
    AttachSkill {
        source: DatastoreError,
        /// Whether the compensating delete removed the new profile again.
        rolled_back: bool,
    },
}

#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("{table}削除エラー: {source}")]
    Delete {
        table: &'static str,
        source: DatastoreError,
    },
}
