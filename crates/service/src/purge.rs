use chrono::{DateTime, NaiveDate, Utc};
use meishi_database::{SharedDatastore, USERS_TABLE, USER_SKILL_TABLE};

use crate::error::PurgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// The day the purge was nominally for. Informational only.
    pub target_date: NaiveDate,
}

/// The UTC calendar day before `now`.
pub fn previous_day(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today.pred_opt().unwrap_or(today)
}

/// Nightly reset of the directory: every skill attachment, then every profile.
pub struct PurgeJob {
    store: SharedDatastore,
}

impl PurgeJob {
    pub fn new(store: SharedDatastore) -> Self {
        Self { store }
    }

    /// Deletes all rows regardless of creation date. The second delete only
    /// runs once the first has succeeded.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PurgeReport, PurgeError> {
        let target_date = previous_day(now);
        tracing::info!(%target_date, "Deleting data created on {}", target_date.format("%Y-%m-%d"));

        self.store
            .delete_all_skill_attachments()
            .await
            .map_err(|source| {
                tracing::error!(table = USER_SKILL_TABLE, error = %source, "Error deleting rows");
                PurgeError::Delete {
                    table: USER_SKILL_TABLE,
                    source,
                }
            })?;
        tracing::info!(table = USER_SKILL_TABLE, "Rows deleted");

        self.store.delete_all_profiles().await.map_err(|source| {
            tracing::error!(table = USERS_TABLE, error = %source, "Error deleting rows");
            PurgeError::Delete {
                table: USERS_TABLE,
                source,
            }
        })?;
        tracing::info!(table = USERS_TABLE, "Rows deleted");

        tracing::info!(%target_date, "Purge completed");
        Ok(PurgeReport { target_date })
    }
}
