//! Nightly purge: empties `user_skill`, then `users`. Exits 1 on any failure.

use anyhow::Context;
use chrono::Utc;
use meishi_config::logging;
use meishi_service::PurgeJob;
use std::process::ExitCode;

async fn run() -> anyhow::Result<()> {
    let started = Utc::now();
    tracing::info!("Purge started at {}", started.to_rfc3339());

    let settings = meishi_config::load_settings().context("failed to load configuration")?;
    let store = meishi_database::connect(&settings.datastore)
        .context("failed to connect to the datastore")?;

    let report = PurgeJob::new(store).run(started).await?;
    tracing::info!(target_date = %report.target_date, "Purge finished");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Purge failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
