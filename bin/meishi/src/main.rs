use anyhow::Context;
use meishi_config::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let settings = meishi_config::load_settings().context("failed to load configuration")?;
    let store = meishi_database::connect(&settings.datastore)
        .context("failed to connect to the datastore")?;
    tracing::info!(backend = ?settings.datastore.backend, "Datastore ready");

    meishi_net::build_server(&settings, store).await?;
    Ok(())
}
