use guild_economy::{
    bot, config,
    core::CurrencyService,
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load economy defaults and bot options
    let app_config = config::load_or_default("config.toml")
        .inspect_err(|e| error!("Failed to load config.toml: {e}"))?;

    // 4. Connect to the database and make sure the tables exist
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connected."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    config::database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    let currency = Arc::new(CurrencyService::new(db, app_config.economy));

    // 5. Run the bot; the token is read right before use and never stored
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    let result = bot::run_bot(&token, Arc::clone(&currency), app_config.bot).await;

    // 6. Close the database even if the bot stopped with an error
    if let Err(e) = currency.close().await {
        warn!("Failed to close database cleanly: {e}");
    }

    result
}
