use dotenvy::dotenv;
use spellbot::{
    bot::{self, BotData},
    config::{Settings, database},
    errors::{Error, Result},
    integrations::HttpLinks,
    web,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load settings from the TOML file and environment
    let settings = Arc::new(
        Settings::load().inspect_err(|e| error!("Failed to load settings: {e}"))?,
    );
    let token = settings.bot_token.clone().ok_or_else(|| Error::Config {
        message: "BOT_TOKEN is not set".to_string(),
    })?;

    // 4. Connect to the database and create missing tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Serve the web API next to the bot
    let web_settings = Arc::clone(&settings);
    let web_db = db.clone();
    tokio::spawn(async move {
        if let Err(e) = web::run_server(&web_settings, web_db).await {
            error!("Web API stopped: {e}");
        }
    });

    // 6. Run the bot
    let links = HttpLinks::new(Arc::clone(&settings))?;
    let data = BotData::new(db, settings, Arc::new(links));
    bot::run_bot(token, data).await
}
