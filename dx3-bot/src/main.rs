use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use dx3_bot::{Dispatcher, Handler};
use dx3_core::store::Store;
use dx3_core::Dx3Config;
use dx3_sheets::{SheetGateway, SheetsClient};
use serenity::all::GatewayIntents;
use serenity::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<Dx3Config> {
    let path = std::env::var("DX3_CONFIG").map_or_else(|_| PathBuf::from("dx3.toml"), PathBuf::from);
    let mut config = if path.exists() {
        Dx3Config::from_file(&path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Dx3Config::default()
    };
    config.apply_env()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    if config.general.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }

    if config.discord.token.is_empty() {
        bail!("DISCORD_TOKEN is not set");
    }

    let store = Store::open(&config.general.data_dir)?;
    info!(
        data_dir = %config.general.data_dir.display(),
        characters = store.character_count(),
        version = store.version(),
        "Store loaded"
    );

    let sheets: Option<Arc<dyn SheetGateway>> = match SheetsClient::from_config(&config.sheets) {
        Ok(Some(client)) => Some(Arc::new(client)),
        Ok(None) => {
            info!("Sheets integration disabled: no credentials configured");
            None
        }
        Err(e) => {
            warn!(error = %e, "Sheets integration disabled");
            None
        }
    };

    let token = config.discord.token.clone();
    let register_slash = config.discord.register_slash_commands;
    let dispatcher = Arc::new(Dispatcher::new(config, store, sheets));
    let handler = Handler::new(dispatcher, register_slash);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
