mod blame;
mod bot;
mod config;
mod platform;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::TriggerHandler;
use crate::config::Config;
use crate::platform::slack::{self, SlackClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wob=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    info!("Configuration loaded");
    info!("  Slack API: {}", config.slack.api_base);
    info!("  Pacing: {:?}", config.pacing());

    let client = Arc::new(SlackClient::new(&config.slack));
    let handler = Arc::new(TriggerHandler::new(client.clone(), config.pacing()));

    info!("running as {}", std::process::id());
    tokio::select! {
        result = slack::run(client, handler) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
