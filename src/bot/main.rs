//! Telegram bot answering location and address messages with nearby places.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nearby::config::Config;
use nearby::geocoding::OneMapGeocoder;
use nearby::telegram::{handle_update, TelegramClient};
use nearby::{catalog, MessageFormatter, NearbyService};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "bot")]
#[command(about = "Telegram bot for nearby places")]
struct Args {
    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    info!("Nearby Telegram Bot");

    let gateway = catalog::connect(&config.catalog).await?;
    let geocoder = OneMapGeocoder::new(
        &config.geocoder.base_url,
        Duration::from_secs(config.geocoder.timeout_secs),
    )?;
    let service = Arc::new(
        NearbyService::new(
            gateway,
            Arc::new(geocoder),
            MessageFormatter::new(config.formatter.max_chunk_size),
        )
        .with_postal_code_prefix(config.geocoder.postal_code_prefix.clone()),
    );
    let telegram = Arc::new(TelegramClient::new(
        &config.telegram.api_url,
        &args.bot_token,
        config.telegram.poll_timeout_secs,
    )?);

    tokio::select! {
        res = poll_loop(service, telegram) => res?,
        _ = shutdown_signal() => info!("Shutting down"),
    }

    Ok(())
}

/// Long-poll for updates forever, handling each in its own task.
async fn poll_loop(service: Arc<NearbyService>, telegram: Arc<TelegramClient>) -> Result<()> {
    let mut offset = 0i64;

    loop {
        let updates = match telegram.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling failed: {:#}", e);
                tokio::time::sleep(Duration::from_secs(2)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let service = Arc::clone(&service);
            let telegram = Arc::clone(&telegram);
            tokio::spawn(async move {
                if let Err(e) = handle_update(&update, &service, telegram.as_ref()).await {
                    error!("Failed to reply to update {}: {:#}", update.update_id, e);
                }
            });
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
