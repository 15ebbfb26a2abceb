use clap::Parser;
use log::info;
use std::sync::Arc;
use watcher::config::{Args, Config};
use watcher::cycle::{CycleSettings, Monitor};
use watcher::notifier::TelegramNotifier;
use watcher::probe::TcpProber;
use watcher::store::RetentionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = Config::from_args(Args::parse())?;

    info!("Starting server status checker...");
    info!("Watching {}:{}", config.host, config.port);
    info!(
        "Check every {:?}, cleanup every {:?}, keeping {:?}",
        config.check_interval, config.cleanup_interval, config.retention
    );

    let store = Arc::new(RetentionStore::open(&config.store_path).await);
    info!(
        "Loaded {} status entries from {}",
        store.len().await,
        store.path().display()
    );
    let prober = TcpProber::new(config.host.clone(), config.port, config.probe_timeout);
    let notifier = TelegramNotifier::new(
        config.telegram_api_url.clone(),
        config.telegram_token.clone(),
        config.telegram_chat_id.clone(),
    )?;
    let monitor = Monitor::new(CycleSettings::from(&config), store, prober, notifier);

    monitor
        .run_until(
            config.check_interval,
            config.cleanup_interval,
            tokio::signal::ctrl_c(),
        )
        .await;

    Ok(())
}
