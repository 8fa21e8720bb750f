mod app;
mod config;
mod logging;
mod pages;
mod proxy;
mod security;

use app::AppState;
use config::Config;
use logging::Logger;
use smls::session::MemoryStore;
use smls::Provider;
use std::sync::Arc;
use std::time::Duration;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    Logger::init_logger(&config)?;

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(&config, store.clone())?;

    for provider in Provider::ALL {
        log::info!(
            "{} redirect URI: {}",
            provider.display_name(),
            state.smls.manager.config().redirect_uri(provider)
        );
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                log::debug!("Purged {purged} expired sessions");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("SMLS listening on http://{}", config.bind_addr);
    axum::serve(listener, app::router(state)).await?;

    Ok(())
}
