use std::net::SocketAddr;
use std::sync::Arc;

use strategy_keeper::{
    blockchain,
    config::{Routing, Settings},
    handlers::create_router,
    services::{check_alert_channels_exist, ActionRunner, EventFilter, Notifier, WebhookNotifier},
    store::{KeyValueStore, MemoryStore, RedisStore},
    utils::logging::init_tracing,
    AppError, AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new().map_err(AppError::from)?;
    init_tracing(&settings.logging);

    info!("Starting strategy keeper");

    let routing = Routing::from_file(&settings.routing_file)
        .map_err(|e| AppError::ConfigError(e.to_string()))?;
    let routing = Arc::new(routing);
    info!("Routing loaded from {}", settings.routing_file);

    let reader = blockchain::connect(&settings.blockchain.rpc_url, None).map_err(AppError::from)?;
    let signer = match settings.blockchain.relayer_private_key.as_deref() {
        Some(key) => blockchain::connect(&settings.blockchain.rpc_url, Some(key)).map_err(AppError::from)?,
        None => {
            warn!("No relayer key configured; rebalance transactions will fail");
            reader.clone()
        }
    };

    let store: Arc<dyn KeyValueStore> = match settings.store.redis_url.as_deref() {
        Some(url) => {
            let store = RedisStore::connect(url, &settings.store.namespace)
                .await
                .map_err(AppError::from)?;
            info!("Redis store connected");
            Arc::new(store)
        }
        None => {
            warn!("No Redis URL configured; stored values will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> =
        Arc::new(WebhookNotifier::new(settings.notifications.channel_urls()));
    if let Err(e) = check_alert_channels_exist(notifier.as_ref()).await {
        warn!("Alert channel check failed: {}", e);
    }

    let state = AppState {
        filter: Arc::new(EventFilter::new(reader, store.clone(), routing.clone())),
        action: Arc::new(ActionRunner::new(
            signer,
            store,
            notifier,
            routing.health_factor_threshold,
        )),
    };

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Webhook host listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
        })
        .await?;

    info!("Shutting down strategy keeper");
    Ok(())
}
