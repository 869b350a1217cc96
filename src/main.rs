use price_tracker::{
    config::{Settings, StorageBackend},
    database::{establish_connection, run_migrations, MemoryPriceStore, PgPriceStore, PriceStore},
    handlers::create_router,
    services::{CoinGeckoGateway, IngestionScheduler},
    utils::logging::init_logging,
    AppState,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_logging(&settings.logging);

    info!("Starting price tracker");

    let store: Arc<dyn PriceStore> = match settings.storage.backend {
        StorageBackend::Postgres => {
            let pool = establish_connection(&settings.database).await?;
            if settings.database.run_migrations {
                run_migrations(&pool).await?;
            }
            Arc::new(PgPriceStore::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory price store, data is lost on restart");
            Arc::new(MemoryPriceStore::new())
        }
    };

    let gateway = Arc::new(CoinGeckoGateway::new(&settings.provider)?);
    let state = AppState::new(settings.clone(), store, gateway)?;

    let shutdown = CancellationToken::new();

    let scheduler_handle = if settings.ingestion.enabled {
        let scheduler = IngestionScheduler::new(
            state.pipeline.clone(),
            settings.ingestion.interval(),
            settings.ingestion.run_timeout(),
        );
        Some(scheduler.spawn(shutdown.clone()))
    } else {
        info!("Scheduled ingestion disabled");
        None
    };

    let app = create_router(state);

    let address = format!("{}:{}", settings.api.host, settings.api.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API server listening on {}", address);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Shutdown signal received, starting graceful shutdown");
                }
                _ = server_shutdown.cancelled() => {}
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            error!("Ingestion scheduler task failed: {}", e);
        }
    }

    info!("Price tracker stopped");
    Ok(())
}
