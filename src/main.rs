use std::sync::Arc;

use log::warn;
use prov_adapters::{ProvisioningClient, SimulatedControlPlane};
use prov_core::{InMemoryInstanceStore, InstanceStore};
use prov_persistence::{build_pool, PgInstanceStore};
use provflow::{http, init_tracing, AppConfig, AppError, ProvisioningService};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        tracing::error!(error = %e, "provflow-server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    tracing::info!(config = ?config, "configuration loaded");
    if let Err(e) = config.require_provisioning() {
        warn!("{e}; provisioning requests will be rejected until it is set");
    }
    let client: Arc<dyn ProvisioningClient> = Arc::new(SimulatedControlPlane::new());

    match config.database.clone() {
        Some(db) => {
            let pool = tokio::task::spawn_blocking(move || build_pool(&db.url, db.min_connections, db.max_connections))
                .await
                .map_err(|e| AppError::Config(format!("pool setup task failed: {e}")))??;
            serve(config, client, Arc::new(PgInstanceStore::from_pool(pool))).await
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store, instances will not survive a restart");
            serve(config, client, Arc::new(InMemoryInstanceStore::new())).await
        }
    }
}

async fn serve<S>(config: AppConfig, client: Arc<dyn ProvisioningClient>, store: Arc<S>) -> Result<(), AppError>
    where S: InstanceStore + 'static
{
    let addr = config.bind_addr;
    let service = ProvisioningService::new(config, client, store)?;
    let resumed = service.resume_pending().await?;
    if !resumed.is_empty() {
        tracing::info!(count = resumed.len(), "resumed pending instances");
        warn!("resuming against the in-process simulated control plane: resources created before the restart are \
               gone, so instances past CreateResourceGroup will fail with ResourceGroupMissing");
    }

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("provflow-server listening on {addr}");
    axum::serve(listener, http::router(service)).with_graceful_shutdown(shutdown_signal())
                                                .await?;
    tracing::info!("provflow-server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("could not install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}
