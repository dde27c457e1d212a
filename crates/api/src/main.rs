use std::sync::Arc;

use anyhow::Context;

use eventsink_api::app::{self, services::AppServices};
use eventsink_api::consumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eventsink_observability::init();

    let services = Arc::new(AppServices::persistent().await?);

    // Schema creation failure at startup is fatal; everything after this
    // point is recoverable at runtime.
    services
        .store
        .init_schema()
        .await
        .context("failed to initialise store schema")?;

    let consumer = consumer::spawn(services.broker.clone(), services.store.clone());

    let app = app::build_app(services);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP is drained; let the consumer finish its current iteration.
    consumer.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
