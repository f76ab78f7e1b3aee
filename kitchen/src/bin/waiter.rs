//! Waiter process: HTTP front end that prices orders and publishes them.

use anyhow::Context;
use brigade_amqp::AmqpBroker;
use brigade_core::broker::Broker;
use brigade_core::environment::SystemClock;
use brigade_kitchen::{Config, lifecycle, telemetry};
use brigade_postgres::{PostgresMenu, PostgresOrderStore};
use brigade_runtime::Waiter;
use brigade_web::{AppState, router};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    telemetry::init_tracing("waiter=info,brigade_kitchen=info,brigade_runtime=info,brigade_amqp=info,brigade_web=info,tower_http=debug");
    telemetry::init_metrics(config.server.metrics_address())?;

    info!(
        queue = %config.broker.queue,
        address = %config.server.bind_address(),
        "Starting waiter"
    );

    let pool = brigade_postgres::connect_with_retry(
        &config.database.url,
        &config.database.pool_config(),
        &config.database.retry_policy(),
    )
    .await
    .context("Failed to connect to database")?;
    brigade_postgres::migrate(&pool).await?;

    let broker = Arc::new(
        AmqpBroker::connect_with_retry(&config.broker.url, &config.broker.retry_policy())
            .await
            .context("Failed to connect to broker")?,
    );
    broker.declare_queue(&config.broker.queue).await?;

    let menu = Arc::new(PostgresMenu::new(pool.clone()));
    let waiter = Waiter::new(broker.clone(), menu.clone(), Arc::new(SystemClock))
        .with_queue(config.broker.queue.clone())
        .with_publish_timeout(config.broker.publish_timeout());
    let state = AppState::new(
        Arc::new(waiter),
        Arc::new(PostgresOrderStore::new(pool)),
        menu,
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    info!("HTTP server listening for requests");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(lifecycle::shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    if let Err(e) = broker.close().await {
        warn!(error = %e, "Broker connection did not close cleanly");
    }
    info!("Graceful shutdown complete");
    Ok(())
}
