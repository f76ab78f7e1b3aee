//! Chef process: consumes order events and records completed orders.

use anyhow::Context;
use brigade_amqp::AmqpBroker;
use brigade_core::broker::Broker;
use brigade_core::environment::SystemClock;
use brigade_kitchen::{Config, lifecycle, telemetry};
use brigade_postgres::PostgresOrderStore;
use brigade_runtime::{Chef, CookingDelay, OrderConsumer};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    telemetry::init_tracing("chef=info,brigade_kitchen=info,brigade_runtime=info,brigade_amqp=info");
    telemetry::init_metrics(config.server.metrics_address())?;

    info!(
        queue = %config.broker.queue,
        cooking_seconds = config.chef.cooking_seconds,
        decode_failure = ?config.chef.decode_failure_policy(),
        "Starting chef"
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

    let chef = Chef::new(
        PostgresOrderStore::new(pool),
        Arc::new(CookingDelay::new(config.chef.cooking_time())),
        Arc::new(SystemClock),
    )
    .with_decode_failure_policy(config.chef.decode_failure_policy());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let consumer = OrderConsumer::new(
        config.broker.queue.clone(),
        broker.clone(),
        Arc::new(chef),
        shutdown_rx,
    )
    .with_retry_delay(config.chef.consumer_retry_delay())
    .spawn();
    info!("Chef is waiting for orders");

    lifecycle::shutdown_signal().await;
    info!("Shutdown requested, finishing the current delivery");
    if shutdown_tx.send(()).is_err() {
        warn!("Consumer already stopped");
    }
    lifecycle::drain("order consumer", consumer, config.server.shutdown_timeout()).await;

    if let Err(e) = broker.close().await {
        warn!(error = %e, "Broker connection did not close cleanly");
    }
    info!("Graceful shutdown complete");
    Ok(())
}
