use kafka_writer::config::Config;
use kafka_writer::publish::{KafkaConnector, PublishCoordinator};
use kafka_writer::server::{
    bind, create_metrics, serve, shutdown_channel, AppState, InterruptListener,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        brokers = ?config.brokers,
        topic = %config.topic,
        "Starting kafka-writer"
    );

    let metrics = create_metrics()?;

    // The broker connection is opened lazily by the first publish
    let connector = Arc::new(KafkaConnector::new(
        config.brokers.clone(),
        config.topic.clone(),
        config.publish_timeout,
    ));
    let publisher = Arc::new(PublishCoordinator::new(connector, config.publish_timeout));
    let state = AppState::new(publisher, metrics).with_request_timeout(config.request_timeout);

    let listener = match bind(config.port).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, port = config.port, "Failed to bind HTTP listener");
            return Err(e.into());
        }
    };

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let interrupts = InterruptListener::register()?;
    tokio::spawn(interrupts.forward_to(shutdown_controller));

    serve(listener, state, shutdown_signal, config.shutdown_grace).await?;

    info!("kafka-writer shut down gracefully");
    Ok(())
}
