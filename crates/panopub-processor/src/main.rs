use panopub_core::Config;
use panopub_processor::{
    HttpReporter, InboxRunner, NoopCdn, ProcessorConfig, TourProcessor,
};
use panopub_storage::create_object_store;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let gateway = create_object_store(&config).await?;

    let reporter = Arc::new(HttpReporter::new(
        config.control_plane_url.clone(),
        config.webhook_secret.as_ref().map(|s| s.as_bytes().to_vec()),
    )?);

    let processor = Arc::new(TourProcessor::new(
        gateway.clone(),
        Arc::new(NoopCdn),
        reporter,
        ProcessorConfig {
            max_archive_size_bytes: config.max_archive_size_bytes as u64,
            cdn_invalidation_enabled: config.cdn_invalidation_enabled,
        },
    ));

    let bucket = config.s3_bucket.clone().unwrap_or_else(|| "local".to_string());
    let runner = Arc::new(InboxRunner::new(
        gateway,
        processor,
        bucket,
        Duration::from_secs(config.inbox_poll_interval_seconds),
    ));

    tracing::info!(
        poll_interval_seconds = config.inbox_poll_interval_seconds,
        control_plane_url = %config.control_plane_url,
        "Processor runner starting"
    );

    let handle = runner.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping processor runner");
    handle.abort();

    Ok(())
}
