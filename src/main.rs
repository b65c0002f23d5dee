use std::sync::Arc;

use tracing::info;

use slotguard::config::{EngineConfig, ServiceConfig};
use slotguard::engine::Engine;
use slotguard::notify::NotifyHub;
use slotguard::reporter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let service = ServiceConfig::from_env();
    slotguard::observability::init(service.metrics_port);

    let config = EngineConfig::from_env();
    info!("slotguard starting");
    info!("  resources: {}", service.resources.join(", "));
    info!("  axis: {} minutes, utilization window: {}", config.axis_len, config.utilization_window);
    info!("  auto_resolve: {}", config.auto_resolve);
    info!("  metrics: {}", service.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let engine = Arc::new(Engine::new(
        service.resources.iter().cloned(),
        config,
        Arc::new(NotifyHub::new()),
    )?);

    let reporter_engine = engine.clone();
    let (every, format) = (service.report_interval, service.report_format);
    let reporter_task = tokio::spawn(async move {
        reporter::run_reporter(reporter_engine, every, format).await;
    });

    // Graceful shutdown on SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received");
    reporter_task.abort();
    info!(
        "final state:\n{}",
        reporter::render(&engine, format).await
    );
    info!("slotguard stopped");
    Ok(())
}
