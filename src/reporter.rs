use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ReportFormat;
use crate::engine::Engine;

/// Render the usage and conflict reports once.
pub async fn render(engine: &Engine, format: ReportFormat) -> String {
    let usage = engine.usage_report().await;
    let conflicts = engine.conflict_report().await;
    match format {
        ReportFormat::Text => format!("{usage}{conflicts}"),
        ReportFormat::Json => serde_json::json!({
            "usage": usage,
            "conflicts": conflicts,
            "total_reservations": engine.get_total_reservations(),
        })
        .to_string(),
    }
}

/// Background task that periodically logs resource usage and conflicts.
pub async fn run_reporter(engine: Arc<Engine>, every: Duration, format: ReportFormat) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let report = render(&engine, format).await;
        info!("ledger report:\n{report}");
    }
}
