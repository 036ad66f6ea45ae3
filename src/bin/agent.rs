// Collector agent: sample the enabled metric families and push them to the API.

use anyhow::Result;
use hostmetrics::agent::{Collector, Sender, SysinfoSource};
use hostmetrics::{config::AgentConfig, logging};
use std::sync::Arc;
use std::time::Duration;

async fn collect_and_send(collector: &Collector, sender: &Sender, enabled: &[String]) {
    let points = collector.collect_all(enabled).await;
    if points.is_empty() {
        tracing::warn!("No metrics collected");
        return;
    }
    if sender.send(&points).await {
        tracing::info!(points_count = points.len(), "metrics sent");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = AgentConfig::load()?;
    let vm = config
        .vm
        .clone()
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| "unknown".into());

    let collector = Collector::new(
        config.host.clone(),
        vm,
        config.allowed_metrics.clone(),
        Arc::new(SysinfoSource::new()),
    );
    let sender = Sender::new(
        config.api_url.clone(),
        Duration::from_secs(config.send_timeout_secs),
    )?;

    if config.interval_secs == 0 {
        collect_and_send(&collector, &sender, &config.enabled).await;
        return Ok(());
    }

    let mut tick = tokio::time::interval(Duration::from_secs(config.interval_secs));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = tick.tick() => collect_and_send(&collector, &sender, &config.enabled).await,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }
    Ok(())
}
