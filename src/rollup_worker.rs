// Background rollup maintenance: merge partial rows of settled buckets, then prune by retention.
// Runs every merge_interval_secs. VACUUM runs on a cron expression or a fixed interval.

use chrono::{DateTime, TimeDelta, Utc};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::metrics_repo::MetricsRepo;

/// Config for the rollup worker.
#[derive(Debug, Clone)]
pub struct RollupWorkerConfig {
    pub merge_interval_secs: u64,
    /// Buckets whose interval ended less than this many seconds ago are left alone.
    pub settle_secs: u64,
    pub raw_retention_days: u32,
    pub rollup_retention_days: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *"). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub merged_keys: u64,
    pub pruned_rows: u64,
}

pub fn spawn(repo: Arc<MetricsRepo>, config: RollupWorkerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, config).await;
    })
}

#[instrument(skip(repo), fields(interval_secs = config.merge_interval_secs))]
async fn run(repo: Arc<MetricsRepo>, config: RollupWorkerConfig) {
    let mut merge_interval = tokio::time::interval(Duration::from_secs(config.merge_interval_secs));
    merge_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = merge_interval.tick() => {
                if let Err(e) = run_one_tick(&repo, &config, Utc::now()).await {
                    warn!(error = %e, "rollup tick failed");
                }
            }
            _ = vacuum_rx.recv() => {
                if let Err(e) = repo.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(config: RollupWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            match schedule.after(&now).next() {
                Some(next) => {
                    let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                    tokio::time::sleep(delay).await;
                    if tx.send(()).await.is_err() {
                        break;
                    }
                }
                None => tokio::time::sleep(Duration::from_secs(3600)).await,
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// One maintenance pass as of `now`. Also run once at startup to fold rows left by a previous run.
pub async fn run_one_tick(
    repo: &MetricsRepo,
    config: &RollupWorkerConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<TickSummary> {
    let settled_before = cutoff(now, "settle_secs", settle_delta(config.settle_secs))?;
    let merged_keys = repo.compact_rollups(settled_before).await?;
    if merged_keys > 0 {
        info!(merged_keys, "rollup partial rows merged");
    }

    let raw_before = cutoff(
        now,
        "raw_retention_days",
        TimeDelta::try_days(i64::from(config.raw_retention_days)),
    )?;
    let rollup_before = cutoff(
        now,
        "rollup_retention_days",
        TimeDelta::try_days(i64::from(config.rollup_retention_days)),
    )?;
    let pruned_rows = repo.prune_old_data(raw_before, rollup_before).await?;
    if pruned_rows > 0 {
        info!(pruned_rows, "expired rows pruned");
    }

    Ok(TickSummary {
        merged_keys,
        pruned_rows,
    })
}

fn settle_delta(settle_secs: u64) -> Option<TimeDelta> {
    i64::try_from(settle_secs).ok().and_then(TimeDelta::try_seconds)
}

/// `now - delta`, or an error naming the knob when either step is out of range.
fn cutoff(now: DateTime<Utc>, knob: &str, delta: Option<TimeDelta>) -> anyhow::Result<DateTime<Utc>> {
    delta
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| anyhow::anyhow!("{knob} puts the cutoff out of range"))
}
