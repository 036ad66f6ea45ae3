// Collector agent: samples OS metric families and turns them into metric points.
// One failing family is logged and skipped; the rest are still collected.

mod linux;
mod sender;
mod source;

pub use sender::Sender;
pub use source::SysinfoSource;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::MetricPoint;

/// Metric family, collected as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Cpu,
    Ram,
    Disk,
    Net,
    Load,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Cpu,
        Family::Ram,
        Family::Disk,
        Family::Net,
        Family::Load,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Disk => "disk",
            Self::Net => "net",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown metric family '{s}'"))
    }
}

/// CPU time shares in percent (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CpuSample {
    pub usage_pct: f64,
    pub user_pct: f64,
    pub system_pct: f64,
    pub iowait_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RamSample {
    pub used_pct: f64,
    pub available_bytes: u64,
    pub swap_used_pct: f64,
}

/// Root filesystem usage plus cumulative I/O counters over all block devices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiskSample {
    pub root_used_pct: f64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
}

/// Cumulative counters summed over all interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetSample {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub err_in: u64,
    pub err_out: u64,
    pub drop_in: u64,
    pub drop_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadSample {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
    pub cpu_count: usize,
}

/// Where samples come from. The agent binary uses [`SysinfoSource`].
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn cpu(&self) -> anyhow::Result<CpuSample>;
    async fn ram(&self) -> anyhow::Result<RamSample>;
    async fn disk(&self) -> anyhow::Result<DiskSample>;
    async fn net(&self) -> anyhow::Result<NetSample>;
    async fn load(&self) -> anyhow::Result<LoadSample>;
}

fn pct(value: f64) -> f64 {
    value / 100.0
}

pub struct Collector {
    host: String,
    vm: String,
    allowed_metrics: BTreeSet<String>,
    source: Arc<dyn MetricSource>,
}

impl Collector {
    pub fn new(
        host: impl Into<String>,
        vm: impl Into<String>,
        allowed_metrics: impl IntoIterator<Item = String>,
        source: Arc<dyn MetricSource>,
    ) -> Self {
        Self {
            host: host.into(),
            vm: vm.into(),
            allowed_metrics: allowed_metrics.into_iter().collect(),
            source,
        }
    }

    /// Collect the named families (all when `enabled` is empty). Unknown names are skipped.
    pub async fn collect_all(&self, enabled: &[String]) -> Vec<MetricPoint> {
        let families: Vec<Family> = if enabled.is_empty() {
            Family::ALL.to_vec()
        } else {
            enabled
                .iter()
                .filter_map(|name| match name.parse() {
                    Ok(f) => Some(f),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping metric family");
                        None
                    }
                })
                .collect()
        };

        let mut points = Vec::new();
        for family in families {
            match self.collect_family(family).await {
                Ok(mut p) => points.append(&mut p),
                Err(e) => {
                    tracing::error!(family = %family, error = %e, "metric family collection failed");
                }
            }
        }
        points
    }

    async fn collect_family(&self, family: Family) -> anyhow::Result<Vec<MetricPoint>> {
        tracing::debug!(family = %family, "collecting");
        let mut out = Vec::new();
        match family {
            Family::Cpu => {
                let s = self.source.cpu().await?;
                self.add(&mut out, "cpu_usage", pct(s.usage_pct), None);
                self.add(&mut out, "cpu_user", pct(s.user_pct), None);
                self.add(&mut out, "cpu_system", pct(s.system_pct), None);
                self.add(&mut out, "cpu_iowait", pct(s.iowait_pct), None);
            }
            Family::Ram => {
                let s = self.source.ram().await?;
                self.add(&mut out, "ram_used_pct", pct(s.used_pct), None);
                self.add(&mut out, "ram_available_bytes", s.available_bytes as f64, None);
                self.add(&mut out, "swap_used_pct", pct(s.swap_used_pct), None);
            }
            Family::Disk => {
                let s = self.source.disk().await?;
                self.add(&mut out, "disk_used_pct", pct(s.root_used_pct), Some(("mount", "/")));
                self.add(&mut out, "disk_read_bytes", s.read_bytes as f64, None);
                self.add(&mut out, "disk_write_bytes", s.write_bytes as f64, None);
                self.add(&mut out, "disk_read_time_ms", s.read_time_ms as f64, None);
                self.add(&mut out, "disk_write_time_ms", s.write_time_ms as f64, None);
            }
            Family::Net => {
                let s = self.source.net().await?;
                self.add(&mut out, "net_bytes_sent", s.bytes_sent as f64, None);
                self.add(&mut out, "net_bytes_recv", s.bytes_recv as f64, None);
                self.add(&mut out, "net_packets_sent", s.packets_sent as f64, None);
                self.add(&mut out, "net_packets_recv", s.packets_recv as f64, None);
                self.add(&mut out, "net_err_in", s.err_in as f64, None);
                self.add(&mut out, "net_err_out", s.err_out as f64, None);
                self.add(&mut out, "net_drop_in", s.drop_in as f64, None);
                self.add(&mut out, "net_drop_out", s.drop_out as f64, None);
            }
            Family::Load => {
                let s = self.source.load().await?;
                anyhow::ensure!(s.cpu_count > 0, "cpu count unavailable");
                let n = s.cpu_count as f64;
                self.add(&mut out, "load_1_norm", s.one / n, None);
                self.add(&mut out, "load_5_norm", s.five / n, None);
                self.add(&mut out, "load_15_norm", s.fifteen / n, None);
            }
        }
        Ok(out)
    }

    fn add(&self, out: &mut Vec<MetricPoint>, metric: &str, value: f64, tag: Option<(&str, &str)>) {
        if !self.allowed_metrics.contains(metric) {
            tracing::debug!(metric, "metric not allowed, skipped");
            return;
        }
        let mut point = MetricPoint::new(&self.host, &self.vm, metric, value);
        if let Some((k, v)) = tag {
            point = point.with_tag(k, v);
        }
        out.push(point);
    }
}
