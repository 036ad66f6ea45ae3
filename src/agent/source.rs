// MetricSource backed by sysinfo, with /proc fallbacks for counters sysinfo lacks.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

use super::linux;
use super::{CpuSample, DiskSample, LoadSample, MetricSource, NetSample, RamSample};

pub struct SysinfoSource {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
        }
    }
}

fn used_pct(total: u64, available: u64) -> f64 {
    if total > 0 {
        total.saturating_sub(available) as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[async_trait]
impl MetricSource for SysinfoSource {
    /// Blocks for one sysinfo CPU update interval to measure usage over it.
    #[instrument(skip(self), fields(source = "sysinfo", operation = "cpu"))]
    async fn cpu(&self) -> anyhow::Result<CpuSample> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let before = linux::read_cpu_times();
            sys.refresh_cpu_all();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_cpu_all();
            let after = linux::read_cpu_times();

            let (user_pct, system_pct, iowait_pct) = match (before, after) {
                (Some(b), Some(a)) => a.percent_since(&b),
                _ => (0.0, 0.0, 0.0),
            };
            Ok(CpuSample {
                usage_pct: (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
                user_pct,
                system_pct,
                iowait_pct,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "ram"))]
    async fn ram(&self) -> anyhow::Result<RamSample> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_memory();
            let total_swap = sys.total_swap();
            let free_swap = total_swap.saturating_sub(sys.used_swap());
            Ok(RamSample {
                used_pct: used_pct(sys.total_memory(), sys.available_memory()),
                available_bytes: sys.available_memory(),
                swap_used_pct: used_pct(total_swap, free_swap),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "disk"))]
    async fn disk(&self) -> anyhow::Result<DiskSample> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(false);
            let root = disks
                .list()
                .iter()
                .find(|d| d.mount_point() == std::path::Path::new("/"))
                .ok_or_else(|| anyhow::anyhow!("no disk mounted at /"))?;
            let root_used_pct = used_pct(root.total_space(), root.available_space());
            let io = linux::read_disk_io().unwrap_or_default();
            Ok(DiskSample {
                root_used_pct,
                read_bytes: io.read_bytes,
                write_bytes: io.write_bytes,
                read_time_ms: io.read_time_ms,
                write_time_ms: io.write_time_ms,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "net"))]
    async fn net(&self) -> anyhow::Result<NetSample> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);
            let mut s = NetSample::default();
            for (name, data) in networks.list() {
                s.bytes_sent += data.total_transmitted();
                s.bytes_recv += data.total_received();
                s.packets_sent += data.total_packets_transmitted();
                s.packets_recv += data.total_packets_received();
                s.err_in += data.total_errors_on_received();
                s.err_out += data.total_errors_on_transmitted();
                let (drop_in, drop_out) = linux::read_interface_drops(name);
                s.drop_in += drop_in;
                s.drop_out += drop_out;
            }
            Ok(s)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "load"))]
    async fn load(&self) -> anyhow::Result<LoadSample> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let load = System::load_average();
            Ok(LoadSample {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
                cpu_count: sys.cpus().len(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
