// Linux-specific counters sysinfo does not expose: /proc/stat CPU times, /proc/diskstats, NIC drops.

/// Aggregate jiffies from the first `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// (user, system, iowait) in percent of the time elapsed since `prev`.
    pub fn percent_since(&self, prev: &CpuTimes) -> (f64, f64, f64) {
        let total = self.total().saturating_sub(prev.total());
        if total == 0 {
            return (0.0, 0.0, 0.0);
        }
        let share = |now: u64, before: u64| now.saturating_sub(before) as f64 / total as f64 * 100.0;
        (
            share(self.user + self.nice, prev.user + prev.nice),
            share(self.system, prev.system),
            share(self.iowait, prev.iowait),
        )
    }
}

pub(super) fn parse_proc_stat(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().unwrap_or(0))
        .collect();
    let at = |i: usize| fields.get(i).copied().unwrap_or(0);
    if fields.len() < 4 {
        return None;
    }
    Some(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

pub(super) fn read_cpu_times() -> Option<CpuTimes> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/stat").ok()?;
        parse_proc_stat(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Cumulative block I/O summed over whole devices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(super) struct DiskIo {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time_ms: u64,
    pub write_time_ms: u64,
}

const SECTOR_BYTES: u64 = 512;

/// Sum /proc/diskstats rows for which `is_device` holds (partitions and loop devices excluded by the caller).
pub(super) fn parse_diskstats(content: &str, is_device: impl Fn(&str) -> bool) -> DiskIo {
    let mut io = DiskIo::default();
    for line in content.lines() {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 11 || !is_device(f[2]) {
            continue;
        }
        let n = |i: usize| f[i].parse::<u64>().unwrap_or(0);
        io.read_bytes += n(5) * SECTOR_BYTES;
        io.read_time_ms += n(6);
        io.write_bytes += n(9) * SECTOR_BYTES;
        io.write_time_ms += n(10);
    }
    io
}

pub(super) fn read_disk_io() -> Option<DiskIo> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/diskstats").ok()?;
        Some(parse_diskstats(&content, |name| {
            !name.starts_with("loop")
                && !name.starts_with("ram")
                && std::path::Path::new("/sys/block").join(name).exists()
        }))
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// (rx_dropped, tx_dropped) from /sys/class/net/<interface>/statistics, 0 if unavailable.
pub(super) fn read_interface_drops(interface_name: &str) -> (u64, u64) {
    #[cfg(target_os = "linux")]
    {
        let read = |counter: &str| {
            let path = format!("/sys/class/net/{}/statistics/{}", interface_name, counter);
            std::fs::read_to_string(&path)
                .ok()
                .and_then(|c| c.trim().parse::<u64>().ok())
                .unwrap_or(0)
        };
        (read("rx_dropped"), read("tx_dropped"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        (0, 0)
    }
}
