// Raw sample collection via sysinfo. Throughputs are computed as byte deltas
// between consecutive samples, so the first sample carries no throughput.

use crate::models::RawSample;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Networks, System};
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
struct DiskCounters {
    read_bytes: u64,
    write_bytes: u64,
}

pub struct Collector {
    sys: Arc<std::sync::Mutex<System>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    last_cpu: Arc<std::sync::Mutex<Option<(Instant, f64)>>>,
    last_network: Arc<std::sync::Mutex<Option<(u64, u64, Instant)>>>,
    last_disk: Arc<std::sync::Mutex<Option<(DiskCounters, Instant)>>>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            networks: Arc::new(std::sync::Mutex::new(networks)),
            last_cpu: Arc::new(std::sync::Mutex::new(None)),
            last_network: Arc::new(std::sync::Mutex::new(None)),
            last_disk: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Take one raw sample of the machine. Counters that cannot be read on
    /// this platform (or on the first call, for deltas) come back as `None`.
    #[instrument(skip(self), fields(repo = "collector", operation = "sample"))]
    pub async fn sample(&self) -> anyhow::Result<RawSample> {
        let sys = self.sys.clone();
        let networks = self.networks.clone();
        let last_cpu = self.last_cpu.clone();
        let last_network = self.last_network.clone();
        let last_disk = self.last_disk.clone();

        tokio::task::spawn_blocking(move || {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_millis() as i64;
            let now = Instant::now();

            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;

            // CPU usage needs time between refreshes; reuse the cached value
            // when called faster than sysinfo's minimum interval.
            let cpu_usage = {
                let mut guard = last_cpu
                    .lock()
                    .map_err(|e| anyhow::anyhow!("cpu cache lock poisoned: {}", e))?;
                match *guard {
                    Some((prev_ts, prev_usage))
                        if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                    {
                        prev_usage
                    }
                    _ => {
                        sys.refresh_cpu_all();
                        let usage = (sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
                        *guard = Some((now, usage));
                        usage
                    }
                }
            };

            sys.refresh_memory();
            let memory_usage_bytes = sys.used_memory() as f64;
            let memory_capacity_bytes = sys.total_memory() as f64;

            let (net_rx_kbs, net_tx_kbs) = {
                let mut networks = networks
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
                networks.refresh(true);
                let (mut rx_total, mut tx_total) = (0u64, 0u64);
                for (_, data) in networks.list() {
                    rx_total = rx_total.saturating_add(data.total_received());
                    tx_total = tx_total.saturating_add(data.total_transmitted());
                }

                let mut guard = last_network
                    .lock()
                    .map_err(|e| anyhow::anyhow!("network cache lock poisoned: {}", e))?;
                let rates = guard.map(|(prev_rx, prev_tx, prev_ts)| {
                    let dt = now.duration_since(prev_ts).as_secs_f64();
                    if dt > 0.0 {
                        (
                            rx_total.saturating_sub(prev_rx) as f64 / dt / 1024.0,
                            tx_total.saturating_sub(prev_tx) as f64 / dt / 1024.0,
                        )
                    } else {
                        (0.0, 0.0)
                    }
                });
                *guard = Some((rx_total, tx_total, now));
                match rates {
                    Some((rx, tx)) => (Some(rx), Some(tx)),
                    None => (None, None),
                }
            };

            let (disk_read_kbs, disk_write_kbs) = {
                match read_disk_counters() {
                    Some(current) => {
                        let mut guard = last_disk
                            .lock()
                            .map_err(|e| anyhow::anyhow!("disk cache lock poisoned: {}", e))?;
                        let rates = guard.map(|(prev, prev_ts)| {
                            let dt = now.duration_since(prev_ts).as_secs_f64();
                            if dt > 0.0 {
                                (
                                    current.read_bytes.saturating_sub(prev.read_bytes) as f64
                                        / dt
                                        / 1024.0,
                                    current.write_bytes.saturating_sub(prev.write_bytes) as f64
                                        / dt
                                        / 1024.0,
                                )
                            } else {
                                (0.0, 0.0)
                            }
                        });
                        *guard = Some((current, now));
                        match rates {
                            Some((r, w)) => (Some(r), Some(w)),
                            None => (None, None),
                        }
                    }
                    None => (None, None),
                }
            };

            Ok(RawSample {
                timestamp,
                cpu_usage_percent: Some(cpu_usage),
                memory_usage_bytes: Some(memory_usage_bytes),
                memory_capacity_bytes: Some(memory_capacity_bytes),
                disk_read_throughput_kbs: disk_read_kbs,
                disk_write_throughput_kbs: disk_write_kbs,
                network_received_throughput_kbs: net_rx_kbs,
                network_transmitted_throughput_kbs: net_tx_kbs,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("collector task join: {}", e))?
    }
}

/// Cumulative read/write bytes summed over physical disks from
/// /proc/diskstats (Linux). None on other platforms or when unreadable.
fn read_disk_counters() -> Option<DiskCounters> {
    #[cfg(target_os = "linux")]
    {
        const SECTOR_SIZE: u64 = 512;
        let content = std::fs::read_to_string("/proc/diskstats").ok()?;
        let (mut read_bytes, mut write_bytes) = (0u64, 0u64);
        for line in content.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // major minor name reads .. sectors_read(idx 5) .. sectors_written(idx 9)
            if fields.len() < 10 || !is_physical_disk(fields[2]) {
                continue;
            }
            let sectors_read: u64 = fields[5].parse().ok()?;
            let sectors_written: u64 = fields[9].parse().ok()?;
            read_bytes = read_bytes.saturating_add(sectors_read * SECTOR_SIZE);
            write_bytes = write_bytes.saturating_add(sectors_written * SECTOR_SIZE);
        }
        return Some(DiskCounters {
            read_bytes,
            write_bytes,
        });
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Whole physical devices only; partitions and virtual devices would double
/// count their parent's sectors.
#[cfg(target_os = "linux")]
fn is_physical_disk(name: &str) -> bool {
    if name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("zram")
        || name.starts_with("dm-")
        || name.starts_with("md")
        || name.starts_with("sr")
    {
        return false;
    }
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        // nvme0n1 is a device, nvme0n1p1 a partition
        return !name.contains('p') || !name.rsplit('p').next().is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()));
    }
    // sda / vda / xvda are devices, sda1 etc. partitions
    !name.ends_with(|c: char| c.is_ascii_digit())
}
