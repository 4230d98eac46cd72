//! Service container for the sampling loop
//!
//! Owns every stateful sampler. The loop calls [`Services::tick`] once per
//! interval and gets a complete snapshot back; nothing in here blocks on
//! anything slower than a vendor CLI invocation.

use std::time::{SystemTime, UNIX_EPOCH};

use hostpulse_core::{GpuAcquisition, GpuSource, MetricsSnapshot, SenderConfig, ThroughputRates};
use tracing::{info, warn};

use crate::counters::{CounterSnapshot, NetworkCounters, ProcCounters};
use crate::gpu::GpuMonitor;
use crate::host::{resolve_hostname, HostSampler};
use crate::rate_sampler::RateSampler;

pub struct Services {
    hostname: String,
    gpu: GpuMonitor,
    host: HostSampler,
    network: NetworkCounters,
    disk: ProcCounters,
    rates: RateSampler,
    /// Last GPU source that was logged, `None` until the first tick
    gpu_source_logged: Option<Option<GpuSource>>,
}

impl Services {
    pub fn from_config(config: &SenderConfig) -> Self {
        Self {
            hostname: resolve_hostname(config.hostname.as_deref()),
            gpu: GpuMonitor::new(config.gpu.clone()),
            host: HostSampler::new(),
            network: NetworkCounters::new(),
            disk: ProcCounters::new(config.proc_root.clone()),
            rates: RateSampler::new(),
            gpu_source_logged: None,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn gpu_monitor(&self) -> &GpuMonitor {
        &self.gpu
    }

    /// Sample everything once. The first tick only primes the rate baseline,
    /// so its throughput is zero.
    pub fn tick(&mut self) -> MetricsSnapshot {
        let cpu = self.host.cpu();
        let ram = self.host.ram();

        let acquisition = self.gpu.acquire();
        self.log_gpu_source(&acquisition);

        // A failed read leaves the baseline where it was.
        let rates = match self.disk.read_disk() {
            Ok(disk) => {
                let net = self.network.read();
                self.rates.sample(CounterSnapshot::now(net, disk))
            }
            Err(e) => {
                warn!("Throughput counters unavailable: {}", e);
                ThroughputRates::ZERO
            }
        };

        MetricsSnapshot {
            hostname: self.hostname.clone(),
            timestamp_ms: unix_millis(),
            cpu,
            ram,
            gpu: acquisition.telemetry,
            rates,
        }
    }

    fn log_gpu_source(&mut self, acquisition: &GpuAcquisition) {
        if self.gpu_source_logged == Some(acquisition.source) {
            return;
        }
        self.gpu_source_logged = Some(acquisition.source);

        match acquisition.source {
            Some(source) => info!(%source, "GPU telemetry source selected"),
            None => warn!("No GPU telemetry source available, reporting zeros"),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::DrmFixture;
    use hostpulse_core::GpuSourceConfig;
    use std::fs;
    use std::path::Path;

    fn write_diskstats(proc_root: &Path, sectors: u64) {
        fs::write(
            proc_root.join("diskstats"),
            format!("8 0 sda 1 0 {sectors} 0 1 0 0 0 0 0 0\n"),
        )
        .unwrap();
    }

    fn config(fx: &DrmFixture, proc_root: &Path) -> SenderConfig {
        SenderConfig {
            hostname: Some("bench-01".to_string()),
            interval_sec: 1.0,
            gpu: GpuSourceConfig {
                nvidia_smi: "/nonexistent/nvidia-smi".to_string(),
                rocm_smi: "/nonexistent/rocm-smi".to_string(),
                drm_root: fx.root().to_path_buf(),
            },
            proc_root: proc_root.to_path_buf(),
        }
    }

    #[test]
    fn test_tick_collects_snapshot() {
        let fx = DrmFixture::new();
        fx.device_file("card0", "gpu_busy_percent", "66\n")
            .sensor("card0", "hwmon0", 1, Some("edge\n"), "52000\n");
        let proc_dir = tempfile::tempdir().unwrap();
        write_diskstats(proc_dir.path(), 10);

        let mut services = Services::from_config(&config(&fx, proc_dir.path()));
        let first = services.tick();

        assert_eq!(first.hostname, "bench-01");
        assert!(first.timestamp_ms > 0);
        assert_eq!(first.gpu.usage, 66.0);
        assert_eq!(first.gpu.temp_edge, 52.0);
        assert_eq!(first.rates, ThroughputRates::ZERO);

        write_diskstats(proc_dir.path(), 10 + 2048);
        let second = services.tick();
        assert!(second.rates.disk_read_kibps > 0.0);
        assert_eq!(second.rates.disk_write_kibps, 0.0);
        assert!(second.rates.net_rx_kibps >= 0.0);
    }

    #[test]
    fn test_missing_counters_report_zero() {
        let fx = DrmFixture::new();
        let proc_dir = tempfile::tempdir().unwrap();

        let mut services = Services::from_config(&config(&fx, proc_dir.path()));
        let snapshot = services.tick();
        assert_eq!(snapshot.rates, ThroughputRates::ZERO);
        assert_eq!(snapshot.gpu, Default::default());

        // the first successful read is still treated as the baseline
        write_diskstats(proc_dir.path(), 5_000);
        assert_eq!(services.tick().rates, ThroughputRates::ZERO);
    }
}
