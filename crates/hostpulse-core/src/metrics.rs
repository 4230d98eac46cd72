use serde::{Deserialize, Serialize};

use crate::GpuTelemetry;

/// Per-second throughput derived from cumulative counters, in KiB/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputRates {
    pub net_rx_kibps: f64,
    pub net_tx_kibps: f64,
    pub disk_read_kibps: f64,
    pub disk_write_kibps: f64,
}

impl ThroughputRates {
    pub const ZERO: Self = Self {
        net_rx_kibps: 0.0,
        net_tx_kibps: 0.0,
        disk_read_kibps: 0.0,
        disk_write_kibps: 0.0,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub percent: f64,
    pub temp_c: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RamSnapshot {
    pub percent: f64,
    pub used_mb: u64,
    pub total_mb: u64,
}

/// Everything sampled during one tick, before it is shaped for the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hostname: String,
    pub timestamp_ms: u64,
    pub cpu: CpuSnapshot,
    pub ram: RamSnapshot,
    pub gpu: GpuTelemetry,
    pub rates: ThroughputRates,
}
