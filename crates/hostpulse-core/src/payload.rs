//! Metrics v2 wire payload.
//!
//! Field names and array shapes are a contract with the display firmware and
//! must not change: `gpu` is always `[usage, temp, memPct, hotspot, memTemp]`.

use serde::{Deserialize, Serialize};

use crate::{MetricsSnapshot, Result};

pub const PAYLOAD_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsPayload {
    #[serde(rename = "v")]
    pub version: u32,
    pub ts: u64,
    #[serde(rename = "h")]
    pub host: String,
    /// `[percent, temp_c]`
    pub cpu: [f64; 2],
    /// `[percent, used_mb, total_mb]`
    pub ram: (f64, u64, u64),
    pub gpu: [f64; 5],
    /// `[rx_kbps, tx_kbps]`
    pub net: [i64; 2],
    /// `[read_kBps, write_kBps]`
    pub disk: [i64; 2],
}

impl MetricsPayload {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let gpu = snapshot.gpu.to_wire().map(round1);
        Self {
            version: PAYLOAD_VERSION,
            ts: snapshot.timestamp_ms,
            host: snapshot.hostname.clone(),
            cpu: [round1(snapshot.cpu.percent), round1(snapshot.cpu.temp_c)],
            ram: (
                round1(snapshot.ram.percent),
                snapshot.ram.used_mb,
                snapshot.ram.total_mb,
            ),
            gpu,
            net: [
                snapshot.rates.net_rx_kibps as i64,
                snapshot.rates.net_tx_kibps as i64,
            ],
            disk: [
                snapshot.rates.disk_read_kibps as i64,
                snapshot.rates.disk_write_kibps as i64,
            ],
        }
    }

    /// Compact single-line JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn topic_for_host(hostname: &str) -> String {
    format!("sys/agents/{}/metrics/v2", hostname)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
