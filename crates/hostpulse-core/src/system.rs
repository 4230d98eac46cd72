//! System-level types for GPU hardware monitoring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized GPU reading for one device.
///
/// Every field defaults to 0 when the source could not provide it. Whether the
/// tuple carries real data is tracked by [`GpuAcquisition`], not by the fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuTelemetry {
    /// Utilization percent
    pub usage: f64,
    /// Edge (primary) temperature in °C
    pub temp_edge: f64,
    /// VRAM used percent
    pub mem_used_pct: f64,
    /// Junction / hotspot temperature in °C
    pub temp_hotspot: f64,
    /// Memory temperature in °C
    pub temp_memory: f64,
}

impl GpuTelemetry {
    /// Wire order: `[usage, temp, memPct, hotspot, memTemp]`
    pub fn to_wire(&self) -> [f64; 5] {
        [
            self.usage,
            self.temp_edge,
            self.mem_used_pct,
            self.temp_hotspot,
            self.temp_memory,
        ]
    }
}

/// A single parsed metric that remembers whether it was found at all.
///
/// Parsers need this to tell a missing sysfs file or an unmatched JSON key
/// apart from a genuine zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricReading {
    pub value: f64,
    pub present: bool,
}

impl MetricReading {
    pub const ABSENT: Self = Self {
        value: 0.0,
        present: false,
    };

    pub fn present(value: f64) -> Self {
        Self {
            value,
            present: true,
        }
    }

    pub fn value_or_zero(&self) -> f64 {
        if self.present {
            self.value
        } else {
            0.0
        }
    }

    /// Keep `self` if present, otherwise take `other`.
    pub fn or(self, other: MetricReading) -> MetricReading {
        if self.present {
            self
        } else {
            other
        }
    }
}

impl From<Option<f64>> for MetricReading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::ABSENT, Self::present)
    }
}

/// Where a GPU reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuSource {
    NvidiaSmi,
    RocmSmi,
    Sysfs,
}

impl GpuSource {
    pub fn label(&self) -> &'static str {
        match self {
            GpuSource::NvidiaSmi => "nvidia-smi",
            GpuSource::RocmSmi => "rocm-smi",
            GpuSource::Sysfs => "sysfs",
        }
    }
}

impl fmt::Display for GpuSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one pass over the GPU source chain.
///
/// `source` is `None` when every source failed; `telemetry` is then all zero
/// but still safe to embed in a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuAcquisition {
    pub telemetry: GpuTelemetry,
    pub source: Option<GpuSource>,
}

impl GpuAcquisition {
    pub fn from_source(source: GpuSource, telemetry: GpuTelemetry) -> Self {
        Self {
            telemetry,
            source: Some(source),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.source.is_some()
    }
}
