pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod system;

pub use config::{GpuSourceConfig, SenderConfig};
pub use error::{HostPulseError, Result};
pub use metrics::{CpuSnapshot, MetricsSnapshot, RamSnapshot, ThroughputRates};
pub use payload::{topic_for_host, MetricsPayload};
pub use system::{GpuAcquisition, GpuSource, GpuTelemetry, MetricReading};
