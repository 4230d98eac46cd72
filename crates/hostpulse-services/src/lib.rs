mod counters;
pub mod gpu;
mod host;
mod numeric;
mod rate_sampler;
mod services;
#[cfg(test)]
mod test_support;

pub use counters::{
    parse_diskstats, ByteTotals, CounterError, CounterSnapshot, NetworkCounters, ProcCounters,
};
pub use gpu::{acquire_gpu_telemetry, GpuMonitor, GpuSourceError};
pub use host::{resolve_hostname, HostSampler};
pub use numeric::extract_number;
pub use rate_sampler::RateSampler;
pub use services::Services;

// Re-export core types so the CLI only needs this crate for sampling
pub use hostpulse_core::{
    GpuAcquisition, GpuSource, GpuSourceConfig, GpuTelemetry, MetricsPayload, MetricsSnapshot,
    SenderConfig, ThroughputRates,
};
