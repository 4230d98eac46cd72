use hostpulse_core::ThroughputRates;

use crate::counters::CounterSnapshot;

#[derive(Debug, Clone, Copy)]
enum SamplerState {
    Uninitialized,
    Primed(CounterSnapshot),
}

/// Turns cumulative byte counters into KiB/s rates between consecutive calls.
///
/// Owned by the sampling loop; one instance per process.
#[derive(Debug, Clone)]
pub struct RateSampler {
    state: SamplerState,
}

impl RateSampler {
    pub fn new() -> Self {
        Self {
            state: SamplerState::Uninitialized,
        }
    }

    pub fn is_primed(&self) -> bool {
        matches!(self.state, SamplerState::Primed(_))
    }

    /// The first call only records a baseline and returns zero rates.
    pub fn sample(&mut self, current: CounterSnapshot) -> ThroughputRates {
        let previous = std::mem::replace(&mut self.state, SamplerState::Primed(current));
        let SamplerState::Primed(baseline) = previous else {
            return ThroughputRates::ZERO;
        };

        let mut elapsed = current
            .taken_at
            .saturating_duration_since(baseline.taken_at)
            .as_secs_f64();
        if elapsed <= 0.0 {
            elapsed = 1.0;
        }

        ThroughputRates {
            net_rx_kibps: kib_per_sec(current.net_rx_bytes, baseline.net_rx_bytes, elapsed),
            net_tx_kibps: kib_per_sec(current.net_tx_bytes, baseline.net_tx_bytes, elapsed),
            disk_read_kibps: kib_per_sec(current.disk_read_bytes, baseline.disk_read_bytes, elapsed),
            disk_write_kibps: kib_per_sec(
                current.disk_write_bytes,
                baseline.disk_write_bytes,
                elapsed,
            ),
        }
    }
}

impl Default for RateSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter resets floor at zero instead of going negative
fn kib_per_sec(current: u64, baseline: u64, elapsed_sec: f64) -> f64 {
    ((current as f64 - baseline as f64) / elapsed_sec / 1024.0).max(0.0)
}
