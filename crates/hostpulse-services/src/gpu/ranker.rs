use hostpulse_core::GpuTelemetry;
use std::cmp::Ordering;

use super::sysfs::SysfsCardCandidate;

/// Order two readings by how busy the GPU looks.
///
/// Each step only decides when every earlier step tied:
/// active usage, usage, active memory, memory percent, hotspot,
/// edge temperature, memory temperature.
pub fn compare_activity(a: &GpuTelemetry, b: &GpuTelemetry) -> Ordering {
    (a.usage > 0.0)
        .cmp(&(b.usage > 0.0))
        .then_with(|| cmp_f64(a.usage, b.usage))
        .then_with(|| (a.mem_used_pct > 0.0).cmp(&(b.mem_used_pct > 0.0)))
        .then_with(|| cmp_f64(a.mem_used_pct, b.mem_used_pct))
        .then_with(|| cmp_f64(a.temp_hotspot, b.temp_hotspot))
        .then_with(|| cmp_f64(a.temp_edge, b.temp_edge))
        .then_with(|| cmp_f64(a.temp_memory, b.temp_memory))
}

/// Pick the busiest card. On a full tie the earlier candidate is kept.
pub fn select_most_active<I>(candidates: I) -> Option<SysfsCardCandidate>
where
    I: IntoIterator<Item = SysfsCardCandidate>,
{
    candidates.into_iter().reduce(|best, candidate| {
        if compare_activity(&candidate.telemetry, &best.telemetry) == Ordering::Greater {
            candidate
        } else {
            best
        }
    })
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
