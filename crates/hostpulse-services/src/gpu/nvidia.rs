use hostpulse_core::GpuTelemetry;

use crate::numeric::extract_number;

/// Arguments for a CSV query: one line per device, no header, no units.
pub const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu,temperature.gpu,memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

/// Parse `utilization, temperature, memory.used, memory.total` for the first
/// (primary) device. Hotspot and memory temperature are not reported by this
/// query and stay 0.
pub fn parse_csv_telemetry(raw: &str) -> Option<GpuTelemetry> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let line = raw.lines().next()?.trim();
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        return None;
    }

    let usage = extract_number(fields[0])?;
    let temp = extract_number(fields[1])?;
    let used = extract_number(fields[2])?;
    let total = extract_number(fields[3])?;

    let mem_used_pct = if total > 0.0 {
        used / total * 100.0
    } else {
        0.0
    };

    Some(GpuTelemetry {
        usage,
        temp_edge: temp,
        mem_used_pct,
        ..GpuTelemetry::default()
    })
}
