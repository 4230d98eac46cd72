use hostpulse_core::{CpuSnapshot, RamSnapshot};
use sysinfo::{Components, System};

/// Sensor families that report the CPU package, most specific first
const CPU_SENSOR_PRIORITY: [&str; 3] = ["k10temp", "coretemp", "cpu_thermal"];

const MIB: u64 = 1024 * 1024;

/// CPU and memory readings straight from the OS
pub struct HostSampler {
    system: System,
    components: Components,
}

impl HostSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; prime it so the first tick is meaningful.
        system.refresh_cpu_usage();
        Self {
            system,
            components: Components::new_with_refreshed_list(),
        }
    }

    pub fn cpu(&mut self) -> CpuSnapshot {
        self.system.refresh_cpu_usage();
        self.components.refresh(false);

        let readings: Vec<(String, f32)> = self
            .components
            .iter()
            .filter_map(|c| c.temperature().map(|t| (c.label().to_string(), t)))
            .collect();

        CpuSnapshot {
            percent: f64::from(self.system.global_cpu_usage()),
            temp_c: pick_cpu_temp(&readings),
        }
    }

    pub fn ram(&mut self) -> RamSnapshot {
        self.system.refresh_memory();
        ram_snapshot(self.system.used_memory(), self.system.total_memory())
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicit name, else the OS hostname, else `"unknown"`
pub fn resolve_hostname(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(System::host_name)
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn pick_cpu_temp(readings: &[(String, f32)]) -> f64 {
    CPU_SENSOR_PRIORITY
        .iter()
        .find_map(|family| {
            readings
                .iter()
                .find(|(label, _)| label.to_lowercase().contains(family))
        })
        .or_else(|| readings.first())
        .map_or(0.0, |(_, t)| f64::from(*t))
}

fn ram_snapshot(used_bytes: u64, total_bytes: u64) -> RamSnapshot {
    let percent = if total_bytes > 0 {
        used_bytes as f64 / total_bytes as f64 * 100.0
    } else {
        0.0
    };
    RamSnapshot {
        percent,
        used_mb: used_bytes / MIB,
        total_mb: total_bytes / MIB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|(l, t)| (l.to_string(), *t)).collect()
    }

    #[test]
    fn test_cpu_temp_priority() {
        let r = readings(&[
            ("nvme Composite", 40.0),
            ("coretemp Package id 0", 55.0),
            ("k10temp Tctl", 61.5),
        ]);
        assert_eq!(pick_cpu_temp(&r), 61.5);

        let r = readings(&[("acpitz temp1", 30.0), ("coretemp Core 0", 52.0)]);
        assert_eq!(pick_cpu_temp(&r), 52.0);
    }

    #[test]
    fn test_cpu_temp_fallbacks() {
        assert_eq!(pick_cpu_temp(&readings(&[("acpitz temp1", 30.0)])), 30.0);
        assert_eq!(pick_cpu_temp(&[]), 0.0);
    }

    #[test]
    fn test_ram_snapshot() {
        let ram = ram_snapshot(12 * 1024 * MIB, 32 * 1024 * MIB);
        assert_eq!(ram.used_mb, 12288);
        assert_eq!(ram.total_mb, 32768);
        assert_eq!(ram.percent, 37.5);

        assert_eq!(ram_snapshot(0, 0).percent, 0.0);
    }

    #[test]
    fn test_resolve_hostname() {
        assert_eq!(resolve_hostname(Some("desk")), "desk");
        assert!(!resolve_hostname(None).is_empty());
    }
}
