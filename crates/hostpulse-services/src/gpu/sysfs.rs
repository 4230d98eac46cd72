use hostpulse_core::{GpuTelemetry, MetricReading};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::numeric::extract_number;

static CARD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^card\d+$").expect("invalid card name regex"));

/// One card's telemetry, waiting to be ranked against its siblings
#[derive(Debug, Clone, PartialEq)]
pub struct SysfsCardCandidate {
    pub card_path: PathBuf,
    pub telemetry: GpuTelemetry,
}

/// Read every `card<N>` under `root` (lexicographic order) and keep the ones
/// that reported at least one metric. Fails only if `root` cannot be listed.
pub fn read_card_candidates(root: &Path) -> io::Result<Vec<SysfsCardCandidate>> {
    let mut candidates = Vec::new();

    for (name, card_path) in sorted_entries(root)? {
        if !CARD_NAME_RE.is_match(&name) || !card_path.is_dir() {
            continue;
        }
        match read_card(&card_path) {
            Some(telemetry) => candidates.push(SysfsCardCandidate {
                card_path,
                telemetry,
            }),
            None => debug!("Skipping {:?}: no readable GPU attributes", card_path),
        }
    }

    Ok(candidates)
}

fn read_card(card_path: &Path) -> Option<GpuTelemetry> {
    let device = card_path.join("device");
    if !device.is_dir() {
        return None;
    }

    let usage = read_first_metric(&[
        device.join("gpu_busy_percent"),
        device.join("gt_busy_percent"),
    ]);
    let mem_pct = read_vram_percent(&device).or(read_metric(&device.join("mem_busy_percent")));
    let temps = read_hwmon_temps(&device);

    if !(usage.present
        || mem_pct.present
        || temps.edge.present
        || temps.junction.present
        || temps.memory.present)
    {
        return None;
    }

    Some(GpuTelemetry {
        usage: usage.value_or_zero(),
        temp_edge: temps.edge.or(temps.junction).value_or_zero(),
        mem_used_pct: mem_pct.value_or_zero(),
        temp_hotspot: temps.junction.value_or_zero(),
        temp_memory: temps.memory.value_or_zero(),
    })
}

fn read_vram_percent(device: &Path) -> MetricReading {
    let used = read_metric(&device.join("mem_info_vram_used"));
    let total = read_metric(&device.join("mem_info_vram_total"));
    if !used.present || !total.present || total.value <= 0.0 {
        return MetricReading::ABSENT;
    }
    MetricReading::present(used.value / total.value * 100.0)
}

/// Temperature slot a hwmon sensor can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempSlot {
    Edge,
    Junction,
    Memory,
}

struct LabelRule {
    slot: TempSlot,
    matches: fn(&str) -> bool,
}

fn is_junction_label(label: &str) -> bool {
    label.contains("junction") || label.contains("hotspot") || label == "hot"
}

fn is_edge_label(label: &str) -> bool {
    label.contains("edge")
}

fn is_memory_label(label: &str) -> bool {
    label.contains("mem")
}

/// Checked top to bottom; the first rule that matches decides the slot.
const LABEL_RULES: [LabelRule; 3] = [
    LabelRule {
        slot: TempSlot::Junction,
        matches: is_junction_label,
    },
    LabelRule {
        slot: TempSlot::Edge,
        matches: is_edge_label,
    },
    LabelRule {
        slot: TempSlot::Memory,
        matches: is_memory_label,
    },
];

/// Slots an unrecognized label may fill, in priority order
const UNLABELLED_ORDER: [TempSlot; 3] = [TempSlot::Edge, TempSlot::Junction, TempSlot::Memory];

/// Classify a lower-cased, trimmed sensor label. `None` means no rule matched.
pub fn classify_label(label: &str) -> Option<TempSlot> {
    LABEL_RULES
        .iter()
        .find(|rule| (rule.matches)(label))
        .map(|rule| rule.slot)
}

#[derive(Debug, Default, Clone, Copy)]
struct TempSlots {
    edge: MetricReading,
    junction: MetricReading,
    memory: MetricReading,
}

impl TempSlots {
    fn slot_mut(&mut self, slot: TempSlot) -> &mut MetricReading {
        match slot {
            TempSlot::Edge => &mut self.edge,
            TempSlot::Junction => &mut self.junction,
            TempSlot::Memory => &mut self.memory,
        }
    }

    fn is_filled(&self, slot: TempSlot) -> bool {
        match slot {
            TempSlot::Edge => self.edge.present,
            TempSlot::Junction => self.junction.present,
            TempSlot::Memory => self.memory.present,
        }
    }

    /// Each slot is written once; later readings for a full slot are dropped.
    fn assign(&mut self, class: Option<TempSlot>, temp_c: f64) {
        let target = match class {
            Some(slot) => Some(slot),
            None => UNLABELLED_ORDER
                .into_iter()
                .find(|slot| !self.is_filled(*slot)),
        };
        if let Some(slot) = target {
            let reading = self.slot_mut(slot);
            if !reading.present {
                *reading = MetricReading::present(temp_c);
            }
        }
    }
}

fn read_hwmon_temps(device: &Path) -> TempSlots {
    let mut slots = TempSlots::default();
    let Ok(hwmons) = sorted_entries(&device.join("hwmon")) else {
        return slots;
    };

    for (_, hwmon) in hwmons.into_iter().filter(|(_, p)| p.is_dir()) {
        let Ok(entries) = sorted_entries(&hwmon) else {
            continue;
        };
        // String order on purpose: temp10_input is visited before temp2_input.
        let inputs = entries.into_iter().filter_map(|(name, path)| {
            let stem = name.strip_suffix("_input")?;
            stem.starts_with("temp").then(|| (stem.to_string(), path))
        });

        for (stem, input) in inputs {
            let raw = read_metric(&input);
            if !raw.present {
                continue;
            }
            let temp_c = normalize_temp(raw.value);

            let label_path = input.with_file_name(format!("{stem}_label"));
            let label = fs::read_to_string(label_path)
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default();

            trace!("{:?} label={:?} temp={}", input, label, temp_c);
            slots.assign(classify_label(&label), temp_c);
        }
    }

    slots
}

/// hwmon reports millidegrees; small magnitudes are taken as already in °C.
pub fn normalize_temp(raw: f64) -> f64 {
    if raw.abs() >= 200.0 {
        raw / 1000.0
    } else {
        raw
    }
}

fn read_metric(path: &Path) -> MetricReading {
    fs::read_to_string(path)
        .ok()
        .and_then(|body| extract_number(&body))
        .into()
}

fn read_first_metric(paths: &[PathBuf]) -> MetricReading {
    paths
        .iter()
        .map(|p| read_metric(p))
        .find(|reading| reading.present)
        .unwrap_or(MetricReading::ABSENT)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut entries: Vec<(String, PathBuf)> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
