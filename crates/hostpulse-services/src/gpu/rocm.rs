use hostpulse_core::{GpuTelemetry, MetricReading};
use serde_json::{Map, Value};

use crate::numeric::extract_number;

pub const QUERY_ARGS: [&str; 4] = ["--showuse", "--showtemp", "--showmemuse", "--json"];

/// Matches a lower-cased metric label that contains every `all` token and at
/// least one `any` token. Label text varies between tool versions, so exact
/// names are never compared.
#[derive(Debug, Clone, Copy)]
struct KeyMatcher {
    all: &'static [&'static str],
    any: &'static [&'static str],
}

impl KeyMatcher {
    fn matches(&self, key_lower: &str) -> bool {
        self.all.iter().all(|t| key_lower.contains(t))
            && (self.any.is_empty() || self.any.iter().any(|t| key_lower.contains(t)))
    }
}

const USAGE: KeyMatcher = KeyMatcher {
    all: &["gpu"],
    any: &["use", "busy", "util"],
};
const TEMP_EDGE: KeyMatcher = KeyMatcher {
    all: &["temp", "edge"],
    any: &[],
};
const TEMP_JUNCTION: KeyMatcher = KeyMatcher {
    all: &["temp"],
    any: &["junction", "hotspot", "hot"],
};
const TEMP_MEMORY: KeyMatcher = KeyMatcher {
    all: &["temp"],
    any: &["memory", "mem"],
};
const VRAM_PERCENT: KeyMatcher = KeyMatcher {
    all: &["vram"],
    any: &["%", "alloc", "use", "used"],
};
const MEMORY_PERCENT: KeyMatcher = KeyMatcher {
    all: &["memory"],
    any: &["vram", "alloc", "use", "used", "%"],
};

/// Parse a JSON object keyed by card id (`{"card0": {"GPU use (%)": "7", ...}}`).
///
/// Only the first `card*` entry is read. Succeeds when at least one of usage,
/// edge temperature, junction temperature or memory percent resolves.
pub fn parse_json_telemetry(raw: &str) -> Option<GpuTelemetry> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed: Map<String, Value> = serde_json::from_str(raw).ok()?;
    let card = parsed.iter().find_map(|(key, value)| {
        if key.to_lowercase().starts_with("card") {
            value.as_object()
        } else {
            None
        }
    })?;

    let usage = resolve(card, &USAGE);
    let edge = resolve(card, &TEMP_EDGE);
    let junction = resolve(card, &TEMP_JUNCTION);
    let mem_temp = resolve(card, &TEMP_MEMORY);
    let mem_pct = resolve(card, &VRAM_PERCENT).or(resolve(card, &MEMORY_PERCENT));

    if !(usage.present || edge.present || junction.present || mem_pct.present) {
        return None;
    }

    Some(GpuTelemetry {
        usage: usage.value_or_zero(),
        temp_edge: edge.or(junction).value_or_zero(),
        mem_used_pct: mem_pct.value_or_zero(),
        temp_hotspot: junction.value_or_zero(),
        temp_memory: mem_temp.value_or_zero(),
    })
}

/// First key (document order) that matches and holds something numeric
fn resolve(metrics: &Map<String, Value>, matcher: &KeyMatcher) -> MetricReading {
    metrics
        .iter()
        .filter(|(key, _)| matcher.matches(&key.to_lowercase()))
        .find_map(|(_, value)| coerce(value))
        .into()
}

fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => extract_number(s),
        other => extract_number(&other.to_string()),
    }
}
