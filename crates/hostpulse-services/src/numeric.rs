use regex::Regex;
use std::sync::LazyLock;

static METRIC_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("invalid metric number regex"));

/// First signed decimal number in `raw`, ignoring units and stray text.
///
/// `"41.0 C"` -> 41.0, `"22%"` -> 22.0, `"N/A"` -> `None`.
pub fn extract_number(raw: &str) -> Option<f64> {
    let found = METRIC_NUMBER_RE.find(raw)?;
    found.as_str().parse::<f64>().ok()
}
