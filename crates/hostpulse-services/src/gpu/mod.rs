mod monitor;
mod nvidia;
mod ranker;
mod rocm;
mod sysfs;

pub use monitor::{acquire_gpu_telemetry, GpuMonitor, GpuSourceError};
pub use nvidia::parse_csv_telemetry;
pub use ranker::{compare_activity, select_most_active};
pub use rocm::parse_json_telemetry;
pub use sysfs::{classify_label, normalize_temp, read_card_candidates, SysfsCardCandidate, TempSlot};
