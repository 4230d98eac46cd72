use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest tick the sender will run at
pub const MIN_INTERVAL_SEC: f64 = 0.2;

pub const DEFAULT_INTERVAL_SEC: f64 = 1.0;

pub mod env_keys {
    pub const HOSTNAME: &str = "SENDER_HOSTNAME";
    pub const INTERVAL_SEC: &str = "SEND_INTERVAL_SEC";
    pub const NVIDIA_SMI: &str = "NVIDIA_SMI";
    pub const ROCM_SMI: &str = "ROCM_SMI";
    pub const DRM_ROOT: &str = "GPU_DRM_ROOT";
    pub const PROC_ROOT: &str = "PROC_ROOT";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Explicit host key; `None` means ask the OS
    pub hostname: Option<String>,
    pub interval_sec: f64,
    pub gpu: GpuSourceConfig,
    pub proc_root: PathBuf,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            interval_sec: DEFAULT_INTERVAL_SEC,
            gpu: GpuSourceConfig::default(),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl SenderConfig {
    /// Build from any key lookup. Empty or unparseable values fall back to
    /// the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let interval_sec = get(env_keys::INTERVAL_SEC)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| is_valid_interval(*v))
            .unwrap_or(defaults.interval_sec);

        Self {
            hostname: get(env_keys::HOSTNAME),
            interval_sec,
            gpu: GpuSourceConfig {
                nvidia_smi: get(env_keys::NVIDIA_SMI).unwrap_or(defaults.gpu.nvidia_smi),
                rocm_smi: get(env_keys::ROCM_SMI).unwrap_or(defaults.gpu.rocm_smi),
                drm_root: get(env_keys::DRM_ROOT)
                    .map(PathBuf::from)
                    .unwrap_or(defaults.gpu.drm_root),
            },
            proc_root: get(env_keys::PROC_ROOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.proc_root),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply an interval override. Values that cannot be a tick length are
    /// rejected and leave the current interval in place.
    pub fn set_interval_sec(&mut self, secs: f64) -> bool {
        if !is_valid_interval(secs) {
            return false;
        }
        self.interval_sec = secs;
        true
    }

    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_sec.max(MIN_INTERVAL_SEC))
            .unwrap_or(Duration::from_secs_f64(DEFAULT_INTERVAL_SEC))
    }
}

fn is_valid_interval(secs: f64) -> bool {
    !secs.is_nan() && Duration::try_from_secs_f64(secs.max(MIN_INTERVAL_SEC)).is_ok()
}

/// Where each GPU source looks for its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSourceConfig {
    pub nvidia_smi: String,
    pub rocm_smi: String,
    pub drm_root: PathBuf,
}

impl Default for GpuSourceConfig {
    fn default() -> Self {
        Self {
            nvidia_smi: "nvidia-smi".to_string(),
            rocm_smi: "rocm-smi".to_string(),
            drm_root: PathBuf::from("/sys/class/drm"),
        }
    }
}
