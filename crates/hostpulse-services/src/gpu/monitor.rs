use hostpulse_core::{GpuAcquisition, GpuSource, GpuSourceConfig, GpuTelemetry};
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{nvidia, ranker, rocm, sysfs};

#[derive(Error, Debug)]
pub enum GpuSourceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Failed to execute {program}: {source}")]
    ExecutionFailed {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: ExitStatus },
    #[error("Unrecognized {0} output")]
    Malformed(GpuSource),
    #[error("Failed to list {path:?}: {source}")]
    SysfsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No GPU card under {0:?} reported telemetry")]
    NoCandidates(PathBuf),
}

pub type Result<T> = std::result::Result<T, GpuSourceError>;

type SourceFn = fn(&GpuSourceConfig) -> Result<GpuTelemetry>;

/// Tried top to bottom; the first source that runs and parses wins.
const SOURCE_CHAIN: [(GpuSource, SourceFn); 3] = [
    (GpuSource::NvidiaSmi, read_nvidia_smi),
    (GpuSource::RocmSmi, read_rocm_smi),
    (GpuSource::Sysfs, read_sysfs),
];

/// Walk the source chain once. Never fails: when no source answers the
/// result is all zero and `is_ok()` is false.
#[instrument(skip_all)]
pub fn acquire_gpu_telemetry(config: &GpuSourceConfig) -> GpuAcquisition {
    for (source, read) in SOURCE_CHAIN {
        match read(config) {
            Ok(telemetry) => {
                debug!(%source, ?telemetry, "GPU telemetry acquired");
                return GpuAcquisition::from_source(source, telemetry);
            }
            Err(e) => debug!(%source, "GPU source unavailable: {}", e),
        }
    }

    debug!("No GPU source produced telemetry");
    GpuAcquisition::unavailable()
}

/// Owns the source configuration for the sampling loop
#[derive(Debug, Clone, Default)]
pub struct GpuMonitor {
    config: GpuSourceConfig,
}

impl GpuMonitor {
    pub fn new(config: GpuSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GpuSourceConfig {
        &self.config
    }

    pub fn acquire(&self) -> GpuAcquisition {
        acquire_gpu_telemetry(&self.config)
    }

    /// Run every source regardless of earlier successes, for diagnostics
    pub fn probe(&self) -> Vec<(GpuSource, Result<GpuTelemetry>)> {
        SOURCE_CHAIN
            .iter()
            .map(|(source, read)| (*source, read(&self.config)))
            .collect()
    }
}

fn read_nvidia_smi(config: &GpuSourceConfig) -> Result<GpuTelemetry> {
    let raw = run_vendor_cli(&config.nvidia_smi, &nvidia::QUERY_ARGS)?;
    nvidia::parse_csv_telemetry(&raw).ok_or(GpuSourceError::Malformed(GpuSource::NvidiaSmi))
}

fn read_rocm_smi(config: &GpuSourceConfig) -> Result<GpuTelemetry> {
    let raw = run_vendor_cli(&config.rocm_smi, &rocm::QUERY_ARGS)?;
    rocm::parse_json_telemetry(&raw).ok_or(GpuSourceError::Malformed(GpuSource::RocmSmi))
}

fn read_sysfs(config: &GpuSourceConfig) -> Result<GpuTelemetry> {
    let root = &config.drm_root;
    let candidates =
        sysfs::read_card_candidates(root).map_err(|source| GpuSourceError::SysfsUnreadable {
            path: root.clone(),
            source,
        })?;

    let best = ranker::select_most_active(candidates)
        .ok_or_else(|| GpuSourceError::NoCandidates(root.clone()))?;
    debug!("Selected {:?}", best.card_path);
    Ok(best.telemetry)
}

/// Run a vendor tool and return its stdout. Stderr is discarded.
fn run_vendor_cli(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => Ok(String::from_utf8_lossy(&out.stdout).into_owned()),
        Ok(out) => Err(GpuSourceError::NonZeroExit {
            program: program.to_string(),
            status: out.status,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(GpuSourceError::NotFound(program.to_string()))
        }
        Err(e) => Err(GpuSourceError::ExecutionFailed {
            program: program.to_string(),
            source: e,
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::DrmFixture;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    const ROCM_JSON: &str = r#"{"card0":{"Temp Edge (C)":"41.0","Temp Junction (C)":"56.0","Temp Memory (C)":"66.0","GPU Busy (%)":"19","VRAM use (%)":"22"}}"#;

    /// Write an executable that ignores its arguments and prints `stdout`
    fn stub_program(dir: &Path, name: &str, stdout: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\ncat <<'OUT'\n{stdout}\nOUT\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn busy_drm() -> DrmFixture {
        let fx = DrmFixture::new();
        fx.device_file("card0", "gpu_busy_percent", "88\n")
            .sensor("card0", "hwmon0", 1, Some("edge\n"), "70000\n");
        fx
    }

    fn config(nvidia: &str, rocm: &str, fx: &DrmFixture) -> GpuSourceConfig {
        GpuSourceConfig {
            nvidia_smi: nvidia.to_string(),
            rocm_smi: rocm.to_string(),
            drm_root: fx.root().to_path_buf(),
        }
    }

    #[test]
    fn test_vendor_cli_outcomes() {
        let out = run_vendor_cli("echo", &["19,41,1000,2000"]).unwrap();
        let parsed = nvidia::parse_csv_telemetry(&out).unwrap();
        assert_eq!(parsed.to_wire(), [19.0, 41.0, 50.0, 0.0, 0.0]);

        assert!(matches!(
            run_vendor_cli("false", &[]),
            Err(GpuSourceError::NonZeroExit { .. })
        ));
        assert!(matches!(
            run_vendor_cli("/nonexistent/hostpulse-smi", &[]),
            Err(GpuSourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_csv_source_wins_when_everything_answers() {
        let bin = tempfile::tempdir().unwrap();
        let fx = busy_drm();
        let nvidia = stub_program(bin.path(), "nvidia-smi", "19,41,1000,2000");
        let rocm = stub_program(bin.path(), "rocm-smi", ROCM_JSON);

        let acq = acquire_gpu_telemetry(&config(&nvidia, &rocm, &fx));
        assert_eq!(acq.source, Some(GpuSource::NvidiaSmi));
        assert_eq!(acq.telemetry.to_wire(), [19.0, 41.0, 50.0, 0.0, 0.0]);
    }

    #[test]
    fn test_json_source_wins_over_sysfs() {
        let bin = tempfile::tempdir().unwrap();
        let fx = busy_drm();
        let rocm = stub_program(bin.path(), "rocm-smi", ROCM_JSON);

        let acq = acquire_gpu_telemetry(&config("false", &rocm, &fx));
        assert_eq!(acq.source, Some(GpuSource::RocmSmi));
        assert_eq!(acq.telemetry.to_wire(), [19.0, 41.0, 22.0, 56.0, 66.0]);
    }

    #[test]
    fn test_falls_through_to_sysfs() {
        let fx = DrmFixture::new();
        fx.device_file("card0", "gpu_busy_percent", "0\n")
            .sensor("card0", "hwmon1", 1, Some("edge\n"), "37000\n")
            .device_file("card1", "gpu_busy_percent", "57\n")
            .sensor("card1", "hwmon2", 1, Some("edge\n"), "43000\n");

        // missing binary, then a tool that exits non-zero
        let acq = acquire_gpu_telemetry(&config("/nonexistent/nvidia-smi", "false", &fx));
        assert!(acq.is_ok());
        assert_eq!(acq.source, Some(GpuSource::Sysfs));
        assert_eq!(acq.telemetry.usage, 57.0);
        assert_eq!(acq.telemetry.temp_edge, 43.0);
    }

    #[test]
    fn test_unparseable_output_falls_through() {
        let fx = DrmFixture::new();
        fx.device_file("card0", "gt_busy_percent", "12\n");

        // echo prints the query flags back, which parse as neither CSV nor JSON
        let acq = acquire_gpu_telemetry(&config("echo", "echo", &fx));
        assert_eq!(acq.source, Some(GpuSource::Sysfs));
        assert_eq!(acq.telemetry.usage, 12.0);
    }

    #[test]
    fn test_all_sources_fail() {
        let fx = DrmFixture::new();
        let mut cfg = config("false", "/nonexistent/rocm-smi", &fx);
        cfg.drm_root = fx.root().join("missing");

        let acq = GpuMonitor::new(cfg).acquire();
        assert!(!acq.is_ok());
        assert_eq!(acq.telemetry, GpuTelemetry::default());
    }

    #[test]
    fn test_empty_drm_root_has_no_candidates() {
        let fx = DrmFixture::new();
        let monitor = GpuMonitor::new(config("false", "false", &fx));
        let probes = monitor.probe();

        assert_eq!(probes.len(), 3);
        assert!(matches!(
            probes[2],
            (GpuSource::Sysfs, Err(GpuSourceError::NoCandidates(_)))
        ));
    }
}
