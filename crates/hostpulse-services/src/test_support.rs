use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Builds a fake DRM class directory
pub(crate) struct DrmFixture {
    dir: TempDir,
}

impl DrmFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn device_file(&self, card: &str, name: &str, body: &str) -> &Self {
        let device = self.root().join(card).join("device");
        fs::create_dir_all(&device).unwrap();
        fs::write(device.join(name), body).unwrap();
        self
    }

    pub fn sensor(
        &self,
        card: &str,
        hwmon: &str,
        index: u32,
        label: Option<&str>,
        input: &str,
    ) -> &Self {
        let dir = self.root().join(card).join("device").join("hwmon").join(hwmon);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("temp{index}_input")), input).unwrap();
        if let Some(label) = label {
            fs::write(dir.join(format!("temp{index}_label")), label).unwrap();
        }
        self
    }
}
