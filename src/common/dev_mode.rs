use std::path::PathBuf;
use std::fs;
use crate::common::error::Result;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        Self::with_base_dir(enabled, PathBuf::from("./dev_data"))
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        if enabled {
            fs::create_dir_all(&base_dir)?;
            fs::create_dir_all(base_dir.join("store"))?;
            fs::create_dir_all(base_dir.join("captures"))?;
            fs::create_dir_all(base_dir.join("debug"))?;

            println!("📁 Development mode enabled - data will be saved to: {}",
                     base_dir.display());
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Store directory, only meaningful in dev mode.
    pub fn store_dir(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.base_dir.join("store"))
    }

    pub fn captures_dir(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.base_dir.join("captures"))
    }

    pub fn debug_dir(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.base_dir.join("debug"))
    }

    pub fn get_capture_path(&self, prefix: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        match self.captures_dir() {
            Some(dir) => dir.join(format!("{}_{}.png", prefix, timestamp)),
            None => PathBuf::from(format!("{}_{}.png", prefix, timestamp)),
        }
    }

    pub fn get_debug_path(&self, prefix: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        match self.debug_dir() {
            Some(dir) => dir.join(format!("{}_{}.png", prefix, timestamp)),
            None => PathBuf::from(format!("{}_debug.png", prefix)),
        }
    }
}
