use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{CaptureError, Result};
use crate::common::paths;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
}

fn default_camera_width() -> u32 { 1280 }
fn default_camera_height() -> u32 { 720 }
fn default_warmup_frames() -> u32 { 3 }
fn default_warmup_delay() -> u64 { 50 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            warmup_frames: default_warmup_frames(),
            warmup_delay_ms: default_warmup_delay(),
        }
    }
}

/// On-screen layout of the camera container and the face guide box, in
/// screen pixels.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ViewportConfig {
    #[serde(default)]
    pub container_left: f64,
    #[serde(default)]
    pub container_top: f64,
    #[serde(default = "default_container_width")]
    pub container_width: f64,
    #[serde(default = "default_container_height")]
    pub container_height: f64,
    #[serde(default = "default_guide_left")]
    pub guide_left: f64,
    #[serde(default = "default_guide_top")]
    pub guide_top: f64,
    #[serde(default = "default_guide_width")]
    pub guide_width: f64,
    #[serde(default = "default_guide_height")]
    pub guide_height: f64,
}

fn default_container_width() -> f64 { 640.0 }
fn default_container_height() -> f64 { 480.0 }
fn default_guide_left() -> f64 { 220.0 }
fn default_guide_top() -> f64 { 90.0 }
fn default_guide_width() -> f64 { 200.0 }
fn default_guide_height() -> f64 { 300.0 }

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            container_left: 0.0,
            container_top: 0.0,
            container_width: default_container_width(),
            container_height: default_container_height(),
            guide_left: default_guide_left(),
            guide_top: default_guide_top(),
            guide_width: default_guide_width(),
            guide_height: default_guide_height(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default = "default_min_brightness")]
    pub min_brightness: f64,
    #[serde(default = "default_max_brightness")]
    pub max_brightness: f64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Fail the capture instead of freezing when the image cannot be stored.
    #[serde(default)]
    pub strict_persistence: bool,
}

fn default_min_brightness() -> f64 { 50.0 }
fn default_max_brightness() -> f64 { 200.0 }
fn default_storage_key() -> String { "image".to_string() }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_brightness: default_min_brightness(),
            max_brightness: default_max_brightness(),
            storage_key: default_storage_key(),
            strict_persistence: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_signup_path")]
    pub signup_path: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

fn default_base_url() -> String { "http://127.0.0.1:8000".to_string() }
fn default_login_path() -> String { "/login/".to_string() }
fn default_signup_path() -> String { "/signup/".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            signup_path: default_signup_path(),
            csrf_token: None,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to built-in defaults when
    /// no config file exists there.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from("configs/face-capture.toml");
        if local.exists() {
            return Self::load_from_path(&local);
        }

        if let Some(user_config) = paths::default_config_file() {
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        tracing::warn!("No config file found, using defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CaptureError::Config(format!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| CaptureError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(CaptureError::Config(format!(
                "Camera width must be between 1 and 4096, got {}", self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(CaptureError::Config(format!(
                "Camera height must be between 1 and 4096, got {}", self.camera.height
            )));
        }

        let viewport = &self.viewport;
        let viewport_fields = [
            ("container_left", viewport.container_left),
            ("container_top", viewport.container_top),
            ("container_width", viewport.container_width),
            ("container_height", viewport.container_height),
            ("guide_left", viewport.guide_left),
            ("guide_top", viewport.guide_top),
            ("guide_width", viewport.guide_width),
            ("guide_height", viewport.guide_height),
        ];
        if let Some((name, value)) = viewport_fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CaptureError::Config(format!(
                "Viewport {} must be a finite number, got {}", name, value
            )));
        }
        if !(viewport.container_width > 0.0 && viewport.container_height > 0.0) {
            return Err(CaptureError::Config(format!(
                "Container size must be positive, got {}x{}",
                viewport.container_width, viewport.container_height
            )));
        }
        if !(viewport.guide_width > 0.0 && viewport.guide_height > 0.0) {
            return Err(CaptureError::Config(format!(
                "Guide box size must be positive, got {}x{}",
                viewport.guide_width, viewport.guide_height
            )));
        }

        if viewport.guide_width > viewport.container_width || viewport.guide_height > viewport.container_height {
            return Err(CaptureError::Config(format!(
                "Guide box {}x{} is larger than the container {}x{}",
                viewport.guide_width, viewport.guide_height,
                viewport.container_width, viewport.container_height
            )));
        }

        let capture = &self.capture;
        if !capture.min_brightness.is_finite() || !capture.max_brightness.is_finite() {
            return Err(CaptureError::Config(format!(
                "Brightness thresholds must be finite, got {}..={}",
                capture.min_brightness, capture.max_brightness
            )));
        }
        if capture.min_brightness < 0.0 || capture.max_brightness > 255.0 {
            return Err(CaptureError::Config(format!(
                "Brightness thresholds must lie within 0..=255, got {}..={}",
                capture.min_brightness, capture.max_brightness
            )));
        }
        if capture.min_brightness > capture.max_brightness {
            return Err(CaptureError::Config(format!(
                "Minimum brightness {} exceeds maximum {}",
                capture.min_brightness, capture.max_brightness
            )));
        }
        if capture.storage_key.trim().is_empty() {
            return Err(CaptureError::Config("Storage key must not be empty".into()));
        }

        Ok(())
    }
}
