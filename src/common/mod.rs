pub mod config;
pub mod dev_mode;
pub mod error;
pub mod paths;

pub use config::Config;
pub use dev_mode::DevMode;
pub use error::{CaptureError, Result};
pub use paths::{default_config_file, default_data_dir};
