use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "facecapture", "FaceCapture")
}

/// Per-user config file, e.g. `~/.config/facecapture/face-capture.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("face-capture.toml"))
}

/// Per-user directory holding the image handoff store.
pub fn default_data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}
