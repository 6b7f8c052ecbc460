// Core modules
pub mod core;
pub mod camera;
pub mod storage;
pub mod service;
pub mod cli;
pub mod common;

// Re-export commonly used types
pub use common::{Config, DevMode, CaptureError, Result};
pub use self::core::{
    CaptureSettings, CaptureState, CaptureWidget, FixedLayout, FrameQuality, LayoutProvider,
    PersistencePolicy, Rect, TriggerOutcome, UserFeedback,
};
pub use camera::{Camera, FrameSource, StillFrame};
pub use storage::{FileStore, ImageStore, MemoryStore};
pub use service::{SubmissionClient, protocol};
