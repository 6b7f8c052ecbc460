use crate::camera::FrameSource;
use crate::common::Result;
use image::RgbaImage;
use std::path::Path;

/// Frame source that always shows the same image.
pub struct StillFrame {
    frame: RgbaImage,
    paused: bool,
}

impl StillFrame {
    pub fn new(frame: RgbaImage) -> Self {
        Self { frame, paused: false }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let frame = image::open(path)?.to_rgba8();
        tracing::debug!("Loaded still frame {}x{} from {}", frame.width(), frame.height(), path.display());
        Ok(Self::new(frame))
    }
}

impl FrameSource for StillFrame {
    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn current_frame(&mut self) -> Result<RgbaImage> {
        Ok(self.frame.clone())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
