pub mod still;
pub mod v4l2;

use crate::common::Result;
use image::RgbaImage;

pub use still::StillFrame;
pub use v4l2::Camera;

/// A live video feed with intrinsic pixel dimensions.
pub trait FrameSource {
    /// Intrinsic frame size, independent of how the feed is displayed.
    fn dimensions(&self) -> (u32, u32);

    /// The frame currently shown. While paused this is the held frame.
    fn current_frame(&mut self) -> Result<RgbaImage>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn current_frame(&mut self) -> Result<RgbaImage> {
        (**self).current_frame()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }
}
