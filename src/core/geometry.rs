use image::{Rgba, RgbaImage};

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// How an intrinsic video frame is magnified to cover its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub render_width: f64,
    pub render_height: f64,
    /// Overflow clipped on each side when the rendered video is centered.
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CoverFit {
    /// Returns `None` when either size is degenerate.
    pub fn compute(video: (u32, u32), container_width: f64, container_height: f64) -> Option<Self> {
        let (video_width, video_height) = (video.0 as f64, video.1 as f64);
        if video_width <= 0.0 || video_height <= 0.0 {
            return None;
        }
        if !(container_width > 0.0 && container_height > 0.0) {
            return None;
        }

        let scale = (container_width / video_width).max(container_height / video_height);
        let render_width = video_width * scale;
        let render_height = video_height * scale;

        Some(Self {
            scale,
            render_width,
            render_height,
            offset_x: (render_width - container_width) / 2.0,
            offset_y: (render_height - container_height) / 2.0,
        })
    }
}

/// Region of the intrinsic video frame, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRegion {
    /// Pixel size of the crop buffer. `None` if it rounds to nothing.
    pub fn output_size(&self) -> Option<(u32, u32)> {
        if !(self.width.is_finite() && self.height.is_finite()) {
            return None;
        }
        let width = self.width.round();
        let height = self.height.round();
        if width < 1.0 || height < 1.0 || width > u32::MAX as f64 || height > u32::MAX as f64 {
            return None;
        }
        Some((width as u32, height as u32))
    }
}

/// Map the guide overlay back into the video's intrinsic pixel space.
///
/// The video is rendered cover-fit and centered inside `container`; `guide`
/// is in the same screen coordinates as `container`.
pub fn guide_to_source(video: (u32, u32), container: &Rect, guide: &Rect) -> Option<SourceRegion> {
    let fit = CoverFit::compute(video, container.width, container.height)?;

    let box_left = guide.left - container.left;
    let box_top = guide.top - container.top;

    let region = SourceRegion {
        x: (fit.offset_x + box_left) / fit.scale,
        y: (fit.offset_y + box_top) / fit.scale,
        width: guide.width / fit.scale,
        height: guide.height / fit.scale,
    };

    if [region.x, region.y, region.width, region.height].iter().all(|v| v.is_finite()) {
        Some(region)
    } else {
        None
    }
}

/// Copy `region` of `frame` into a buffer of the region's rounded size.
///
/// Samples the nearest source pixel at each destination pixel centre. Pixels
/// outside the frame stay transparent black. A region larger than the frame
/// itself yields `None`.
pub fn rasterize(frame: &RgbaImage, region: &SourceRegion) -> Option<RgbaImage> {
    let (out_width, out_height) = region.output_size()?;
    if out_width > frame.width() || out_height > frame.height() {
        return None;
    }
    let step_x = region.width / out_width as f64;
    let step_y = region.height / out_height as f64;
    let (frame_width, frame_height) = (frame.width() as f64, frame.height() as f64);

    Some(RgbaImage::from_fn(out_width, out_height, |dx, dy| {
        let sx = (region.x + (dx as f64 + 0.5) * step_x).floor();
        let sy = (region.y + (dy as f64 + 0.5) * step_y).floor();
        if sx < 0.0 || sy < 0.0 || sx >= frame_width || sy >= frame_height {
            Rgba([0, 0, 0, 0])
        } else {
            *frame.get_pixel(sx as u32, sy as u32)
        }
    }))
}
