use crate::camera::FrameSource;
use crate::common::config::CameraConfig;
use crate::common::{CaptureError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Rgba, RgbaImage};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};
use std::fs;
use std::time::Duration;

/// V4L2 webcam.
pub struct Camera {
    device: Device,
    config: CameraConfig,
    width: u32,
    height: u32,
    fourcc: [u8; 4],
    paused: bool,
    held: Option<RgbaImage>,
}

#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub formats: Vec<String>,
    pub video_capture: bool,
}

impl Camera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let index = config.device_index;
        tracing::info!("Opening camera device {}...", index);

        let device = Device::new(index as usize)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to open camera {}: {}", index, e)))?;

        let caps = device.query_caps()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to query capabilities: {}", e)))?;
        tracing::debug!("Device capabilities: {:?}", caps.capabilities);

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            tracing::warn!("Device {} may not support standard video capture", index);
        }

        let mut fmt = device.format()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to get format: {}", e)))?;

        fmt.width = config.width;
        fmt.height = config.height;

        // Keep GREY for IR sensors, otherwise ask for MJPG
        if &fmt.fourcc.repr != b"GREY" {
            fmt.fourcc = FourCC::new(b"MJPG");
        }

        match device.set_format(&fmt) {
            Ok(_) => tracing::debug!("Format set successfully"),
            Err(e) => tracing::warn!("Could not set exact format: {}. Using device defaults.", e),
        }

        let actual = device.format()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to get final format: {}", e)))?;

        tracing::info!("Camera {} ({}) streaming {}x{} {}",
            index, caps.card, actual.width, actual.height, fourcc_name(&actual.fourcc.repr));

        if actual.width != config.width || actual.height != config.height {
            tracing::warn!("Camera resolution {}x{} differs from requested {}x{}",
                actual.width, actual.height, config.width, config.height);
        }

        Ok(Self {
            device,
            config: config.clone(),
            width: actual.width,
            height: actual.height,
            fourcc: actual.fourcc.repr,
            paused: false,
            held: None,
        })
    }

    /// List all `/dev/video*` devices that can be opened.
    pub fn list_all() -> Result<Vec<CameraInfo>> {
        let mut cameras = Vec::new();

        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(index) = file_name.to_str()
                .and_then(|name| name.strip_prefix("video"))
                .and_then(|suffix| suffix.parse::<u32>().ok())
            else {
                continue;
            };

            let Ok(device) = Device::new(index as usize) else { continue };
            let Ok(caps) = device.query_caps() else { continue };

            let formats = device.enum_formats()
                .unwrap_or_default()
                .iter()
                .map(|desc| fourcc_name(&desc.fourcc.repr))
                .collect();

            cameras.push(CameraInfo {
                index,
                name: caps.card.clone(),
                formats,
                video_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            });
        }

        cameras.sort_by_key(|c| c.index);
        Ok(cameras)
    }

    /// Each grab maps a fresh stream, and a fresh stream starts with
    /// auto-exposure unsettled, so every one is warmed up.
    fn grab(&mut self) -> Result<RgbaImage> {
        let mut stream = v4l::io::mmap::Stream::with_buffers(&mut self.device, Type::VideoCapture, 4)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to create stream: {}", e)))?;

        let delay = Duration::from_millis(self.config.warmup_delay_ms);
        let buf = read_after_warmup(self.config.warmup_frames, delay, || {
            stream.next().map(|(buf, _meta)| buf.to_vec())
        })?;

        decode_frame(&self.fourcc, &buf, self.width, self.height)
    }
}

/// Discard `warmup_frames` frames from `next`, then return the one after.
fn read_after_warmup<T, E, F>(warmup_frames: u32, delay: Duration, mut next: F) -> Result<T>
where
    E: std::fmt::Display,
    F: FnMut() -> std::result::Result<T, E>,
{
    tracing::debug!("Warming up camera ({} frames)...", warmup_frames);
    for i in 0..warmup_frames {
        next().map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to capture warmup frame {}: {}", i, e)))?;
        std::thread::sleep(delay);
    }

    next().map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to capture: {}", e)))
}

impl FrameSource for Camera {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_frame(&mut self) -> Result<RgbaImage> {
        if self.paused {
            if let Some(held) = &self.held {
                return Ok(held.clone());
            }
        }

        let frame = self.grab()?;
        self.held = Some(frame.clone());
        Ok(frame)
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
        self.held = None;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

fn fourcc_name(repr: &[u8; 4]) -> String {
    String::from_utf8_lossy(repr).trim_end().to_string()
}

/// Convert one raw V4L2 buffer into RGBA.
pub fn decode_frame(fourcc: &[u8; 4], data: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    match fourcc {
        b"GREY" => {
            let expected = width as usize * height as usize;
            let gray = GrayImage::from_raw(width, height, data.get(..expected).unwrap_or(data).to_vec())
                .ok_or_else(|| CaptureError::DeviceUnavailable("Failed to create grayscale image buffer".into()))?;
            Ok(DynamicImage::ImageLuma8(gray).to_rgba8())
        }
        b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgba8()),
        b"YUYV" => yuyv_to_rgba(data, width, height),
        other => Err(CaptureError::DeviceUnavailable(format!(
            "Unsupported pixel format {}", fourcc_name(other)
        ))),
    }
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 2;
    if width % 2 != 0 || data.len() < expected {
        return Err(CaptureError::DeviceUnavailable(format!(
            "YUYV buffer of {} bytes does not fit {}x{}", data.len(), width, height
        )));
    }

    let mut image = RgbaImage::new(width, height);
    for (i, chunk) in data[..expected].chunks_exact(4).enumerate() {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        let x = (i as u32 * 2) % width;
        let y = (i as u32 * 2) / width;
        image.put_pixel(x, y, yuv_to_rgba(y0, u, v));
        image.put_pixel(x + 1, y, yuv_to_rgba(y1, u, v));
    }
    Ok(image)
}

fn yuv_to_rgba(y: u8, u: u8, v: u8) -> Rgba<u8> {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;
    Rgba([
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
        255,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stream_is_warmed_up() {
        let mut produced = 0u32;
        let mut next = || -> std::result::Result<u32, String> {
            produced += 1;
            Ok(produced)
        };

        // Two grabs, each on its own stream, both skip the warmup frames
        let first = read_after_warmup(3, Duration::ZERO, &mut next).unwrap();
        let second = read_after_warmup(3, Duration::ZERO, &mut next).unwrap();
        assert_eq!(first, 4);
        assert_eq!(second, 8);
    }

    #[test]
    fn test_warmup_failure_is_device_unavailable() {
        let result = read_after_warmup(2, Duration::ZERO, || -> std::result::Result<(), &str> { Err("EIO") });
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_grey_frame_expands_to_rgba() {
        let frame = decode_frame(b"GREY", &[0, 64, 128, 255], 2, 2).unwrap();
        assert_eq!(frame.get_pixel(1, 0), &Rgba([64, 64, 64, 255]));
        assert_eq!(frame.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // Two pixels per macropixel, chroma at 128 carries no colour
        let data = [100, 128, 200, 128, 10, 128, 20, 128];
        let frame = decode_frame(b"YUYV", &data, 2, 2).unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgba([100, 100, 100, 255]));
        assert_eq!(frame.get_pixel(1, 0), &Rgba([200, 200, 200, 255]));
        assert_eq!(frame.get_pixel(0, 1), &Rgba([10, 10, 10, 255]));
        assert_eq!(frame.get_pixel(1, 1), &Rgba([20, 20, 20, 255]));
    }

    #[test]
    fn test_short_yuyv_buffer_rejected() {
        assert!(decode_frame(b"YUYV", &[0; 6], 2, 2).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            decode_frame(b"H264", &[], 1, 1),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }
}
