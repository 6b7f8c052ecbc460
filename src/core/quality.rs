use image::RgbaImage;

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Perceived brightness of one pixel, 0..=255.
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameQuality {
    /// Mean luma over every pixel.
    pub brightness: f64,
    /// Standard deviation of luma. Reported only, never used to reject.
    pub contrast: f64,
}

impl FrameQuality {
    /// Measure a crop. Alpha is ignored, so transparent pixels count as their
    /// RGB value. Returns `None` for an empty image.
    pub fn measure(image: &RgbaImage) -> Option<Self> {
        let count = image.width() as u64 * image.height() as u64;
        if count == 0 {
            return None;
        }

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for pixel in image.pixels() {
            let [r, g, b, _] = pixel.0;
            let y = luma(r, g, b);
            sum += y;
            sum_sq += y * y;
        }

        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);

        Some(Self {
            brightness: mean,
            contrast: variance.sqrt(),
        })
    }

    pub fn get_quality_assessment(&self) -> String {
        format!("Brightness: {:.1}, contrast: {:.1}", self.brightness, self.contrast)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Acceptable,
    TooDark,
    TooBright,
}

impl Exposure {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Exposure::Acceptable)
    }

    /// Text shown to the user for this verdict.
    pub fn message(&self) -> &'static str {
        match self {
            Exposure::Acceptable => "The image is perfect",
            Exposure::TooDark => "The image is too dark",
            Exposure::TooBright => "The image is too bright",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessPolicy {
    pub min_brightness: f64,
    pub max_brightness: f64,
}

impl Default for BrightnessPolicy {
    fn default() -> Self {
        Self {
            min_brightness: 50.0,
            max_brightness: 200.0,
        }
    }
}

impl BrightnessPolicy {
    /// Acceptable iff `min <= brightness <= max`. Any NaN, in the brightness
    /// or a threshold, is never acceptable.
    pub fn judge(&self, brightness: f64) -> Exposure {
        if !(brightness >= self.min_brightness) {
            Exposure::TooDark
        } else if !(brightness <= self.max_brightness) {
            Exposure::TooBright
        } else {
            Exposure::Acceptable
        }
    }
}
