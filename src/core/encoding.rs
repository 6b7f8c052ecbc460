use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, ImageOutputFormat, RgbaImage};
use std::io::Cursor;
use crate::common::{CaptureError, Result};

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a crop as `data:image/png;base64,...`.
pub fn encode_data_url(image: &RgbaImage) -> Result<String> {
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut png, ImageOutputFormat::Png)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png.into_inner())))
}

/// Decode a PNG data URL. A bare base64 payload is accepted too.
pub fn decode_data_url(value: &str) -> Result<DynamicImage> {
    let payload = match value.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',')
                .ok_or_else(|| CaptureError::Encoding("Malformed data URL".into()))?;
            if !header.ends_with(";base64") {
                return Err(CaptureError::Encoding(format!(
                    "Unsupported data URL encoding: {}", header
                )));
            }
            data
        }
        None => value,
    };

    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Png)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_data_url_preserves_pixels() {
        let crop = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 255]));
        let url = encode_data_url(&crop).unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let decoded = decode_data_url(&url).unwrap().to_rgba8();
        assert_eq!(decoded, crop);
    }

    #[test]
    fn test_bare_payload_accepted() {
        let crop = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let url = encode_data_url(&crop).unwrap();
        let bare = url.trim_start_matches(PNG_DATA_URL_PREFIX);
        assert_eq!(decode_data_url(bare).unwrap().to_rgba8(), crop);
    }

    #[test]
    fn test_non_base64_data_url_rejected() {
        assert!(matches!(
            decode_data_url("data:image/png,rawbytes"),
            Err(CaptureError::Encoding(_))
        ));
    }

    #[test]
    fn test_garbage_payload_rejected() {
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }
}
