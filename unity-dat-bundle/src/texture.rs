//! Texture2D decoding
//!
//! Uncompressed formats are converted to RGBA. Block-compressed, crunched
//! and HDR formats are reported as unsupported.

use crate::error::{BinaryError, Result};
use image::RgbaImage;

/// Unity texture formats this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Alpha8,
    ARGB4444,
    RGB24,
    RGBA32,
    ARGB32,
    RGB565,
    RGBA4444,
    BGRA32,
    R8,
}

impl TextureFormat {
    /// Map Unity's `m_TextureFormat` value
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(TextureFormat::Alpha8),
            2 => Some(TextureFormat::ARGB4444),
            3 => Some(TextureFormat::RGB24),
            4 => Some(TextureFormat::RGBA32),
            5 => Some(TextureFormat::ARGB32),
            7 => Some(TextureFormat::RGB565),
            13 => Some(TextureFormat::RGBA4444),
            14 => Some(TextureFormat::BGRA32),
            63 => Some(TextureFormat::R8),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Alpha8 | TextureFormat::R8 => 1,
            TextureFormat::ARGB4444 | TextureFormat::RGB565 | TextureFormat::RGBA4444 => 2,
            TextureFormat::RGB24 => 3,
            TextureFormat::RGBA32 | TextureFormat::ARGB32 | TextureFormat::BGRA32 => 4,
        }
    }

    fn to_rgba(self, px: &[u8]) -> [u8; 4] {
        match self {
            TextureFormat::Alpha8 => [255, 255, 255, px[0]],
            TextureFormat::R8 => [px[0], 0, 0, 255],
            TextureFormat::RGB24 => [px[0], px[1], px[2], 255],
            TextureFormat::RGBA32 => [px[0], px[1], px[2], px[3]],
            TextureFormat::ARGB32 => [px[1], px[2], px[3], px[0]],
            TextureFormat::BGRA32 => [px[2], px[1], px[0], px[3]],
            TextureFormat::ARGB4444 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                [nibble(v >> 8), nibble(v >> 4), nibble(v), nibble(v >> 12)]
            }
            TextureFormat::RGBA4444 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                [nibble(v >> 12), nibble(v >> 8), nibble(v >> 4), nibble(v)]
            }
            TextureFormat::RGB565 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let r = ((v >> 11) & 0x1F) as u8;
                let g = ((v >> 5) & 0x3F) as u8;
                let b = (v & 0x1F) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
            }
        }
    }
}

/// Expand the low four bits to eight
fn nibble(v: u16) -> u8 {
    let n = (v & 0xF) as u8;
    (n << 4) | n
}

/// Decode the top mip level of a texture.
///
/// Unity stores rows bottom-up; the returned image is top-down.
pub fn decode(format_id: i32, width: u32, height: u32, data: &[u8]) -> Result<RgbaImage> {
    let format = TextureFormat::from_id(format_id)
        .ok_or_else(|| BinaryError::unsupported(format!("texture format {}", format_id)))?;
    if width == 0 || height == 0 {
        return Err(BinaryError::invalid_data(format!(
            "texture dimensions {}x{}",
            width, height
        )));
    }

    let pixels = width as usize * height as usize;
    let expected = pixels * format.bytes_per_pixel();
    if data.len() < expected {
        return Err(BinaryError::not_enough_data(expected, data.len()));
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for px in data[..expected].chunks_exact(format.bytes_per_pixel()) {
        rgba.extend_from_slice(&format.to_rgba(px));
    }

    let mut image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| BinaryError::invalid_data("texture buffer size mismatch"))?;
    image::imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rgba32_is_flipped() {
        // Bottom row red, top row blue
        let data = [255, 0, 0, 255, 0, 0, 255, 255];
        let image = decode(4, 1, 2, &data).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(image.get_pixel(0, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_channel_orders() {
        assert_eq!(TextureFormat::ARGB32.to_rgba(&[1, 2, 3, 4]), [2, 3, 4, 1]);
        assert_eq!(TextureFormat::BGRA32.to_rgba(&[1, 2, 3, 4]), [3, 2, 1, 4]);
        assert_eq!(TextureFormat::Alpha8.to_rgba(&[9]), [255, 255, 255, 9]);
        assert_eq!(TextureFormat::RGB565.to_rgba(&[0x00, 0xF8]), [255, 0, 0, 255]);
        assert_eq!(TextureFormat::RGBA4444.to_rgba(&[0x0F, 0xF0]), [255, 0, 0, 255]);
    }

    #[test]
    fn test_compressed_formats_unsupported() {
        // DXT5
        assert!(matches!(
            decode(12, 4, 4, &[0u8; 16]),
            Err(BinaryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_short_data() {
        assert!(matches!(
            decode(3, 2, 2, &[0u8; 11]),
            Err(BinaryError::NotEnoughData { expected: 12, actual: 11 })
        ));
    }
}
