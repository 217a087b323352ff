//! Export classification
//!
//! Maps an object's type tag and payload to an output format:
//!
//! | type tag    | payload         | export            |
//! |-------------|-----------------|-------------------|
//! | `Texture2D` | image           | PNG (`.png`)      |
//! | `AudioClip` | non-empty bytes | verbatim (`.wav`) |
//! | anything    | non-empty bytes | verbatim (`.bytes`) |
//!
//! Every other combination, and every read failure, is a skip.

use crate::issue::ExportIssue;
use image::{ImageFormat, RgbaImage};
use std::borrow::Cow;
use std::io::Cursor;
use unity_dat_core::{Payload, ReadError, type_tags};

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// PNG-encoded texture
    Png,
    /// Audio bytes as stored in the bundle
    Wav,
    /// Any other raw payload
    Bytes,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Wav => "wav",
            ExportFormat::Bytes => "bytes",
        }
    }

    /// File contents for `payload` in this format.
    ///
    /// Raw formats borrow the payload bytes unchanged; PNG encodes the
    /// image.
    pub fn encode<'a>(&self, payload: &'a Payload) -> Result<Cow<'a, [u8]>, ExportIssue> {
        match (self, payload) {
            (ExportFormat::Png, Payload::Image(image)) => encode_png(image).map(Cow::Owned),
            (ExportFormat::Wav | ExportFormat::Bytes, Payload::RawBytes(bytes)) => {
                Ok(Cow::Borrowed(bytes.as_slice()))
            }
            (format, payload) => Err(ExportIssue::encode(format!(
                "cannot write {} payload as {}",
                payload.kind(),
                format.extension()
            ))),
        }
    }
}

/// Classification decision for one object
#[derive(Debug)]
pub enum Classification {
    Export(ExportFormat),
    Skip(ExportIssue),
}

impl Classification {
    pub fn format(&self) -> Option<ExportFormat> {
        match self {
            Classification::Export(format) => Some(*format),
            Classification::Skip(_) => None,
        }
    }
}

/// Decides the export format of asset objects
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetClassifier;

impl AssetClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a successfully read payload
    pub fn classify(&self, type_tag: &str, payload: &Payload) -> Classification {
        let expected = match type_tag {
            type_tags::TEXTURE_2D => "image",
            _ => "raw bytes",
        };

        let format = match (type_tag, payload) {
            (type_tags::TEXTURE_2D, Payload::Image(_)) => ExportFormat::Png,
            (type_tags::AUDIO_CLIP, Payload::RawBytes(_)) => ExportFormat::Wav,
            (type_tags::TEXTURE_2D, _) | (_, Payload::Image(_)) => {
                return Classification::Skip(ExportIssue::UnexpectedPayload {
                    type_tag: type_tag.to_string(),
                    expected,
                    found: payload.kind(),
                });
            }
            (_, Payload::RawBytes(_)) => ExportFormat::Bytes,
        };

        if payload.is_empty() {
            return Classification::Skip(ExportIssue::EmptyPayload);
        }

        Classification::Export(format)
    }

    /// Classify the outcome of a read; failures become skips
    pub fn classify_read(
        &self,
        type_tag: &str,
        read: Result<&Payload, &ReadError>,
    ) -> Classification {
        match read {
            Ok(payload) => self.classify(type_tag, payload),
            Err(e) => Classification::Skip(ExportIssue::Read(e.clone())),
        }
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportIssue> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportIssue::encode("Image has zero dimensions"));
    }

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ExportIssue::encode(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(type_tag: &str, payload: Payload) -> Classification {
        AssetClassifier::new().classify(type_tag, &payload)
    }

    #[test]
    fn test_texture_to_png() {
        let result = classify("Texture2D", Payload::Image(RgbaImage::new(4, 4)));
        assert_eq!(result.format(), Some(ExportFormat::Png));
    }

    #[test]
    fn test_texture_with_raw_bytes_is_skipped() {
        let result = classify("Texture2D", Payload::RawBytes(vec![1, 2, 3]));
        assert!(matches!(
            result,
            Classification::Skip(ExportIssue::UnexpectedPayload { expected: "image", .. })
        ));
    }

    #[test]
    fn test_audio_to_wav() {
        let result = classify("AudioClip", Payload::RawBytes(b"RIFF....WAVE".to_vec()));
        assert_eq!(result.format(), Some(ExportFormat::Wav));
    }

    #[test]
    fn test_empty_audio_is_skipped() {
        let result = classify("AudioClip", Payload::RawBytes(Vec::new()));
        assert!(matches!(result, Classification::Skip(ExportIssue::EmptyPayload)));
    }

    #[test]
    fn test_other_types_to_bytes() {
        let result = classify("TextAsset", Payload::RawBytes(b"{\"line\":1}".to_vec()));
        assert_eq!(result.format(), Some(ExportFormat::Bytes));

        let result = classify("MonoBehaviour", Payload::RawBytes(Vec::new()));
        assert!(matches!(result, Classification::Skip(ExportIssue::EmptyPayload)));

        let result = classify("Sprite", Payload::Image(RgbaImage::new(2, 2)));
        assert!(matches!(
            result,
            Classification::Skip(ExportIssue::UnexpectedPayload { .. })
        ));
    }

    #[test]
    fn test_read_failure_is_skipped() {
        let error = ReadError::unsupported("ETC2 texture");
        let result = AssetClassifier::new().classify_read("Texture2D", Err(&error));
        assert!(matches!(result, Classification::Skip(ExportIssue::Read(_))));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ExportFormat::Png.extension(), "png");
        assert_eq!(ExportFormat::Wav.extension(), "wav");
        assert_eq!(ExportFormat::Bytes.extension(), "bytes");
    }

    #[test]
    fn test_png_encoding_has_signature() {
        let payload = Payload::Image(RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255])));
        let bytes = ExportFormat::Png.encode(&payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn test_raw_encoding_is_verbatim() {
        let payload = Payload::RawBytes(vec![0, 1, 2, 250]);
        let bytes = ExportFormat::Wav.encode(&payload).unwrap();
        assert!(matches!(bytes, Cow::Borrowed(_)));
        assert_eq!(&*bytes, &[0, 1, 2, 250]);
    }

    #[test]
    fn test_mismatched_encoding_fails() {
        let payload = Payload::RawBytes(vec![1]);
        assert!(matches!(
            ExportFormat::Png.encode(&payload),
            Err(ExportIssue::Encode(_))
        ));
    }
}
