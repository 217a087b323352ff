//! Block compression used by UnityFS bundles

use crate::error::{BinaryError, Result};

/// Compression of a block or of the blocks info, from the low six flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Lzma,
    Lz4,
    Lz4Hc,
    Lzham,
}

impl CompressionType {
    /// Create compression type from flags
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & 0x3F {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lzma),
            2 => Ok(CompressionType::Lz4),
            3 => Ok(CompressionType::Lz4Hc),
            4 => Ok(CompressionType::Lzham),
            other => Err(BinaryError::unsupported(format!(
                "Unknown compression type: {}",
                other
            ))),
        }
    }

    /// Get compression type name
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "None",
            CompressionType::Lzma => "LZMA",
            CompressionType::Lz4 => "LZ4",
            CompressionType::Lz4Hc => "LZ4HC",
            CompressionType::Lzham => "LZHAM",
        }
    }
}

/// Decompress `data` into exactly `uncompressed_size` bytes
pub fn decompress(
    data: &[u8],
    compression: CompressionType,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let output = match compression {
        CompressionType::None => data.to_vec(),
        CompressionType::Lz4 | CompressionType::Lz4Hc => lz4_flex::decompress(data, uncompressed_size)
            .map_err(|e| BinaryError::decompression_failed(format!("LZ4: {}", e)))?,
        CompressionType::Lzma => decompress_lzma(data, uncompressed_size)?,
        CompressionType::Lzham => {
            return Err(BinaryError::unsupported("LZHAM compression"));
        }
    };

    if output.len() != uncompressed_size {
        return Err(BinaryError::decompression_failed(format!(
            "{} block: expected {} bytes, got {}",
            compression.name(),
            uncompressed_size,
            output.len()
        )));
    }
    Ok(output)
}

/// Unity stores LZMA as 5 property bytes followed by the raw stream, without
/// the 8-byte size field of the `.lzma` header. The header is rebuilt with the
/// known size so the stream ends there.
fn decompress_lzma(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if data.len() < 5 {
        return Err(BinaryError::decompression_failed(
            "LZMA data too short for properties",
        ));
    }

    let mut lzma_data = Vec::with_capacity(data.len() + 8);
    lzma_data.extend_from_slice(&data[..5]);
    lzma_data.extend_from_slice(&(uncompressed_size as u64).to_le_bytes());
    lzma_data.extend_from_slice(&data[5..]);

    let mut output = Vec::with_capacity(uncompressed_size);
    lzma_rs::lzma_decompress(&mut std::io::Cursor::new(&lzma_data), &mut output)
        .map_err(|e| BinaryError::decompression_failed(format!("LZMA: {:?}", e)))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_type_from_flags() {
        assert_eq!(CompressionType::from_flags(0).unwrap(), CompressionType::None);
        assert_eq!(CompressionType::from_flags(1).unwrap(), CompressionType::Lzma);
        assert_eq!(CompressionType::from_flags(0x42).unwrap(), CompressionType::Lz4);
        assert_eq!(CompressionType::from_flags(3).unwrap(), CompressionType::Lz4Hc);
        assert!(CompressionType::from_flags(0x3F).is_err());
    }

    #[test]
    fn test_no_compression() {
        let data = b"plain block";
        assert_eq!(decompress(data, CompressionType::None, data.len()).unwrap(), data);
        assert!(decompress(data, CompressionType::None, 4).is_err());
    }

    #[test]
    fn test_lz4_round_trip() {
        let data = b"CAB-0123456789abcdef CAB-0123456789abcdef CAB-0123456789abcdef".repeat(8);
        let compressed = lz4_flex::compress(&data);
        assert!(compressed.len() < data.len());

        let restored = decompress(&compressed, CompressionType::Lz4Hc, data.len()).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_lzham_unsupported() {
        assert!(matches!(
            decompress(b"xx", CompressionType::Lzham, 2),
            Err(BinaryError::Unsupported(_))
        ));
    }
}
