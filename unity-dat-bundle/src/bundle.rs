//! UnityFS container parsing
//!
//! A UnityFS file is a big-endian header, a (usually compressed) blocks
//! info section describing storage blocks and directory nodes, and the
//! storage blocks themselves. Decompressed and concatenated, the blocks
//! form one data stream that the nodes slice into files.

use crate::compression::{CompressionType, decompress};
use crate::error::{BinaryError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use tracing::debug;
use unity_dat_core::UNITY_FS_SIGNATURE;

/// Blocks info sits at the end of the file instead of after the header
const BLOCKS_INFO_AT_END: u32 = 0x80;
/// Newer writers pad to 16 bytes between blocks info and data
const BLOCK_INFO_NEEDS_PADDING: u32 = 0x200;
/// Directory node flag marking a SerializedFile
const NODE_SERIALIZED_FILE: u32 = 0x4;

/// UnityFS bundle header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    pub signature: String,
    pub version: u32,
    pub unity_version: String,
    pub unity_revision: String,
    pub size: i64,
    pub compressed_blocks_info_size: u32,
    pub uncompressed_blocks_info_size: u32,
    pub flags: u32,
}

impl BundleHeader {
    /// Parse the header, leaving `reader` at the end of it
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        let signature = reader.read_cstring()?;
        if signature.as_bytes() != UNITY_FS_SIGNATURE {
            return Err(BinaryError::InvalidSignature {
                expected: String::from_utf8_lossy(UNITY_FS_SIGNATURE).into_owned(),
                actual: signature,
            });
        }

        Ok(Self {
            signature,
            version: reader.read_u32()?,
            unity_version: reader.read_cstring()?,
            unity_revision: reader.read_cstring()?,
            size: reader.read_i64()?,
            compressed_blocks_info_size: reader.read_u32()?,
            uncompressed_blocks_info_size: reader.read_u32()?,
            flags: reader.read_u32()?,
        })
    }

    pub fn compression_type(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags)
    }

    pub fn blocks_info_at_end(&self) -> bool {
        self.flags & BLOCKS_INFO_AT_END != 0
    }
}

/// One storage block of the data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: u16,
}

/// A file inside the bundle, addressed in the decompressed data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub offset: u64,
    pub size: u64,
    pub flags: u32,
    pub path: String,
}

impl DirectoryNode {
    /// Whether the node holds a SerializedFile (as opposed to a resource)
    pub fn is_serialized_file(&self) -> bool {
        self.flags & NODE_SERIALIZED_FILE != 0
    }

    /// File name part of the node path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A parsed UnityFS bundle with its data stream decompressed
#[derive(Debug, Clone)]
pub struct BundleFile {
    pub header: BundleHeader,
    pub blocks: Vec<StorageBlock>,
    pub nodes: Vec<DirectoryNode>,
    data: Vec<u8>,
}

impl BundleFile {
    /// Parse a complete UnityFS file
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data, ByteOrder::Big);
        let header = BundleHeader::from_reader(&mut reader)?;
        if header.version >= 7 {
            reader.align_to(16)?;
        }

        let info_size = header.compressed_blocks_info_size as usize;
        let compressed_info = if header.blocks_info_at_end() {
            let start = data
                .len()
                .checked_sub(info_size)
                .ok_or_else(|| BinaryError::not_enough_data(info_size, data.len()))?;
            &data[start..]
        } else {
            let start = reader.position() as usize;
            let info = data
                .get(start..start + info_size)
                .ok_or_else(|| BinaryError::not_enough_data(info_size, reader.remaining()))?;
            reader.set_position((start + info_size) as u64)?;
            info
        };

        let blocks_info = decompress(
            compressed_info,
            header.compression_type()?,
            header.uncompressed_blocks_info_size as usize,
        )?;
        let (blocks, nodes) = parse_blocks_info(&blocks_info)?;

        if header.flags & BLOCK_INFO_NEEDS_PADDING != 0 {
            reader.align_to(16)?;
        }

        let total: usize = blocks.iter().map(|b| b.uncompressed_size as usize).sum();
        let mut stream = Vec::with_capacity(total);
        let mut pos = reader.position() as usize;
        for block in &blocks {
            let size = block.compressed_size as usize;
            let raw = data
                .get(pos..pos + size)
                .ok_or_else(|| BinaryError::not_enough_data(size, data.len().saturating_sub(pos)))?;
            let compression = CompressionType::from_flags(block.flags as u32)?;
            stream.extend(decompress(raw, compression, block.uncompressed_size as usize)?);
            pos += size;
        }

        for node in &nodes {
            if node.offset + node.size > stream.len() as u64 {
                return Err(BinaryError::invalid_data(format!(
                    "node {} ends past the data stream ({} bytes)",
                    node.path,
                    stream.len()
                )));
            }
        }

        debug!(
            blocks = blocks.len(),
            nodes = nodes.len(),
            bytes = stream.len(),
            "UnityFS {} ({})",
            header.version,
            header.unity_revision
        );

        Ok(Self {
            header,
            blocks,
            nodes,
            data: stream,
        })
    }

    /// Contents of a directory node
    pub fn node_data(&self, node: &DirectoryNode) -> &[u8] {
        let start = node.offset as usize;
        &self.data[start..start + node.size as usize]
    }

    /// Find a node by its path or file name
    pub fn find_node(&self, name: &str) -> Option<&DirectoryNode> {
        self.nodes
            .iter()
            .find(|node| node.path == name || node.file_name() == name)
    }

    /// Nodes holding SerializedFiles, in directory order
    pub fn serialized_files(&self) -> impl Iterator<Item = &DirectoryNode> {
        self.nodes.iter().filter(|node| node.is_serialized_file())
    }
}

/// Parse the decompressed blocks info section
fn parse_blocks_info(data: &[u8]) -> Result<(Vec<StorageBlock>, Vec<DirectoryNode>)> {
    let mut reader = BinaryReader::new(data, ByteOrder::Big);

    // Uncompressed data hash
    reader.read_bytes(16)?;

    let block_count = read_count(&mut reader, 10)?;
    let mut blocks = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        blocks.push(StorageBlock {
            uncompressed_size: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
            flags: reader.read_u16()?,
        });
    }

    let node_count = read_count(&mut reader, 21)?;
    let mut nodes = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let offset = reader.read_i64()?;
        let size = reader.read_i64()?;
        let flags = reader.read_u32()?;
        let path = reader.read_cstring()?;
        if offset < 0 || size < 0 {
            return Err(BinaryError::invalid_data(format!(
                "node {} has negative extent",
                path
            )));
        }
        nodes.push(DirectoryNode {
            offset: offset as u64,
            size: size as u64,
            flags,
            path,
        });
    }

    Ok((blocks, nodes))
}

/// Read an `i32` element count, rejecting counts the remaining bytes cannot hold
pub(crate) fn read_count(reader: &mut BinaryReader, min_element_size: usize) -> Result<usize> {
    let count = reader.read_i32()?;
    let count = usize::try_from(count)
        .map_err(|_| BinaryError::invalid_data(format!("negative count {}", count)))?;
    if count.saturating_mul(min_element_size) > reader.remaining() {
        return Err(BinaryError::not_enough_data(
            count.saturating_mul(min_element_size),
            reader.remaining(),
        ));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{BundleBuilder, Compression};

    #[test]
    fn test_parse_uncompressed_bundle() {
        let data = BundleBuilder::new()
            .node("CAB-title", b"serialized".to_vec(), true)
            .node("CAB-title.resS", b"pixels".to_vec(), false)
            .build();

        let bundle = BundleFile::parse(&data).unwrap();
        assert_eq!(bundle.header.signature, "UnityFS");
        assert_eq!(bundle.header.version, 7);
        assert_eq!(bundle.nodes.len(), 2);
        assert!(bundle.nodes[0].is_serialized_file());
        assert!(!bundle.nodes[1].is_serialized_file());
        assert_eq!(bundle.node_data(&bundle.nodes[1]), b"pixels");
        assert_eq!(bundle.serialized_files().count(), 1);
    }

    #[test]
    fn test_parse_lz4_bundle() {
        let payload = b"0123456789".repeat(50);
        let data = BundleBuilder::new()
            .compression(Compression::Lz4)
            .node("archive:/CAB-a/CAB-a.resS", payload.clone(), false)
            .build();

        let bundle = BundleFile::parse(&data).unwrap();
        assert_eq!(bundle.header.flags & 0x3F, 3);
        let node = bundle.find_node("CAB-a.resS").unwrap();
        assert_eq!(bundle.node_data(node), payload.as_slice());
    }

    #[test]
    fn test_blocks_info_at_end() {
        let data = BundleBuilder::new()
            .blocks_info_at_end()
            .node("CAB-end", b"tail".to_vec(), true)
            .build();

        let bundle = BundleFile::parse(&data).unwrap();
        assert!(bundle.header.blocks_info_at_end());
        assert_eq!(bundle.node_data(&bundle.nodes[0]), b"tail");
    }

    #[test]
    fn test_rejects_other_signature() {
        let mut data = BundleBuilder::new().build();
        data[..7].copy_from_slice(b"UnityXX");
        assert!(matches!(
            BundleFile::parse(&data),
            Err(BinaryError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_truncated_bundle() {
        let data = BundleBuilder::new()
            .node("CAB-cut", vec![7u8; 64], true)
            .build();
        let result = BundleFile::parse(&data[..data.len() - 10]);
        assert!(matches!(result, Err(BinaryError::NotEnoughData { .. })));
    }
}
