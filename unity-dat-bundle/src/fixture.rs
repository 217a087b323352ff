//! In-code UnityFS writer for tests
//!
//! Builds small but well-formed bundles: a version 7 UnityFS container
//! holding version 22 SerializedFiles with TypeTrees, optionally LZ4
//! compressed. Only the fields the reader looks at are modelled.

use crate::typetree::{ALIGN_BYTES, COMMON_STRING_FLAG, COMMON_STRINGS};
use unity_dat_core::class_ids;

const STRING_FLAGS: i32 = 0x8000;

/// Compression applied to the blocks info and the single data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

/// A flat TypeTree description
#[derive(Debug, Clone)]
pub struct TypeTreeBuilder {
    nodes: Vec<(u8, String, String, i32, i32)>,
}

impl TypeTreeBuilder {
    /// Tree with only the root node
    pub fn empty(class_name: &str) -> Self {
        Self {
            nodes: vec![(0, class_name.to_string(), "Base".to_string(), -1, 0)],
        }
    }

    /// Add a field at `level`
    pub fn field(mut self, level: u8, type_name: &str, name: &str, byte_size: i32, flags: i32) -> Self {
        self.nodes
            .push((level, type_name.to_string(), name.to_string(), byte_size, flags));
        self
    }

    /// Add an aligned `string` field at `level`
    pub fn string(self, level: u8, name: &str) -> Self {
        self.field(level, "string", name, -1, STRING_FLAGS)
            .field(level + 1, "Array", "Array", -1, ALIGN_BYTES)
            .field(level + 2, "int", "size", 4, 0)
            .field(level + 2, "char", "data", 1, 0)
    }

    pub fn text_asset() -> Self {
        Self::empty("TextAsset").string(1, "m_Name").string(1, "m_Script")
    }

    pub fn texture_2d() -> Self {
        Self::empty("Texture2D")
            .string(1, "m_Name")
            .field(1, "int", "m_Width", 4, 0)
            .field(1, "int", "m_Height", 4, 0)
            .field(1, "int", "m_TextureFormat", 4, 0)
            .field(1, "bool", "m_IsReadable", 1, ALIGN_BYTES)
            .field(1, "TypelessData", "image data", -1, ALIGN_BYTES)
            .field(2, "int", "size", 4, 0)
            .field(2, "UInt8", "data", 1, 0)
            .field(1, "StreamingInfo", "m_StreamData", -1, 0)
            .field(2, "UInt64", "offset", 8, 0)
            .field(2, "unsigned int", "size", 4, 0)
            .string(2, "path")
    }

    pub fn audio_clip() -> Self {
        Self::empty("AudioClip")
            .string(1, "m_Name")
            .field(1, "int", "m_Channels", 4, 0)
            .field(1, "int", "m_Frequency", 4, 0)
            .field(1, "StreamedResource", "m_Resource", -1, 0)
            .string(2, "m_Source")
            .field(2, "UInt64", "m_Offset", 8, 0)
            .field(2, "UInt64", "m_Size", 8, 0)
    }

    pub fn asset_bundle() -> Self {
        Self::empty("AssetBundle")
            .string(1, "m_Name")
            .field(1, "map", "m_Container", -1, 0)
            .field(2, "Array", "Array", -1, 0)
            .field(3, "int", "size", 4, 0)
            .field(3, "pair", "data", -1, 0)
            .string(4, "first")
            .field(4, "AssetInfo", "second", -1, 0)
            .field(5, "int", "preloadIndex", 4, 0)
            .field(5, "int", "preloadSize", 4, 0)
            .field(5, "PPtr<Object>", "asset", -1, 0)
            .field(6, "int", "m_FileID", 4, 0)
            .field(6, "SInt64", "m_PathID", 8, 0)
    }

    /// Serialize in blob format with reference type hashes (version 19+).
    ///
    /// Names present in Unity's built-in string table are referenced there.
    pub fn build(&self) -> Vec<u8> {
        let mut strings = Vec::new();
        let mut offset_of = |s: &str| -> u32 {
            if let Some(common) = common_string_offset(s) {
                return common | COMMON_STRING_FLAG;
            }
            let offset = strings.len() as u32;
            strings.extend_from_slice(s.as_bytes());
            strings.push(0);
            offset
        };

        let mut nodes = Vec::new();
        for (index, (level, type_name, name, byte_size, flags)) in self.nodes.iter().enumerate() {
            nodes.extend_from_slice(&1u16.to_le_bytes());
            nodes.push(*level);
            nodes.push(0);
            nodes.extend_from_slice(&offset_of(type_name).to_le_bytes());
            nodes.extend_from_slice(&offset_of(name).to_le_bytes());
            nodes.extend_from_slice(&byte_size.to_le_bytes());
            nodes.extend_from_slice(&(index as i32).to_le_bytes());
            nodes.extend_from_slice(&flags.to_le_bytes());
            nodes.extend_from_slice(&0u64.to_le_bytes());
        }

        let mut out = Vec::new();
        out.extend_from_slice(&(self.nodes.len() as i32).to_le_bytes());
        out.extend_from_slice(&(strings.len() as i32).to_le_bytes());
        out.extend(nodes);
        out.extend(strings);
        out
    }
}

fn common_string_offset(s: &str) -> Option<u32> {
    let mut offset = 0;
    for common in COMMON_STRINGS.split('\0') {
        if common == s && !s.is_empty() {
            return Some(offset);
        }
        offset += common.len() as u32 + 1;
    }
    None
}

/// Little-endian object data matching the presets of [`TypeTreeBuilder`]
#[derive(Debug, Clone, Default)]
pub struct ObjectWriter {
    buf: Vec<u8>,
}

impl ObjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn uint(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn long(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn ulong(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// A `bool` followed by alignment
    pub fn flag(mut self, v: bool) -> Self {
        self.buf.push(v as u8);
        self.align()
    }

    /// Length-prefixed bytes followed by alignment (`string`, `TypelessData`)
    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.buf.extend_from_slice(&(v.len() as i32).to_le_bytes());
        self.buf.extend_from_slice(v);
        self.align()
    }

    pub fn string(self, v: &str) -> Self {
        self.bytes(v.as_bytes())
    }

    fn align(mut self) -> Self {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// TextAsset data
    pub fn text_asset(name: &str, script: &[u8]) -> Vec<u8> {
        Self::new().string(name).bytes(script).finish()
    }

    /// Texture2D data with inline pixels
    pub fn texture_2d(name: &str, width: i32, height: i32, format: i32, pixels: &[u8]) -> Vec<u8> {
        Self::new()
            .string(name)
            .int(width)
            .int(height)
            .int(format)
            .flag(true)
            .bytes(pixels)
            .ulong(0)
            .uint(0)
            .string("")
            .finish()
    }

    /// Texture2D data streamed from a resource node
    pub fn streamed_texture_2d(
        name: &str,
        (width, height, format): (i32, i32, i32),
        path: &str,
        offset: u64,
        size: u32,
    ) -> Vec<u8> {
        Self::new()
            .string(name)
            .int(width)
            .int(height)
            .int(format)
            .flag(false)
            .bytes(&[])
            .ulong(offset)
            .uint(size)
            .string(path)
            .finish()
    }

    /// AudioClip data streamed from a resource node
    pub fn audio_clip(name: &str, source: &str, offset: u64, size: u64) -> Vec<u8> {
        Self::new()
            .string(name)
            .int(2)
            .int(44100)
            .string(source)
            .ulong(offset)
            .ulong(size)
            .finish()
    }

    /// AssetBundle data with `(container path, path id)` entries
    pub fn asset_bundle(name: &str, container: &[(&str, i64)]) -> Vec<u8> {
        let mut writer = Self::new().string(name).int(container.len() as i32);
        for (index, (path, path_id)) in container.iter().enumerate() {
            writer = writer
                .string(path)
                .int(index as i32)
                .int(1)
                .int(0)
                .long(*path_id);
        }
        writer.finish()
    }
}

struct FixtureObject {
    path_id: i64,
    type_index: usize,
    data: Vec<u8>,
}

/// Writes a version 22 little-endian SerializedFile
#[derive(Default)]
pub struct SerializedFileBuilder {
    types: Vec<(i32, TypeTreeBuilder)>,
    objects: Vec<FixtureObject>,
    without_type_trees: bool,
}

impl SerializedFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; the first tree given for a class id is the one written
    pub fn object(mut self, path_id: i64, class_id: i32, tree: TypeTreeBuilder, data: Vec<u8>) -> Self {
        let type_index = match self.types.iter().position(|(id, _)| *id == class_id) {
            Some(index) => index,
            None => {
                self.types.push((class_id, tree));
                self.types.len() - 1
            }
        };
        self.objects.push(FixtureObject {
            path_id,
            type_index,
            data,
        });
        self
    }

    /// Write types without TypeTrees, as stripped player builds do
    pub fn without_type_trees(mut self) -> Self {
        self.without_type_trees = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const HEADER_SIZE: usize = 48;

        let mut meta = Vec::new();
        meta.extend_from_slice(b"2020.3.48f1\0");
        meta.extend_from_slice(&19i32.to_le_bytes());
        meta.push(!self.without_type_trees as u8);

        meta.extend_from_slice(&(self.types.len() as i32).to_le_bytes());
        for (class_id, tree) in &self.types {
            meta.extend_from_slice(&class_id.to_le_bytes());
            meta.push(0);
            meta.extend_from_slice(&(-1i16).to_le_bytes());
            if *class_id == class_ids::MONO_BEHAVIOUR {
                meta.extend_from_slice(&[0u8; 16]);
            }
            meta.extend_from_slice(&[0u8; 16]);
            if !self.without_type_trees {
                meta.extend(tree.build());
                meta.extend_from_slice(&0i32.to_le_bytes());
            }
        }

        let mut data = Vec::new();
        let mut table = Vec::new();
        for object in &self.objects {
            while data.len() % 8 != 0 {
                data.push(0);
            }
            table.push((object, data.len()));
            data.extend_from_slice(&object.data);
        }

        meta.extend_from_slice(&(self.objects.len() as i32).to_le_bytes());
        for (object, start) in table {
            while (HEADER_SIZE + meta.len()) % 4 != 0 {
                meta.push(0);
            }
            meta.extend_from_slice(&object.path_id.to_le_bytes());
            meta.extend_from_slice(&(start as i64).to_le_bytes());
            meta.extend_from_slice(&(object.data.len() as u32).to_le_bytes());
            meta.extend_from_slice(&(object.type_index as i32).to_le_bytes());
        }
        // Script types, externals, reference types, user information
        meta.extend_from_slice(&0i32.to_le_bytes());
        meta.extend_from_slice(&0i32.to_le_bytes());
        meta.extend_from_slice(&0i32.to_le_bytes());
        meta.push(0);

        let data_offset = (HEADER_SIZE + meta.len()).next_multiple_of(16);
        let file_size = data_offset + data.len();

        let mut out = Vec::with_capacity(file_size);
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&22u32.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&(meta.len() as u32).to_be_bytes());
        out.extend_from_slice(&(file_size as i64).to_be_bytes());
        out.extend_from_slice(&(data_offset as i64).to_be_bytes());
        out.extend_from_slice(&0i64.to_be_bytes());
        out.extend(meta);
        out.resize(data_offset, 0);
        out.extend(data);
        out
    }
}

/// Writes a version 7 UnityFS bundle with a single storage block
#[derive(Default)]
pub struct BundleBuilder {
    nodes: Vec<(String, Vec<u8>, bool)>,
    compression: Compression,
    blocks_info_at_end: bool,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn blocks_info_at_end(mut self) -> Self {
        self.blocks_info_at_end = true;
        self
    }

    /// Add a directory node; `serialized` marks a SerializedFile
    pub fn node(mut self, path: &str, data: Vec<u8>, serialized: bool) -> Self {
        self.nodes.push((path.to_string(), data, serialized));
        self
    }

    /// Add a SerializedFile node
    pub fn serialized_file(self, path: &str, file: &SerializedFileBuilder) -> Self {
        self.node(path, file.build(), true)
    }

    pub fn build(&self) -> Vec<u8> {
        let stream: Vec<u8> = self.nodes.iter().flat_map(|(_, data, _)| data.clone()).collect();
        let (block, compression_flag) = match self.compression {
            Compression::None => (stream.clone(), 0u32),
            Compression::Lz4 => (lz4_flex::compress(&stream), 3u32),
        };

        let mut info = vec![0u8; 16];
        if stream.is_empty() {
            info.extend_from_slice(&0i32.to_be_bytes());
        } else {
            info.extend_from_slice(&1i32.to_be_bytes());
            info.extend_from_slice(&(stream.len() as u32).to_be_bytes());
            info.extend_from_slice(&(block.len() as u32).to_be_bytes());
            info.extend_from_slice(&(compression_flag as u16).to_be_bytes());
        }
        info.extend_from_slice(&(self.nodes.len() as i32).to_be_bytes());
        let mut offset = 0i64;
        for (path, data, serialized) in &self.nodes {
            info.extend_from_slice(&offset.to_be_bytes());
            info.extend_from_slice(&(data.len() as i64).to_be_bytes());
            info.extend_from_slice(&(if *serialized { 4u32 } else { 0 }).to_be_bytes());
            info.extend_from_slice(path.as_bytes());
            info.push(0);
            offset += data.len() as i64;
        }
        let packed_info = match self.compression {
            Compression::None => info.clone(),
            Compression::Lz4 => lz4_flex::compress(&info),
        };

        let mut flags = compression_flag | 0x40;
        if self.blocks_info_at_end {
            flags |= 0x80;
        }

        let mut header = Vec::new();
        header.extend_from_slice(b"UnityFS\0");
        header.extend_from_slice(&7u32.to_be_bytes());
        header.extend_from_slice(b"5.x.x\0");
        header.extend_from_slice(b"2020.3.48f1\0");
        let size_at = header.len();
        header.extend_from_slice(&0i64.to_be_bytes());
        header.extend_from_slice(&(packed_info.len() as u32).to_be_bytes());
        header.extend_from_slice(&(info.len() as u32).to_be_bytes());
        header.extend_from_slice(&flags.to_be_bytes());
        header.resize(header.len().next_multiple_of(16), 0);

        let mut out = header;
        if self.blocks_info_at_end {
            out.extend(block);
            out.extend(packed_info);
        } else {
            out.extend(packed_info);
            out.extend(block);
        }
        let total = out.len() as i64;
        out[size_at..size_at + 8].copy_from_slice(&total.to_be_bytes());
        out
    }
}
