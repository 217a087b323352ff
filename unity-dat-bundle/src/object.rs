//! Objects of a loaded UnityFS bundle

use crate::bundle::BundleFile;
use crate::error::{BinaryError, Result};
use crate::reader::BinaryReader;
use crate::serialized::{ObjectEntry, SerializedFile};
use crate::texture;
use crate::typetree::Value;
use image::RgbaImage;
use std::sync::Arc;
use unity_dat_core::{AssetObject, Payload, ReadError, class_ids};

/// A parsed bundle shared by all of its objects
#[derive(Debug)]
pub(crate) struct LoadedBundle {
    pub bundle: BundleFile,
    /// SerializedFiles with the index of the node they were read from
    pub files: Vec<(usize, SerializedFile)>,
}

impl LoadedBundle {
    /// Raw bytes of an object
    pub fn object_data(&self, file: usize, entry: &ObjectEntry) -> &[u8] {
        let (node, _) = &self.files[file];
        let data = self.bundle.node_data(&self.bundle.nodes[*node]);
        let start = entry.byte_start as usize;
        &data[start..start + entry.byte_size as usize]
    }

    /// Bytes of a streamed resource (`.resS`/`.resource` node)
    pub fn resource(&self, path: &str, offset: u64, size: u64) -> std::result::Result<&[u8], ReadError> {
        let name = path.rsplit('/').next().unwrap_or(path);
        let node = self
            .bundle
            .find_node(name)
            .ok_or_else(|| ReadError::missing_resource(path))?;
        let data = self.bundle.node_data(node);
        offset
            .checked_add(size)
            .filter(|&end| end <= data.len() as u64)
            .map(|end| &data[offset as usize..end as usize])
            .ok_or_else(|| {
                ReadError::corrupted(format!(
                    "{} bytes at {} exceed {} ({} bytes)",
                    size,
                    offset,
                    path,
                    data.len()
                ))
            })
    }
}

/// An object enumerated from a UnityFS bundle
#[derive(Debug, Clone)]
pub struct BundleObject {
    pub(crate) bundle: Arc<LoadedBundle>,
    pub(crate) file: usize,
    pub(crate) entry: ObjectEntry,
    pub(crate) type_tag: String,
    pub(crate) name: Option<String>,
    pub(crate) container_path: Option<String>,
}

impl BundleObject {
    /// Unity class id of the object
    pub fn class_id(&self) -> i32 {
        self.entry.class_id
    }

    /// Path of the SerializedFile the object lives in
    pub fn file_path(&self) -> &str {
        let (node, _) = &self.bundle.files[self.file];
        &self.bundle.bundle.nodes[*node].path
    }

    fn serialized(&self) -> &SerializedFile {
        &self.bundle.files[self.file].1
    }

    fn data(&self) -> &[u8] {
        self.bundle.object_data(self.file, &self.entry)
    }

    /// Deserialize every field through the type tree
    pub fn read_value(&self) -> Result<Value> {
        let file = self.serialized();
        let tree = file.type_tree(&self.entry).ok_or_else(|| {
            BinaryError::unsupported(format!("{} without type tree", self.type_tag))
        })?;
        let mut reader = BinaryReader::new(self.data(), file.byte_order());
        tree.read_object(&mut reader)
    }

    fn read_texture(&self) -> std::result::Result<Payload, ReadError> {
        let value = self.read_value()?;
        let int = |field: &str| value.get(field).and_then(Value::as_i64).unwrap_or(0);
        let (width, height) = (int("m_Width"), int("m_Height"));
        if width <= 0 || height <= 0 {
            return Ok(Payload::Image(RgbaImage::new(0, 0)));
        }

        let inline = value
            .get("image data")
            .and_then(Value::as_bytes)
            .unwrap_or_default();
        let pixels = if inline.is_empty() {
            self.streamed(value.get("m_StreamData"), "offset", "size")?
        } else {
            inline
        };

        let image = texture::decode(
            int("m_TextureFormat") as i32,
            width as u32,
            height as u32,
            pixels,
        )?;
        Ok(Payload::Image(image))
    }

    fn read_audio(&self) -> std::result::Result<Payload, ReadError> {
        let value = self.read_value()?;
        if let Some(legacy) = value.get("m_AudioData").and_then(Value::as_bytes) {
            return Ok(Payload::RawBytes(legacy.to_vec()));
        }
        let bytes = self.streamed(value.get("m_Resource"), "m_Offset", "m_Size")?;
        Ok(Payload::RawBytes(bytes.to_vec()))
    }

    fn read_text(&self) -> std::result::Result<Payload, ReadError> {
        let file = self.serialized();
        if file.type_tree(&self.entry).is_some() {
            let value = self.read_value()?;
            let script = value
                .get("m_Script")
                .and_then(Value::as_bytes)
                .ok_or_else(|| ReadError::corrupted("TextAsset without m_Script"))?;
            return Ok(Payload::RawBytes(script.to_vec()));
        }

        // Name then script, both length-prefixed
        let mut reader = BinaryReader::new(self.data(), file.byte_order());
        reader.read_sized_bytes()?;
        reader.align()?;
        let script = reader.read_sized_bytes()?;
        Ok(Payload::RawBytes(script))
    }

    /// Resolve a `StreamingInfo`/`StreamedResource` field to resource bytes
    fn streamed(
        &self,
        info: Option<&Value>,
        offset_field: &str,
        size_field: &str,
    ) -> std::result::Result<&[u8], ReadError> {
        let Some(info) = info else {
            return Ok(&[][..]);
        };
        let size = info.get(size_field).and_then(Value::as_u64).unwrap_or(0);
        if size == 0 {
            return Ok(&[][..]);
        }
        let offset = info.get(offset_field).and_then(Value::as_u64).unwrap_or(0);
        let path = info
            .get("path")
            .or_else(|| info.get("m_Source"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if path.is_empty() {
            return Err(ReadError::missing_resource(format!(
                "{} streams {} bytes from no resource",
                self.type_tag, size
            )));
        }
        self.bundle.resource(path, offset, size)
    }
}

impl AssetObject for BundleObject {
    fn path_id(&self) -> i64 {
        self.entry.path_id
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn declared_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn original_path(&self) -> Option<&str> {
        self.container_path.as_deref()
    }

    fn read(&self) -> std::result::Result<Payload, ReadError> {
        match self.entry.class_id {
            class_ids::TEXTURE_2D => self.read_texture(),
            class_ids::AUDIO_CLIP => self.read_audio(),
            class_ids::TEXT_ASSET => self.read_text(),
            _ => Ok(Payload::RawBytes(self.data().to_vec())),
        }
    }
}
