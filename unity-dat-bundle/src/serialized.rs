//! SerializedFile parsing
//!
//! Only what enumeration needs is parsed: the header, the type table with
//! its TypeTrees and the object table. Script types, externals and
//! reference types after the object table are left alone.

use crate::bundle::read_count;
use crate::error::{BinaryError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use crate::typetree::TypeTree;

/// Oldest SerializedFile version read (Unity 5.0)
pub const MIN_VERSION: u32 = 14;

const MONO_BEHAVIOUR_CLASS: i32 = 114;

/// SerializedFile header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFileHeader {
    pub metadata_size: u32,
    pub file_size: u64,
    pub version: u32,
    pub data_offset: u64,
    pub byte_order: ByteOrder,
}

impl SerializedFileHeader {
    /// Parse the big-endian header, leaving `reader` at the metadata
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        reader.set_byte_order(ByteOrder::Big);
        let mut metadata_size = reader.read_u32()?;
        let mut file_size = reader.read_u32()? as u64;
        let version = reader.read_u32()?;
        let mut data_offset = reader.read_u32()? as u64;

        if version < MIN_VERSION {
            return Err(BinaryError::unsupported(format!(
                "SerializedFile version {}",
                version
            )));
        }

        let byte_order = match reader.read_u8()? {
            0 => ByteOrder::Little,
            _ => ByteOrder::Big,
        };
        reader.read_bytes(3)?;

        if version >= 22 {
            metadata_size = reader.read_u32()?;
            file_size = read_offset(reader)?;
            data_offset = read_offset(reader)?;
            reader.read_i64()?;
        }

        Ok(Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            byte_order,
        })
    }
}

/// An entry of the type table
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedType {
    pub class_id: i32,
    pub is_stripped: bool,
    pub script_type_index: i16,
    pub type_tree: TypeTree,
}

impl SerializedType {
    fn from_reader(reader: &mut BinaryReader, version: u32, enable_type_tree: bool) -> Result<Self> {
        let class_id = reader.read_i32()?;
        let is_stripped = version >= 16 && reader.read_bool()?;
        let script_type_index = if version >= 17 { reader.read_i16()? } else { -1 };

        let has_script_id = if version < 16 {
            class_id < 0
        } else {
            class_id == MONO_BEHAVIOUR_CLASS
        };
        if has_script_id {
            reader.read_bytes(16)?;
        }
        // Old type hash
        reader.read_bytes(16)?;

        let mut type_tree = TypeTree::default();
        if enable_type_tree {
            type_tree = TypeTree::from_reader_blob(reader, version)?;
            if version >= 21 {
                let dependencies = read_count(reader, 4)?;
                reader.read_bytes(dependencies * 4)?;
            }
        }

        Ok(Self {
            class_id,
            is_stripped,
            script_type_index,
            type_tree,
        })
    }
}

/// An entry of the object table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    pub path_id: i64,
    /// Absolute offset in the SerializedFile
    pub byte_start: u64,
    pub byte_size: u32,
    pub class_id: i32,
    /// Index into the type table, when the object's type is listed there
    pub type_index: Option<usize>,
}

/// A parsed SerializedFile
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedFile {
    pub header: SerializedFileHeader,
    pub unity_version: String,
    pub target_platform: i32,
    pub enable_type_tree: bool,
    pub types: Vec<SerializedType>,
    pub objects: Vec<ObjectEntry>,
}

impl SerializedFile {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data, ByteOrder::Big);
        let header = SerializedFileHeader::from_reader(&mut reader)?;
        let version = header.version;
        reader.set_byte_order(header.byte_order);

        let unity_version = reader.read_cstring()?;
        let target_platform = reader.read_i32()?;
        let enable_type_tree = reader.read_bool()?;

        let type_count = read_count(&mut reader, 20)?;
        let mut types = Vec::with_capacity(type_count);
        for _ in 0..type_count {
            types.push(SerializedType::from_reader(
                &mut reader,
                version,
                enable_type_tree,
            )?);
        }

        let object_count = read_count(&mut reader, 20)?;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            reader.align()?;
            let path_id = reader.read_i64()?;
            let byte_start = if version >= 22 {
                read_offset(&mut reader)?
            } else {
                reader.read_u32()? as u64
            };
            let byte_size = reader.read_u32()?;
            let type_id = reader.read_i32()?;

            let (class_id, type_index) = if version < 16 {
                let class_id = reader.read_u16()? as i32;
                let index = types.iter().position(|t| t.class_id == type_id);
                (class_id, index)
            } else {
                let index = usize::try_from(type_id)
                    .ok()
                    .filter(|&i| i < types.len())
                    .ok_or_else(|| {
                        BinaryError::invalid_data(format!(
                            "object {} has type index {} of {}",
                            path_id,
                            type_id,
                            types.len()
                        ))
                    })?;
                (types[index].class_id, Some(index))
            };
            if version < 17 {
                // Script type index
                reader.read_i16()?;
            }
            if version == 15 || version == 16 {
                // Stripped flag
                reader.read_u8()?;
            }

            let byte_start = header.data_offset + byte_start;
            if byte_start + byte_size as u64 > data.len() as u64 {
                return Err(BinaryError::invalid_data(format!(
                    "object {} ends past the file ({} bytes)",
                    path_id,
                    data.len()
                )));
            }

            objects.push(ObjectEntry {
                path_id,
                byte_start,
                byte_size,
                class_id,
                type_index,
            });
        }

        Ok(Self {
            header,
            unity_version,
            target_platform,
            enable_type_tree,
            types,
            objects,
        })
    }

    /// TypeTree of an object, if the file carries one for its type
    pub fn type_tree(&self, object: &ObjectEntry) -> Option<&TypeTree> {
        object
            .type_index
            .and_then(|index| self.types.get(index))
            .map(|t| &t.type_tree)
            .filter(|tree| !tree.is_empty())
    }

    /// Byte order of object data
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }
}

fn read_offset(reader: &mut BinaryReader) -> Result<u64> {
    let value = reader.read_i64()?;
    u64::try_from(value).map_err(|_| BinaryError::invalid_data(format!("negative offset {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{SerializedFileBuilder, TypeTreeBuilder};

    #[test]
    fn test_parse_objects_and_types() {
        let data = SerializedFileBuilder::new()
            .object(-7, 49, TypeTreeBuilder::text_asset(), b"first".to_vec())
            .object(12, 49, TypeTreeBuilder::text_asset(), b"second!".to_vec())
            .object(3, 1, TypeTreeBuilder::empty("GameObject"), vec![1, 2, 3])
            .build();

        let file = SerializedFile::parse(&data).unwrap();
        assert_eq!(file.header.version, 22);
        assert_eq!(file.header.byte_order, ByteOrder::Little);
        assert!(file.enable_type_tree);
        assert_eq!(file.types.len(), 2);

        let ids: Vec<_> = file.objects.iter().map(|o| (o.path_id, o.class_id)).collect();
        assert_eq!(ids, vec![(-7, 49), (12, 49), (3, 1)]);

        let second = &file.objects[1];
        let start = second.byte_start as usize;
        assert_eq!(&data[start..start + second.byte_size as usize], b"second!");
        assert!(file.type_tree(second).is_some());
    }

    #[test]
    fn test_rejects_old_version() {
        let mut data = SerializedFileBuilder::new().build();
        data[8..12].copy_from_slice(&9u32.to_be_bytes());
        assert!(matches!(
            SerializedFile::parse(&data),
            Err(BinaryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_object_past_end() {
        let data = SerializedFileBuilder::new()
            .object(1, 49, TypeTreeBuilder::text_asset(), vec![0u8; 32])
            .build();
        assert!(SerializedFile::parse(&data[..data.len() - 8]).is_err());
    }
}
