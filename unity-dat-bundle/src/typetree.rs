//! TypeTree parsing and generic object reading
//!
//! A TypeTree describes the serialized layout of one class as a flat,
//! depth-annotated list of fields. [`TypeTree::read_object`] walks that
//! layout over an object's bytes and yields a [`Value`] per field.

use crate::error::{BinaryError, Result};
use crate::reader::BinaryReader;
use indexmap::IndexMap;

/// Field flag: align the stream to 4 bytes after this field
pub(crate) const ALIGN_BYTES: i32 = 0x4000;

/// String offsets with the high bit set index Unity's built-in string table
pub(crate) const COMMON_STRING_FLAG: u32 = 0x8000_0000;

/// Unity's built-in TypeTree strings, addressed by byte offset
pub(crate) const COMMON_STRINGS: &str = concat!(
    "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0BitField\0",
    "bitset\0bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0",
    "FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0",
    "GUID\0GUIStyle\0int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0",
    "MonoScript\0m_ByteSize\0m_Curve\0m_EditorClassIdentifier\0m_EditorHideFlags\0",
    "m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0m_IsArray\0m_IsStatic\0",
    "m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0m_PrefabParentObject\0",
    "m_Script\0m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0PPtr<Component>\0",
    "PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0",
    "PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0",
    "PPtr<Texture2D>\0PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0",
    "RectOffset\0second\0set\0short\0size\0SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0",
    "string\0TextAsset\0TextMesh\0Texture\0Texture2D\0Transform\0TypelessData\0UInt16\0",
    "UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0unsigned short\0vector\0",
    "Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0Type*\0",
    "int2_storage\0int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0",
    "m_PrefabInstance\0m_PrefabAsset\0FileSize\0Hash128\0",
);

/// Upper bound on array lengths, independent of the remaining bytes
const MAX_ARRAY_LEN: usize = 1 << 26;

/// A field of a TypeTree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTreeNode {
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub level: u8,
    pub meta_flags: i32,
    pub children: Vec<TypeTreeNode>,
}

impl TypeTreeNode {
    /// Whether the stream is aligned to 4 bytes after this field
    pub fn is_aligned(&self) -> bool {
        self.meta_flags & ALIGN_BYTES != 0
    }

    /// Whether this field is an array wrapper (`vector`, `string`, `map`, ...)
    fn array_child(&self) -> Option<&TypeTreeNode> {
        self.children
            .first()
            .filter(|child| child.type_name == "Array")
    }

    pub fn find_child(&self, name: &str) -> Option<&TypeTreeNode> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// A deserialized field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Byte arrays, `TypelessData` and strings that are not UTF-8
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Pair(Box<Value>, Box<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Field of an object value
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => u64::try_from(v).ok(),
            Value::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a string or byte array
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// The layout of one serialized class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTree {
    /// Root field (the class itself); `None` when types were stripped
    pub root: Option<TypeTreeNode>,
}

impl TypeTree {
    /// Parse a TypeTree in blob format (SerializedFile version 12 and later)
    pub fn from_reader_blob(reader: &mut BinaryReader, version: u32) -> Result<Self> {
        let node_count = crate::bundle::read_count(reader, 24)?;
        let string_buffer_size = reader.read_i32()?;
        let string_buffer_size = usize::try_from(string_buffer_size).map_err(|_| {
            BinaryError::invalid_data(format!("negative string buffer size {}", string_buffer_size))
        })?;

        let mut raw = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let _version = reader.read_u16()?;
            let level = reader.read_u8()?;
            let _type_flags = reader.read_u8()?;
            let type_offset = reader.read_u32()?;
            let name_offset = reader.read_u32()?;
            let byte_size = reader.read_i32()?;
            let _index = reader.read_i32()?;
            let meta_flags = reader.read_i32()?;
            if version >= 19 {
                let _ref_type_hash = reader.read_u64()?;
            }
            raw.push((level, type_offset, name_offset, byte_size, meta_flags));
        }

        let strings = reader.read_bytes(string_buffer_size)?;
        let flat: Vec<TypeTreeNode> = raw
            .into_iter()
            .map(|(level, type_offset, name_offset, byte_size, meta_flags)| TypeTreeNode {
                type_name: lookup_string(&strings, type_offset),
                name: lookup_string(&strings, name_offset),
                byte_size,
                level,
                meta_flags,
                children: Vec::new(),
            })
            .collect();

        Ok(Self {
            root: build_hierarchy(flat)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Read every field of an object
    pub fn read_object(&self, reader: &mut BinaryReader) -> Result<Value> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| BinaryError::unsupported("object has no type tree"))?;
        read_value(root, reader)
    }

    /// Read fields up to and including `field`, stopping there.
    ///
    /// Returns `None` when the class has no such top-level field.
    pub fn read_field(&self, reader: &mut BinaryReader, field: &str) -> Result<Option<Value>> {
        let Some(root) = self.root.as_ref() else {
            return Ok(None);
        };
        if root.find_child(field).is_none() {
            return Ok(None);
        }
        for child in &root.children {
            let value = read_value(child, reader)?;
            if child.name == field {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn lookup_string(local: &[u8], offset: u32) -> String {
    let (buffer, start) = if offset & COMMON_STRING_FLAG != 0 {
        (COMMON_STRINGS.as_bytes(), (offset & !COMMON_STRING_FLAG) as usize)
    } else {
        (local, offset as usize)
    };

    match buffer.get(start..) {
        Some(rest) => {
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            String::from_utf8_lossy(&rest[..end]).into_owned()
        }
        None => format!("unknown_{}", offset),
    }
}

/// Nest a flat, depth-annotated field list under its single root
fn build_hierarchy(flat: Vec<TypeTreeNode>) -> Result<Option<TypeTreeNode>> {
    let mut nodes = flat.into_iter();
    let Some(mut root) = nodes.next() else {
        return Ok(None);
    };

    // Chain of open ancestors, innermost last
    let mut open: Vec<TypeTreeNode> = Vec::new();
    for node in nodes {
        while node.level <= root.level {
            let parent = open.pop().ok_or_else(|| {
                BinaryError::invalid_data(format!("type tree node {} has no parent", node.name))
            })?;
            let finished = std::mem::replace(&mut root, parent);
            root.children.push(finished);
        }
        if node.level != root.level + 1 {
            return Err(BinaryError::invalid_data(format!(
                "type tree node {} skips a level",
                node.name
            )));
        }
        open.push(std::mem::replace(&mut root, node));
    }
    while let Some(parent) = open.pop() {
        let finished = std::mem::replace(&mut root, parent);
        root.children.push(finished);
    }
    Ok(Some(root))
}

fn read_value(node: &TypeTreeNode, reader: &mut BinaryReader) -> Result<Value> {
    let mut align = node.is_aligned();

    let value = match node.type_name.as_str() {
        "SInt8" => Value::Int(reader.read_i8()? as i64),
        "UInt8" | "char" => Value::UInt(reader.read_u8()? as u64),
        "SInt16" | "short" => Value::Int(reader.read_i16()? as i64),
        "UInt16" | "unsigned short" => Value::UInt(reader.read_u16()? as u64),
        "SInt32" | "int" => Value::Int(reader.read_i32()? as i64),
        "UInt32" | "unsigned int" | "Type*" => Value::UInt(reader.read_u32()? as u64),
        "SInt64" | "long long" => Value::Int(reader.read_i64()?),
        "UInt64" | "unsigned long long" | "FileSize" => Value::UInt(reader.read_u64()?),
        "float" => Value::Float(reader.read_f32()? as f64),
        "double" => Value::Float(reader.read_f64()?),
        "bool" => Value::Bool(reader.read_bool()?),
        "string" => {
            align |= node.array_child().is_some_and(TypeTreeNode::is_aligned);
            let bytes = reader.read_sized_bytes()?;
            match String::from_utf8(bytes) {
                Ok(s) => Value::String(s),
                Err(e) => Value::Bytes(e.into_bytes()),
            }
        }
        "TypelessData" => Value::Bytes(reader.read_sized_bytes()?),
        "pair" if node.children.len() == 2 => {
            let first = read_value(&node.children[0], reader)?;
            let second = read_value(&node.children[1], reader)?;
            Value::Pair(Box::new(first), Box::new(second))
        }
        _ => match node.array_child() {
            Some(array) => {
                align |= array.is_aligned();
                read_array(array, reader)?
            }
            None => {
                let mut fields = IndexMap::with_capacity(node.children.len());
                for child in &node.children {
                    fields.insert(child.name.clone(), read_value(child, reader)?);
                }
                Value::Object(fields)
            }
        },
    };

    if align {
        reader.align()?;
    }
    Ok(value)
}

/// Read an `Array` node: an `int` size followed by that many elements
fn read_array(array: &TypeTreeNode, reader: &mut BinaryReader) -> Result<Value> {
    let element = array
        .children
        .get(1)
        .ok_or_else(|| BinaryError::invalid_data("array without element type"))?;

    let size = reader.read_i32()?;
    let size = usize::try_from(size)
        .ok()
        .filter(|&n| n <= MAX_ARRAY_LEN)
        .ok_or_else(|| BinaryError::invalid_data(format!("array size {}", size)))?;

    if matches!(element.type_name.as_str(), "UInt8" | "char") {
        return Ok(Value::Bytes(reader.read_bytes(size)?));
    }

    let mut items = Vec::with_capacity(size.min(reader.remaining()));
    for _ in 0..size {
        items.push(read_value(element, reader)?);
    }
    Ok(Value::Array(items))
}
