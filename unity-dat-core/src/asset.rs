//! Asset object records
//!
//! An [`ObjectInfo`] is what enumeration yields for each object of a loaded
//! bundle; an [`AssetPayload`] is the same record after its payload has been
//! read.

use crate::constants::FALLBACK_NAME_PREFIX;
use image::RgbaImage;

/// Information about an asset object in a loaded bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Zero-based enumeration index
    pub index: usize,
    /// Path ID (unique identifier within the container)
    pub path_id: i64,
    /// Type tag reported by the reader (e.g. "Texture2D")
    pub type_tag: String,
    /// Declared object name
    pub declared_name: Option<String>,
    /// Original asset path inside the container
    pub original_path: Option<String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo without name or path
    pub fn new<S: Into<String>>(index: usize, path_id: i64, type_tag: S) -> Self {
        Self {
            index,
            path_id,
            type_tag: type_tag.into(),
            declared_name: None,
            original_path: None,
        }
    }

    /// Name used for output files.
    ///
    /// Declared name if non-empty, else original path if non-empty, else
    /// `<prefix><path id>`. Colliding declared names are not disambiguated.
    pub fn resolved_name(&self, fallback_prefix: &str) -> String {
        non_empty(self.declared_name.as_deref())
            .or_else(|| non_empty(self.original_path.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", fallback_prefix, self.path_id))
    }

    /// [`resolved_name`](Self::resolved_name) with the default `path_id_` prefix
    pub fn default_name(&self) -> String {
        self.resolved_name(FALLBACK_NAME_PREFIX)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Decoded payload of an asset object
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded texture pixels
    Image(RgbaImage),
    /// Raw payload bytes (audio, text assets, everything else)
    RawBytes(Vec<u8>),
}

impl Payload {
    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image",
            Payload::RawBytes(_) => "raw bytes",
        }
    }

    /// Whether the payload carries no data at all
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Image(image) => image.width() == 0 || image.height() == 0,
            Payload::RawBytes(bytes) => bytes.is_empty(),
        }
    }
}

/// An asset object together with its read payload
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPayload {
    pub info: ObjectInfo,
    pub payload: Payload,
}

impl AssetPayload {
    pub fn new(info: ObjectInfo, payload: Payload) -> Self {
        Self { info, payload }
    }

    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn type_tag(&self) -> &str {
        &self.info.type_tag
    }
}
