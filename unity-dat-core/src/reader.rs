//! Bundle reader contract
//!
//! The container format is parsed by an external library. This module
//! defines what the pipeline needs from it and wraps a single load in an
//! [`Environment`] that fixes the enumeration order.

use crate::asset::{AssetPayload, ObjectInfo, Payload};
use crate::error::{LoadError, ReadError, Result};
use std::path::Path;
use tracing::{debug, instrument};

/// One object enumerated by a [`BundleReader`]
pub trait AssetObject {
    /// Stable per-object identifier from the container
    fn path_id(&self) -> i64;

    /// Type tag classifying the payload kind (e.g. "Texture2D")
    fn type_tag(&self) -> &str;

    /// Declared object name, if any
    fn declared_name(&self) -> Option<&str> {
        None
    }

    /// Original asset path inside the container, if any
    fn original_path(&self) -> Option<&str> {
        None
    }

    /// Read and decode the payload on demand
    fn read(&self) -> std::result::Result<Payload, ReadError>;
}

/// Loads a plaintext bundle into an ordered list of objects.
///
/// Loading the same bytes twice must yield the same objects in the same
/// order; the pipeline identifies objects only by position and type tag.
pub trait BundleReader {
    type Object: AssetObject;

    /// Load a bundle from memory
    fn load_bytes(&self, data: Vec<u8>) -> std::result::Result<Vec<Self::Object>, LoadError>;

    /// Load a bundle from file path
    fn load_path(&self, path: &Path) -> std::result::Result<Vec<Self::Object>, LoadError> {
        let data = std::fs::read(path)?;
        self.load_bytes(data)
    }
}

/// A freshly loaded bundle with index-stable objects
pub struct Environment<O> {
    objects: Vec<O>,
    infos: Vec<ObjectInfo>,
}

impl<O: AssetObject> Environment<O> {
    /// Load a bundle from file path through `reader`
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<R, P>(reader: &R, path: P) -> Result<Self>
    where
        R: BundleReader<Object = O>,
        P: AsRef<Path>,
    {
        let objects = reader.load_path(path.as_ref())?;
        debug!(objects = objects.len(), "bundle loaded");
        Ok(Self::from_objects(objects))
    }

    /// Load a bundle from memory through `reader`
    pub fn from_bytes<R>(reader: &R, data: Vec<u8>) -> Result<Self>
    where
        R: BundleReader<Object = O>,
    {
        let objects = reader.load_bytes(data)?;
        Ok(Self::from_objects(objects))
    }

    /// Wrap already enumerated objects, numbering them in order
    pub fn from_objects(objects: Vec<O>) -> Self {
        let infos = objects
            .iter()
            .enumerate()
            .map(|(index, object)| ObjectInfo {
                index,
                path_id: object.path_id(),
                type_tag: object.type_tag().to_string(),
                declared_name: object.declared_name().map(str::to_string),
                original_path: object.original_path().map(str::to_string),
            })
            .collect();

        Self { objects, infos }
    }

    /// Number of enumerated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object information in index order
    pub fn objects(&self) -> &[ObjectInfo] {
        &self.infos
    }

    /// Information for a single object
    pub fn info(&self, index: usize) -> Option<&ObjectInfo> {
        self.infos.get(index)
    }

    /// Read the payload of the object at `index`.
    ///
    /// Returns `None` for an out-of-range index.
    pub fn read(&self, index: usize) -> Option<std::result::Result<AssetPayload, ReadError>> {
        let object = self.objects.get(index)?;
        let info = self.infos.get(index)?;
        Some(
            object
                .read()
                .map(|payload| AssetPayload::new(info.clone(), payload)),
        )
    }
}
