//! In-memory bundle reader for tests
//!
//! [`MemoryReader`] maps exact plaintext bundle bytes to a prepared list of
//! objects. It parses nothing: it is a fixture for exercising the export
//! pipeline with hand-made objects and read failures, and is only compiled
//! for tests or with the `testing` feature. Real bundles are read by
//! `unity_dat_bundle::UnityFsReader`.

use crate::asset::Payload;
use crate::constants::{UNITY_FS_SIGNATURE, type_tag_or_class};
use crate::error::{LoadError, ReadError};
use crate::reader::{AssetObject, BundleReader};
use image::RgbaImage;

/// A prepared asset object
#[derive(Debug, Clone)]
pub struct MemoryObject {
    path_id: i64,
    type_tag: String,
    declared_name: Option<String>,
    original_path: Option<String>,
    payload: Result<Payload, ReadError>,
}

impl MemoryObject {
    /// Create an object with an arbitrary read result
    pub fn new<S: Into<String>>(
        path_id: i64,
        type_tag: S,
        payload: Result<Payload, ReadError>,
    ) -> Self {
        Self {
            path_id,
            type_tag: type_tag.into(),
            declared_name: None,
            original_path: None,
            payload,
        }
    }

    /// Object with a raw byte payload
    pub fn raw<S: Into<String>>(path_id: i64, type_tag: S, bytes: Vec<u8>) -> Self {
        Self::new(path_id, type_tag, Ok(Payload::RawBytes(bytes)))
    }

    /// Object with an image payload
    pub fn image<S: Into<String>>(path_id: i64, type_tag: S, image: RgbaImage) -> Self {
        Self::new(path_id, type_tag, Ok(Payload::Image(image)))
    }

    /// Object whose read fails
    pub fn failing<S: Into<String>>(path_id: i64, type_tag: S, error: ReadError) -> Self {
        Self::new(path_id, type_tag, Err(error))
    }

    /// Object typed by a raw Unity class id
    pub fn from_class_id(path_id: i64, class_id: i32, payload: Result<Payload, ReadError>) -> Self {
        Self::new(path_id, type_tag_or_class(class_id), payload)
    }

    /// Set the declared name
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.declared_name = Some(name.into());
        self
    }

    /// Set the original container path
    pub fn with_original_path<S: Into<String>>(mut self, path: S) -> Self {
        self.original_path = Some(path.into());
        self
    }
}

impl AssetObject for MemoryObject {
    fn path_id(&self) -> i64 {
        self.path_id
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn declared_name(&self) -> Option<&str> {
        self.declared_name.as_deref()
    }

    fn original_path(&self) -> Option<&str> {
        self.original_path.as_deref()
    }

    fn read(&self) -> Result<Payload, ReadError> {
        self.payload.clone()
    }
}

/// Reader over registered plaintext bundles
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    bundles: Vec<(Vec<u8>, Vec<MemoryObject>)>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the objects contained in `bundle`
    pub fn with_bundle(mut self, bundle: Vec<u8>, objects: Vec<MemoryObject>) -> Self {
        self.register(bundle, objects);
        self
    }

    /// Register the objects contained in `bundle`, replacing an earlier
    /// registration of the same bytes
    pub fn register(&mut self, bundle: Vec<u8>, objects: Vec<MemoryObject>) {
        match self.bundles.iter_mut().find(|(known, _)| *known == bundle) {
            Some(entry) => entry.1 = objects,
            None => self.bundles.push((bundle, objects)),
        }
    }

    /// Number of registered bundles
    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }
}

impl BundleReader for MemoryReader {
    type Object = MemoryObject;

    fn load_bytes(&self, data: Vec<u8>) -> Result<Vec<MemoryObject>, LoadError> {
        if let Some((_, objects)) = self.bundles.iter().find(|(known, _)| *known == data) {
            return Ok(objects.clone());
        }

        if !data.starts_with(UNITY_FS_SIGNATURE) {
            let actual = &data[..data.len().min(UNITY_FS_SIGNATURE.len())];
            return Err(LoadError::invalid_signature(
                String::from_utf8_lossy(UNITY_FS_SIGNATURE).into_owned(),
                String::from_utf8_lossy(actual).into_owned(),
            ));
        }

        Err(LoadError::UnknownBundle { size: data.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_bundle_loads_in_order() {
        let bundle = b"UnityFS\x00\x01".to_vec();
        let reader = MemoryReader::new().with_bundle(
            bundle.clone(),
            vec![
                MemoryObject::raw(1, "TextAsset", vec![1]),
                MemoryObject::image(2, "Texture2D", RgbaImage::new(2, 2)),
            ],
        );

        let first = reader.load_bytes(bundle.clone()).unwrap();
        let second = reader.load_bytes(bundle).unwrap();
        let tags: Vec<_> = first.iter().map(|o| o.type_tag().to_string()).collect();
        assert_eq!(tags, vec!["TextAsset", "Texture2D"]);
        assert_eq!(
            first.iter().map(|o| o.path_id()).collect::<Vec<_>>(),
            second.iter().map(|o| o.path_id()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_wrong_signature_is_rejected() {
        let reader = MemoryReader::new();
        let err = reader.load_bytes(b"\x62\x59\x5e".to_vec()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidSignature { .. }));
    }

    #[test]
    fn test_unregistered_bundle() {
        let reader = MemoryReader::new();
        let err = reader.load_bytes(b"UnityFS-other".to_vec()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownBundle { size: 13 }));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut reader = MemoryReader::new();
        reader.register(b"UnityFS".to_vec(), vec![]);
        reader.register(
            b"UnityFS".to_vec(),
            vec![MemoryObject::from_class_id(5, 83, Ok(Payload::RawBytes(vec![1])))],
        );
        assert_eq!(reader.bundle_count(), 1);

        let objects = reader.load_bytes(b"UnityFS".to_vec()).unwrap();
        assert_eq!(objects[0].type_tag(), "AudioClip");
    }
}
