//! UnityFS implementation of the bundle reader contract

use crate::bundle::BundleFile;
use crate::error::Result;
use crate::object::{BundleObject, LoadedBundle};
use crate::reader::BinaryReader;
use crate::serialized::{ObjectEntry, SerializedFile};
use crate::typetree::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use unity_dat_core::{BundleReader, LoadError, class_ids, type_tag_or_class};

/// Reads UnityFS bundles.
///
/// Objects are enumerated SerializedFile by SerializedFile in directory
/// order, and in object-table order within each file. Object names come
/// from `m_Name`; objects listed in the bundle's `AssetBundle` container
/// also carry their container path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnityFsReader;

impl UnityFsReader {
    pub fn new() -> Self {
        Self
    }
}

impl BundleReader for UnityFsReader {
    type Object = BundleObject;

    #[instrument(skip_all, fields(bytes = data.len()))]
    fn load_bytes(&self, data: Vec<u8>) -> std::result::Result<Vec<BundleObject>, LoadError> {
        let bundle = BundleFile::parse(&data)?;

        let mut files = Vec::new();
        for (index, node) in bundle.nodes.iter().enumerate() {
            if !node.is_serialized_file() {
                continue;
            }
            let file = SerializedFile::parse(bundle.node_data(node))
                .map_err(|e| LoadError::parse(format!("{}: {}", node.path, e)))?;
            debug!(
                "{}: {} objects, Unity {}",
                node.path,
                file.objects.len(),
                file.unity_version
            );
            files.push((index, file));
        }

        let loaded = Arc::new(LoadedBundle { bundle, files });
        let containers = container_paths(&loaded);

        let mut objects = Vec::new();
        for (file_index, (_, file)) in loaded.files.iter().enumerate() {
            for entry in &file.objects {
                objects.push(BundleObject {
                    bundle: Arc::clone(&loaded),
                    file: file_index,
                    entry: *entry,
                    type_tag: type_tag_or_class(entry.class_id),
                    name: object_name(&loaded, file_index, entry),
                    container_path: containers.get(&entry.path_id).cloned(),
                });
            }
        }

        debug!(objects = objects.len(), "UnityFS bundle enumerated");
        Ok(objects)
    }
}

/// Classes whose serialized data starts with `m_Name`
fn starts_with_name(class_id: i32) -> bool {
    matches!(
        class_id,
        class_ids::MATERIAL
            | class_ids::TEXTURE_2D
            | class_ids::MESH
            | class_ids::SHADER
            | class_ids::TEXT_ASSET
            | class_ids::AUDIO_CLIP
            | class_ids::FONT
            | class_ids::ASSET_BUNDLE
            | class_ids::SPRITE
    )
}

fn object_name(bundle: &LoadedBundle, file_index: usize, entry: &ObjectEntry) -> Option<String> {
    let file = &bundle.files[file_index].1;
    let mut reader = BinaryReader::new(bundle.object_data(file_index, entry), file.byte_order());

    let name = match file.type_tree(entry) {
        Some(tree) => tree
            .read_field(&mut reader, "m_Name")
            .map(|value| value.and_then(|v| v.as_str().map(str::to_string))),
        None if starts_with_name(entry.class_id) => reader.read_aligned_string().map(Some),
        None => Ok(None),
    };

    name.unwrap_or_else(|e| {
        warn!("object {}: unreadable name: {}", entry.path_id, e);
        None
    })
}

/// Container paths by path id, from every `AssetBundle` object
fn container_paths(bundle: &LoadedBundle) -> HashMap<i64, String> {
    let mut paths = HashMap::new();
    for (file_index, (_, file)) in bundle.files.iter().enumerate() {
        for entry in file
            .objects
            .iter()
            .filter(|entry| entry.class_id == class_ids::ASSET_BUNDLE)
        {
            let Some(tree) = file.type_tree(entry) else {
                continue;
            };
            let mut reader =
                BinaryReader::new(bundle.object_data(file_index, entry), file.byte_order());
            match read_container(tree.read_object(&mut reader)) {
                Ok(entries) => {
                    for (path_id, path) in entries {
                        paths.entry(path_id).or_insert(path);
                    }
                }
                Err(e) => warn!("AssetBundle {}: unreadable container: {}", entry.path_id, e),
            }
        }
    }
    paths
}

fn read_container(value: Result<Value>) -> Result<Vec<(i64, String)>> {
    let value = value?;
    let items = value
        .get("m_Container")
        .and_then(Value::as_array)
        .unwrap_or_default();

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Pair(path, info) => {
                let path_id = info.get("asset")?.get("m_PathID")?.as_i64()?;
                Some((path_id, path.as_str()?.to_string()))
            }
            _ => None,
        })
        .collect())
}
