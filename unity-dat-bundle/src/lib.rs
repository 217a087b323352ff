//! Unity DAT Bundle
//!
//! A [`BundleReader`](unity_dat_core::BundleReader) for UnityFS asset
//! bundles. It decompresses the container (LZ4 and LZMA blocks), parses the
//! SerializedFiles inside it and reads objects through their TypeTrees.
//!
//! Payloads handed to the export pipeline:
//! - `Texture2D`: decoded pixels for uncompressed formats, read inline or
//!   from the `.resS` node; compressed formats are unsupported.
//! - `AudioClip`: the clip's bytes from its resource node, as stored.
//! - `TextAsset`: the `m_Script` bytes.
//! - anything else: the object's serialized bytes.
//!
//! # Example
//!
//! ```rust,no_run
//! use unity_dat_bundle::UnityFsReader;
//! use unity_dat_core::{AssetObject, BundleReader};
//!
//! let objects = UnityFsReader::new().load_path("sharedassets0_DEC.dat".as_ref())?;
//! for object in &objects {
//!     println!("{} {:?}", object.type_tag(), object.declared_name());
//! }
//! # Ok::<(), unity_dat_core::LoadError>(())
//! ```

pub mod bundle;
pub mod compression;
pub mod error;
pub mod loader;
pub mod object;
pub mod reader;
pub mod serialized;
pub mod texture;
pub mod typetree;

#[cfg(any(test, feature = "testing"))]
pub mod fixture;

pub use bundle::{BundleFile, BundleHeader, DirectoryNode};
pub use error::{BinaryError, Result};
pub use loader::UnityFsReader;
pub use object::BundleObject;
pub use serialized::SerializedFile;
pub use typetree::{TypeTree, Value};
