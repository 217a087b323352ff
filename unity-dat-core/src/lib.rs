//! Unity DAT Core
//!
//! Core data structures and types shared by the unity-dat crates.
//! This crate defines the shape of asset objects handed over by a bundle
//! reader, the reader contract itself, and the error and option types
//! used by the decrypt and export pipelines.
//!
//! Parsing the container format is not done here: a [`BundleReader`]
//! implementation is passed in by the caller (`unity-dat-bundle` provides
//! the UnityFS one). The `testing` feature adds [`MemoryReader`], an
//! in-memory fixture reader.

pub mod asset;
pub mod constants;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod options;
pub mod reader;

// Re-export main types
pub use asset::{AssetPayload, ObjectInfo, Payload};
pub use constants::*;
pub use error::{DatError, ErrorSeverity, LoadError, ReadError, Result};
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryObject, MemoryReader};
pub use options::DatOptions;
pub use reader::{AssetObject, BundleReader, Environment};
