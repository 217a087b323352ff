//! Unity DAT
//!
//! Recover single-byte XOR obfuscated Unity bundles (`.dat` files) and
//! export their assets.
//!
//! The functions at the top of this crate never panic and never return
//! errors: failures are logged through `tracing` and reported as `false` or
//! `None`. The sub-crates expose the typed APIs they are built on.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_dat::{UnityFsReader, decrypt_dat, extract_all};
//!
//! if decrypt_dat("level0.dat", "level0_DEC.dat") {
//!     let reader = UnityFsReader::new();
//!     let count = extract_all(&reader, "level0_DEC.dat", "out");
//!     println!("exported {:?} objects", count);
//! }
//! ```

use std::path::Path;
use tracing::error;

// Re-export from sub-crates
pub use unity_dat_bundle::{BundleObject, UnityFsReader};
pub use unity_dat_core::{
    AssetObject, AssetPayload, BundleReader, DatError, DatOptions, Environment, ErrorSeverity,
    LoadError, ObjectInfo, Payload, ReadError, Result, constants::*,
};
#[cfg(feature = "testing")]
pub use unity_dat_core::{MemoryObject, MemoryReader};
pub use unity_dat_crypt::{DatDecryptor, DecryptOutcome, decrypted_path_for, find_key};
pub use unity_dat_export::{
    AssetClassifier, AssetEntry, DatSession, ExportFormat, ExportIssue, ExportReport, Exporter,
    SessionState, SingleExport,
};

/// Find the XOR key that turns the start of `data` into `signature`.
///
/// Returns the lowest matching key, or `None` when `data` is shorter than
/// the signature or no key matches. An empty signature yields key 0.
pub fn find_xor_key(data: &[u8], signature: &[u8]) -> Option<u8> {
    find_key(data, signature)
}

/// Decrypt `input` into `output` using the UnityFS signature.
///
/// Returns `false` (and writes nothing) when no key is found or the input
/// cannot be read.
pub fn decrypt_dat<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> bool {
    match DatDecryptor::default().decrypt_file(input.as_ref(), output.as_ref()) {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to decrypt {}: {}", input.as_ref().display(), e);
            false
        }
    }
}

/// List the objects of a decrypted bundle.
///
/// Returns `None` when the bundle cannot be loaded.
pub fn list_assets<R, P>(reader: &R, bundle_path: P) -> Option<Vec<AssetEntry>>
where
    R: BundleReader,
    P: AsRef<Path>,
{
    Exporter::new(reader)
        .list_assets(bundle_path.as_ref())
        .map_err(|e| error!("Failed to list {}: {}", bundle_path.as_ref().display(), e))
        .ok()
}

/// Export every object of a decrypted bundle into `out_dir`.
///
/// Returns the number of files written, or `None` when the bundle cannot
/// be loaded or `out_dir` cannot be created. Objects whose name would leave
/// `out_dir` are refused and not counted.
pub fn extract_all<R, P, Q>(reader: &R, bundle_path: P, out_dir: Q) -> Option<usize>
where
    R: BundleReader,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    Exporter::new(reader)
        .export_all(bundle_path.as_ref(), out_dir.as_ref())
        .map(|report| report.count())
        .map_err(|e| error!("Failed to export {}: {}", bundle_path.as_ref().display(), e))
        .ok()
}

/// Export the object at `index` into `out_dir`.
///
/// Returns `true` only when a file was written. Out-of-range indexes
/// touch nothing on disk.
pub fn extract_asset<R, P, Q>(reader: &R, bundle_path: P, index: usize, out_dir: Q) -> bool
where
    R: BundleReader,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    match Exporter::new(reader).export_one(bundle_path.as_ref(), index, out_dir.as_ref()) {
        Ok(SingleExport::OutOfRange { index, count }) => {
            error!("Index {} out of range, bundle has {} objects", index, count);
            false
        }
        Ok(outcome) => outcome.exported(),
        Err(e) => {
            error!("Failed to export {}: {}", bundle_path.as_ref().display(), e);
            false
        }
    }
}
