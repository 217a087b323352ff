//! Unity DAT Export
//!
//! Turns the objects of a decrypted bundle into files on disk.
//!
//! Textures become PNG files, audio clips are written verbatim with a
//! `.wav` extension and every other non-empty payload is written verbatim
//! with a `.bytes` extension. The bundle itself is loaded through a
//! caller-supplied [`unity_dat_core::BundleReader`].
//!
//! # Example
//!
//! ```rust,no_run
//! use unity_dat_bundle::UnityFsReader;
//! use unity_dat_export::DatSession;
//!
//! let reader = UnityFsReader::new();
//! let mut session = DatSession::new(&reader, "sharedassets0.dat");
//! for asset in session.open()? {
//!     println!("{} {} {}", asset.index, asset.type_tag, asset.name);
//! }
//! let report = session.export_all("out")?;
//! println!("{}", report.summary());
//! # Ok::<(), unity_dat_core::DatError>(())
//! ```

pub mod classify;
pub mod export;
pub mod issue;
pub mod session;

pub use classify::{AssetClassifier, Classification, ExportFormat};
pub use export::{AssetEntry, ExportReport, Exporter, SingleExport, list_loaded};
pub use issue::ExportIssue;
pub use session::{DatSession, SessionState};
