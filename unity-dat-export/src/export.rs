//! Bulk and single-object export
//!
//! The exporter loads a bundle through the reader it was given, classifies
//! every object and writes one file per exportable object into a flat
//! output directory. Per-object problems never abort a bulk export; they
//! are collected in the [`ExportReport`].

use crate::classify::{AssetClassifier, Classification};
use crate::issue::ExportIssue;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use unity_dat_core::{
    AssetObject, BundleReader, DatError, DatOptions, Environment, ReadError, Result,
};

/// One row of an asset listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub index: usize,
    pub type_tag: String,
    pub name: String,
}

/// Outcome of a bulk export
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Objects enumerated in the bundle
    pub total: usize,
    /// Written files by object index
    pub written: Vec<(usize, PathBuf)>,
    /// Objects that produced no file, with the reason
    pub issues: Vec<(usize, ExportIssue)>,
}

impl ExportReport {
    /// Number of files written.
    ///
    /// Objects refused with [`ExportIssue::UnsafeName`] are not counted.
    pub fn count(&self) -> usize {
        self.written.len()
    }

    /// Issues that are failures rather than plain skips
    pub fn failures(&self) -> impl Iterator<Item = &(usize, ExportIssue)> {
        self.issues.iter().filter(|(_, issue)| issue.is_failure())
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        format!(
            "{} of {} objects exported, {} skipped, {} failed",
            self.count(),
            self.total,
            self.issues.len() - failed,
            failed
        )
    }
}

/// Outcome of a single-object export
#[derive(Debug)]
pub enum SingleExport {
    /// The index is outside the bundle; nothing was touched
    OutOfRange { index: usize, count: usize },
    /// The object was written to this path
    Written(PathBuf),
    /// The object produced no file
    Skipped(ExportIssue),
}

impl SingleExport {
    /// Whether a file was written
    pub fn exported(&self) -> bool {
        matches!(self, SingleExport::Written(_))
    }
}

/// Exports objects of bundles loaded through `R`
pub struct Exporter<'r, R> {
    reader: &'r R,
    classifier: AssetClassifier,
    options: DatOptions,
}

impl<'r, R: BundleReader> Exporter<'r, R> {
    /// Create an exporter with default options
    pub fn new(reader: &'r R) -> Self {
        Self::with_options(reader, DatOptions::default())
    }

    /// Create an exporter with options
    pub fn with_options(reader: &'r R, options: DatOptions) -> Self {
        Self {
            reader,
            classifier: AssetClassifier::new(),
            options,
        }
    }

    /// List all objects with their resolved names
    pub fn list_assets<P: AsRef<Path>>(&self, bundle_path: P) -> Result<Vec<AssetEntry>> {
        let env = Environment::load(self.reader, bundle_path)?;
        Ok(list_loaded(&env, &self.options))
    }

    /// Export every object of the bundle into `out_dir`.
    ///
    /// Names are used as-is, except that a name with a `..` component or
    /// an absolute root is refused as [`ExportIssue::UnsafeName`]. Such an
    /// object is reported as a failure and not counted.
    ///
    /// Fails only when the bundle cannot be loaded or `out_dir` cannot be
    /// created.
    #[instrument(skip_all, fields(bundle = %bundle_path.as_ref().display()))]
    pub fn export_all<P, Q>(&self, bundle_path: P, out_dir: Q) -> Result<ExportReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let env = Environment::load(self.reader, bundle_path)?;
        self.export_loaded(&env, out_dir.as_ref())
    }

    /// Export the object at `index` into `out_dir`.
    ///
    /// An out-of-range index leaves the filesystem untouched.
    #[instrument(skip_all, fields(bundle = %bundle_path.as_ref().display(), index = index))]
    pub fn export_one<P, Q>(&self, bundle_path: P, index: usize, out_dir: Q) -> Result<SingleExport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let env = Environment::load(self.reader, bundle_path)?;
        if index >= env.len() {
            debug!(count = env.len(), "index out of range");
            return Ok(SingleExport::OutOfRange {
                index,
                count: env.len(),
            });
        }

        let out_dir = out_dir.as_ref();
        create_output_dir(out_dir)?;

        Ok(match self.export_object(&env, index, out_dir) {
            Ok(path) => SingleExport::Written(path),
            Err(issue) => {
                warn!("object {} not exported: {}", index, issue);
                SingleExport::Skipped(issue)
            }
        })
    }

    /// Export every object of an already loaded bundle
    pub fn export_loaded<O: AssetObject>(
        &self,
        env: &Environment<O>,
        out_dir: &Path,
    ) -> Result<ExportReport> {
        create_output_dir(out_dir)?;

        let mut report = ExportReport {
            total: env.len(),
            ..Default::default()
        };

        for index in 0..env.len() {
            match self.export_object(env, index, out_dir) {
                Ok(path) => report.written.push((index, path)),
                Err(issue) => {
                    if issue.is_failure() {
                        warn!("object {} not exported: {}", index, issue);
                    } else {
                        debug!("object {} skipped: {}", index, issue);
                    }
                    report.issues.push((index, issue));
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Classify and write a single object
    fn export_object<O: AssetObject>(
        &self,
        env: &Environment<O>,
        index: usize,
        out_dir: &Path,
    ) -> std::result::Result<PathBuf, ExportIssue> {
        let Some(read) = env.read(index) else {
            return Err(ReadError::missing_resource(format!("object {}", index)).into());
        };
        let type_tag = env.info(index).map_or("", |info| info.type_tag.as_str());
        let classification = self
            .classifier
            .classify_read(type_tag, read.as_ref().map(|asset| &asset.payload));
        let format = match classification {
            Classification::Export(format) => format,
            Classification::Skip(issue) => return Err(issue),
        };
        let asset = read?;

        let name = asset
            .info
            .resolved_name(&self.options.fallback_name_prefix);
        let file_name = format!("{}.{}", name, format.extension());
        if !is_contained(&file_name) {
            return Err(ExportIssue::UnsafeName(file_name));
        }

        let contents = format.encode(&asset.payload)?;
        let path = out_dir.join(&file_name);
        std::fs::write(&path, &contents).map_err(|source| ExportIssue::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            "object {} ({}) -> {}",
            index,
            asset.type_tag(),
            path.display()
        );
        Ok(path)
    }
}

/// Listing of an already loaded bundle
pub fn list_loaded<O: AssetObject>(env: &Environment<O>, options: &DatOptions) -> Vec<AssetEntry> {
    env.objects()
        .iter()
        .map(|info| AssetEntry {
            index: info.index,
            type_tag: info.type_tag.clone(),
            name: info.resolved_name(&options.fallback_name_prefix),
        })
        .collect()
}

fn create_output_dir(out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| DatError::output_directory(out_dir, e))
}

/// Names are joined as-is, so nested paths stay nested, but they must not
/// climb out of the output directory.
fn is_contained(file_name: &str) -> bool {
    Path::new(file_name)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
