//! Decrypt-and-browse sessions
//!
//! A session follows one `.dat` file through
//! `Encrypted -> Decrypted -> Browsable`, after which any number of bulk
//! or single exports may run. A failed key recovery is terminal.

use crate::export::{AssetEntry, ExportReport, Exporter, SingleExport, list_loaded};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use unity_dat_core::{BundleReader, DatError, DatOptions, Environment, Result};
use unity_dat_crypt::DatDecryptor;

/// Session states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing done yet
    Encrypted,
    /// Plaintext written next to the source
    Decrypted { key: u8, path: PathBuf },
    /// Plaintext loaded and listed
    Browsable { key: u8, path: PathBuf },
    /// Key recovery failed; the session cannot continue
    Failed(String),
}

/// One obfuscated bundle being decrypted and browsed
pub struct DatSession<'r, R> {
    reader: &'r R,
    options: DatOptions,
    source: PathBuf,
    state: SessionState,
    assets: Vec<AssetEntry>,
}

impl<'r, R: BundleReader> DatSession<'r, R> {
    /// Start a session for `source` with default options
    pub fn new<P: Into<PathBuf>>(reader: &'r R, source: P) -> Self {
        Self::with_options(reader, source, DatOptions::default())
    }

    /// Start a session for `source`
    pub fn with_options<P: Into<PathBuf>>(reader: &'r R, source: P, options: DatOptions) -> Self {
        Self {
            reader,
            options,
            source: source.into(),
            state: SessionState::Encrypted,
            assets: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Path of the decrypted bundle once available
    pub fn decrypted_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Decrypted { path, .. } | SessionState::Browsable { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Listing taken when the session became browsable
    pub fn assets(&self) -> &[AssetEntry] {
        &self.assets
    }

    /// Recover the key and write the decrypted sibling file.
    ///
    /// A missing key moves the session to [`SessionState::Failed`]. I/O
    /// errors leave it encrypted so the caller may try again.
    #[instrument(skip_all, fields(source = %self.source.display()))]
    pub fn decrypt(&mut self) -> Result<()> {
        match &self.state {
            SessionState::Encrypted => {}
            SessionState::Failed(reason) => return Err(DatError::session(reason.clone())),
            _ => return Ok(()),
        }

        let decryptor = DatDecryptor::new(self.options.clone());
        match decryptor.decrypt_to_sibling(&self.source) {
            Ok(outcome) => {
                self.state = SessionState::Decrypted {
                    key: outcome.key,
                    path: outcome.output,
                };
                Ok(())
            }
            Err(e @ DatError::KeyNotFound { .. }) => {
                self.state = SessionState::Failed(e.to_string());
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Decrypt if needed, load the plaintext and list its objects
    pub fn open(&mut self) -> Result<&[AssetEntry]> {
        self.decrypt()?;

        let (key, path) = match &self.state {
            SessionState::Decrypted { key, path } => (*key, path.clone()),
            SessionState::Browsable { .. } => return Ok(&self.assets),
            state => return Err(DatError::session(format!("cannot open in state {:?}", state))),
        };

        let env = Environment::load(self.reader, &path)?;
        self.assets = list_loaded(&env, &self.options);
        info!(assets = self.assets.len(), "session browsable");
        self.state = SessionState::Browsable { key, path };
        Ok(&self.assets)
    }

    /// Export every object of the decrypted bundle
    pub fn export_all<P: AsRef<Path>>(&self, out_dir: P) -> Result<ExportReport> {
        let path = self.browsable_path()?;
        self.exporter().export_all(path, out_dir)
    }

    /// Export a single object of the decrypted bundle
    pub fn export_one<P: AsRef<Path>>(&self, index: usize, out_dir: P) -> Result<SingleExport> {
        let path = self.browsable_path()?;
        self.exporter().export_one(path, index, out_dir)
    }

    fn exporter(&self) -> Exporter<'r, R> {
        Exporter::with_options(self.reader, self.options.clone())
    }

    fn browsable_path(&self) -> Result<&Path> {
        match &self.state {
            SessionState::Browsable { path, .. } => Ok(path),
            state => Err(DatError::session(format!(
                "session is not browsable (state {:?})",
                state
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unity_dat_core::{MemoryObject, MemoryReader};
    use unity_dat_crypt::encrypt;

    const PLAIN: &[u8] = b"UnityFS\0\0\0\0\x08session";

    fn setup(dir: &Path) -> (MemoryReader, PathBuf) {
        let reader = MemoryReader::new().with_bundle(
            PLAIN.to_vec(),
            vec![
                MemoryObject::raw(1, "TextAsset", b"line one".to_vec()).named("lines"),
                MemoryObject::raw(2, "AudioClip", b"RIFF".to_vec()).named("click"),
            ],
        );
        let source = dir.join("resources.dat");
        std::fs::write(&source, encrypt(PLAIN, 0x2a)).unwrap();
        (reader, source)
    }

    #[test]
    fn test_full_session() {
        let dir = tempfile::tempdir().unwrap();
        let (reader, source) = setup(dir.path());
        let mut session = DatSession::new(&reader, &source);
        assert_eq!(session.state(), &SessionState::Encrypted);

        let names: Vec<_> = session.open().unwrap().iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, vec!["lines", "click"]);
        assert_eq!(
            session.state(),
            &SessionState::Browsable {
                key: 0x2a,
                path: dir.path().join("resources_DEC.dat"),
            }
        );

        let out = dir.path().join("export");
        let report = session.export_all(&out).unwrap();
        assert_eq!(report.count(), 2);

        let single = session.export_one(1, dir.path().join("single")).unwrap();
        assert!(single.exported());
        assert!(dir.path().join("single/click.wav").is_file());
    }

    #[test]
    fn test_export_before_open_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (reader, source) = setup(dir.path());
        let session = DatSession::new(&reader, &source);

        let err = session.export_all(dir.path().join("out")).unwrap_err();
        assert!(matches!(err, DatError::Session(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_key_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let reader = MemoryReader::new();
        let source = dir.path().join("garbage.dat");
        std::fs::write(&source, b"\x00\x00\x00").unwrap();
        let mut session = DatSession::new(&reader, &source);

        assert!(matches!(session.open(), Err(DatError::KeyNotFound { .. })));
        assert!(matches!(session.state(), SessionState::Failed(_)));
        assert!(matches!(session.decrypt(), Err(DatError::Session(_))));
        assert!(session.decrypted_path().is_none());
    }
}
