//! Decrypt-and-persist for obfuscated bundle files

use crate::key::find_key;
use crate::xor::decrypt_in_place;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use unity_dat_core::{DatError, DatOptions, Result};

/// Result of a successful decrypt request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptOutcome {
    /// Recovered XOR key
    pub key: u8,
    /// Where the plaintext was written
    pub output: PathBuf,
    /// Number of bytes written
    pub size: usize,
}

/// Sibling path for the decrypted copy of `input`.
///
/// `dir/name.ext` becomes `dir/name<suffix>.ext`; a file without an
/// extension just gets the suffix appended.
pub fn decrypted_path_for<P: AsRef<Path>>(input: P, suffix: &str) -> PathBuf {
    let input = input.as_ref();
    let mut file_name = OsString::from(input.file_stem().unwrap_or_default());
    file_name.push(suffix);
    if let Some(ext) = input.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    input.with_file_name(file_name)
}

/// Recovers the key of obfuscated bundles and writes their plaintext
#[derive(Debug, Clone, Default)]
pub struct DatDecryptor {
    options: DatOptions,
}

impl DatDecryptor {
    /// Create a decryptor with the given options
    pub fn new(options: DatOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &DatOptions {
        &self.options
    }

    /// Recover the key of `data` and decrypt it in place
    pub fn decrypt_bytes(&self, mut data: Vec<u8>) -> Result<(u8, Vec<u8>)> {
        let signature = self.options.signature_bytes();
        let key =
            find_key(&data, signature).ok_or_else(|| DatError::key_not_found(signature.len()))?;
        debug!(key = %format!("{:#04x}", key), size = data.len(), "key recovered");

        decrypt_in_place(&mut data, key);
        Ok((key, data))
    }

    /// Decrypt `input` and write the plaintext to `output`.
    ///
    /// Nothing is written when no key is found.
    #[instrument(skip_all, fields(input = %input.as_ref().display()))]
    pub fn decrypt_file<P, Q>(&self, input: P, output: Q) -> Result<DecryptOutcome>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let raw = std::fs::read(input.as_ref())?;
        let (key, plain) = match self.decrypt_bytes(raw) {
            Ok(decrypted) => decrypted,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        let output = output.as_ref().to_path_buf();
        std::fs::write(&output, &plain)?;
        info!(
            key = %format!("{:#04x}", key),
            output = %output.display(),
            size = plain.len(),
            "bundle decrypted"
        );

        Ok(DecryptOutcome {
            key,
            output,
            size: plain.len(),
        })
    }

    /// Decrypt `input` into its suffixed sibling file
    pub fn decrypt_to_sibling<P: AsRef<Path>>(&self, input: P) -> Result<DecryptOutcome> {
        let output = decrypted_path_for(input.as_ref(), &self.options.decrypted_suffix);
        self.decrypt_file(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xor::encrypt;

    #[test]
    fn test_decrypted_path_for() {
        assert_eq!(
            decrypted_path_for("data/level1.dat", "_DEC"),
            PathBuf::from("data/level1_DEC.dat")
        );
        assert_eq!(
            decrypted_path_for("data/archive.tar.gz", "_DEC"),
            PathBuf::from("data/archive.tar_DEC.gz")
        );
        assert_eq!(decrypted_path_for("bundle", "_DEC"), PathBuf::from("bundle_DEC"));
        assert_eq!(decrypted_path_for(".dat", "_DEC"), PathBuf::from(".dat_DEC"));
    }

    #[test]
    fn test_decrypt_bytes_key_not_found() {
        let decryptor = DatDecryptor::default();
        let err = decryptor.decrypt_bytes(b"Uni".to_vec()).unwrap_err();
        assert!(matches!(err, DatError::KeyNotFound { signature_len: 7 }));
    }

    #[test]
    fn test_decrypt_file_writes_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sharedassets0.dat");
        let plain = b"UnityFS\0\0\0\0\x08payload".to_vec();
        std::fs::write(&input, encrypt(&plain, 0x5c)).unwrap();

        let outcome = DatDecryptor::default().decrypt_to_sibling(&input).unwrap();

        assert_eq!(outcome.key, 0x5c);
        assert_eq!(outcome.output, dir.path().join("sharedassets0_DEC.dat"));
        assert_eq!(outcome.size, plain.len());
        assert_eq!(std::fs::read(&outcome.output).unwrap(), plain);
    }

    #[test]
    fn test_no_output_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.dat");
        std::fs::write(&input, b"not a bundle at all").unwrap();

        let result = DatDecryptor::default().decrypt_to_sibling(&input);

        assert!(matches!(result, Err(DatError::KeyNotFound { .. })));
        assert!(!dir.path().join("broken_DEC.dat").exists());
    }

    #[test]
    fn test_custom_signature() {
        let options = DatOptions::unity_fs().with_signature("UnityWeb");
        let data = encrypt(b"UnityWeb\0rest", 0x01);
        let (key, plain) = DatDecryptor::new(options).decrypt_bytes(data).unwrap();
        assert_eq!(key, 0x01);
        assert_eq!(&plain[..8], b"UnityWeb");
    }
}
