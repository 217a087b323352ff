//! Pipeline options
//!
//! Options are plain serde structs so they can be kept next to a modding
//! project in a small YAML file.

use crate::constants::{DECRYPTED_SUFFIX, FALLBACK_NAME_PREFIX, UNITY_FS_SIGNATURE};
use crate::error::{DatError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for decrypting and exporting bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatOptions {
    /// Expected plaintext prefix of a decrypted bundle
    pub signature: String,
    /// Suffix inserted before the extension of the decrypted file
    pub decrypted_suffix: String,
    /// Prefix of names synthesized from a path id
    pub fallback_name_prefix: String,
}

impl Default for DatOptions {
    fn default() -> Self {
        Self::unity_fs()
    }
}

impl DatOptions {
    /// Options for UnityFS bundles
    pub fn unity_fs() -> Self {
        Self {
            signature: String::from_utf8_lossy(UNITY_FS_SIGNATURE).into_owned(),
            decrypted_suffix: DECRYPTED_SUFFIX.to_string(),
            fallback_name_prefix: FALLBACK_NAME_PREFIX.to_string(),
        }
    }

    /// Replace the expected signature
    pub fn with_signature<S: Into<String>>(mut self, signature: S) -> Self {
        self.signature = signature.into();
        self
    }

    /// Replace the decrypted-file suffix
    pub fn with_decrypted_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.decrypted_suffix = suffix.into();
        self
    }

    /// Signature as bytes
    pub fn signature_bytes(&self) -> &[u8] {
        self.signature.as_bytes()
    }

    /// Check the options can drive a decrypt request
    pub fn validate(&self) -> Result<()> {
        if self.signature.is_empty() {
            return Err(DatError::config("signature must not be empty"));
        }
        if self.decrypted_suffix.is_empty() {
            return Err(DatError::config(
                "decrypted suffix must not be empty, the input would be overwritten",
            ));
        }
        Ok(())
    }

    /// Parse options from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(yaml)
            .map_err(|e| DatError::config(format!("Invalid options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DatError::config(format!(
                "Failed to read options {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Serialize options to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| DatError::config(format!("Failed to serialize options: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DatOptions::default();
        assert_eq!(options.signature_bytes(), b"UnityFS");
        assert_eq!(options.decrypted_suffix, "_DEC");
        assert_eq!(options.fallback_name_prefix, "path_id_");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let options = DatOptions::from_yaml_str("decrypted_suffix: _plain\n").unwrap();
        assert_eq!(options.decrypted_suffix, "_plain");
        assert_eq!(options.signature, "UnityFS");
    }

    #[test]
    fn test_empty_signature_rejected() {
        let err = DatOptions::from_yaml_str("signature: ''\n").unwrap_err();
        assert!(matches!(err, DatError::Config(_)));
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unity-dat.yaml");
        let options = DatOptions::unity_fs().with_signature("UnityWeb");
        std::fs::write(&path, options.to_yaml_string().unwrap()).unwrap();

        assert_eq!(DatOptions::from_yaml_file(&path).unwrap(), options);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DatOptions::from_yaml_file("no/such/options.yaml").unwrap_err();
        assert!(matches!(err, DatError::Config(_)));
    }
}
