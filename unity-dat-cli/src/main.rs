//! Unity DAT CLI
//!
//! Command-line interface for recovering XOR-obfuscated Unity bundles.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use unity_dat_bundle::UnityFsReader;
use unity_dat_core::DatOptions;
use unity_dat_crypt::{DatDecryptor, decrypted_path_for, find_key};
use unity_dat_export::{Exporter, SingleExport};

#[derive(Parser, Debug)]
#[command(name = "unity-dat")]
#[command(about = "Recover XOR-obfuscated Unity bundles")]
#[command(version)]
struct Cli {
    /// YAML options file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the XOR key of an obfuscated bundle
    FindKey {
        /// Obfuscated bundle file
        input: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Write the decrypted copy of an obfuscated bundle
    Decrypt {
        /// Obfuscated bundle file
        input: PathBuf,

        /// Output file (defaults to the suffixed sibling of the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Suffix of the decrypted sibling file
        #[arg(long)]
        suffix: Option<String>,
    },

    /// List the objects of a decrypted bundle
    List {
        /// Decrypted UnityFS bundle
        input: PathBuf,
    },

    /// Export the objects of a decrypted bundle
    Export {
        /// Decrypted UnityFS bundle
        input: PathBuf,

        /// Output directory
        out_dir: PathBuf,

        /// Export only the object at this listing index
        #[arg(short, long)]
        index: Option<usize>,
    },
}

#[derive(Args, Debug, Default)]
struct Overrides {
    /// Expected plaintext signature
    #[arg(short, long)]
    signature: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::FindKey { input, overrides } => {
            let options = resolve_options(cli.config.as_deref(), &overrides, None)?;
            find_key_command(&input, &options)
        }
        Commands::Decrypt {
            input,
            output,
            overrides,
            suffix,
        } => {
            let options = resolve_options(cli.config.as_deref(), &overrides, suffix)?;
            decrypt_command(&input, output, options)
        }
        Commands::List { input } => {
            let options = resolve_options(cli.config.as_deref(), &Overrides::default(), None)?;
            list_command(&input, options)
        }
        Commands::Export {
            input,
            out_dir,
            index,
        } => {
            let options = resolve_options(cli.config.as_deref(), &Overrides::default(), None)?;
            export_command(&input, &out_dir, index, options)
        }
    }
}

/// Options from the config file (or defaults) with command-line overrides
fn resolve_options(
    config: Option<&Path>,
    overrides: &Overrides,
    suffix: Option<String>,
) -> Result<DatOptions> {
    let mut options = match config {
        Some(path) => DatOptions::from_yaml_file(path)?,
        None => DatOptions::default(),
    };

    if let Some(signature) = &overrides.signature {
        options = options.with_signature(signature.clone());
    }
    if let Some(suffix) = suffix {
        options = options.with_decrypted_suffix(suffix);
    }

    options.validate()?;
    Ok(options)
}

fn find_key_command(input: &Path, options: &DatOptions) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;

    match find_key(&data, options.signature_bytes()) {
        Some(key) => {
            println!("{:#04x}", key);
            Ok(())
        }
        None => bail!("No XOR key turns {:?} into a {} bundle", input, options.signature),
    }
}

fn decrypt_command(input: &Path, output: Option<PathBuf>, options: DatOptions) -> Result<()> {
    let output = output.unwrap_or_else(|| decrypted_path_for(input, &options.decrypted_suffix));
    if output == input {
        bail!("Output {:?} would overwrite the input", output);
    }

    let outcome = DatDecryptor::new(options)
        .decrypt_file(input, &output)
        .with_context(|| format!("Failed to decrypt {:?}", input))?;

    println!("✓ Decrypted with key {:#04x}", outcome.key);
    println!("  Output: {}", outcome.output.display());
    println!("  Size: {} bytes", outcome.size);
    Ok(())
}

fn list_command(input: &Path, options: DatOptions) -> Result<()> {
    let reader = UnityFsReader::new();
    let assets = Exporter::with_options(&reader, options)
        .list_assets(input)
        .with_context(|| format!("Failed to load {:?}", input))?;

    for asset in &assets {
        println!("{:>5}  {:<16} {}", asset.index, asset.type_tag, asset.name);
    }
    println!("{} objects", assets.len());
    Ok(())
}

fn export_command(
    input: &Path,
    out_dir: &Path,
    index: Option<usize>,
    options: DatOptions,
) -> Result<()> {
    let reader = UnityFsReader::new();
    let exporter = Exporter::with_options(&reader, options);

    let Some(index) = index else {
        let report = exporter
            .export_all(input, out_dir)
            .with_context(|| format!("Failed to export {:?}", input))?;
        for (index, issue) in report.failures() {
            println!("  ✗ {}: {}", index, issue);
        }
        println!("✓ {}", report.summary());
        return Ok(());
    };

    match exporter
        .export_one(input, index, out_dir)
        .with_context(|| format!("Failed to export {:?}", input))?
    {
        SingleExport::Written(path) => {
            println!("✓ Exported {}", path.display());
            Ok(())
        }
        SingleExport::Skipped(issue) => bail!("Object {} not exported: {}", index, issue),
        SingleExport::OutOfRange { index, count } => {
            bail!("Index {} out of range, bundle has {} objects", index, count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decrypt() {
        let cli = Cli::try_parse_from([
            "unity-dat",
            "decrypt",
            "level0.dat",
            "-o",
            "plain.dat",
            "--suffix",
            "_plain",
        ])
        .unwrap();

        match cli.command {
            Commands::Decrypt {
                input,
                output,
                suffix,
                ..
            } => {
                assert_eq!(input, PathBuf::from("level0.dat"));
                assert_eq!(output, Some(PathBuf::from("plain.dat")));
                assert_eq!(suffix.as_deref(), Some("_plain"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_with_index() {
        let cli = Cli::try_parse_from(["unity-dat", "export", "level0_DEC.dat", "out", "-i", "3"])
            .unwrap();

        match cli.command {
            Commands::Export {
                input,
                out_dir,
                index,
            } => {
                assert_eq!(input, PathBuf::from("level0_DEC.dat"));
                assert_eq!(out_dir, PathBuf::from("out"));
                assert_eq!(index, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_requires_out_dir() {
        assert!(Cli::try_parse_from(["unity-dat", "export", "level0_DEC.dat"]).is_err());
        assert!(Cli::try_parse_from(["unity-dat", "list", "level0_DEC.dat"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["unity-dat", "find-key", "a.dat", "-v", "-c", "opts.yaml"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("opts.yaml")));
    }

    #[test]
    fn test_resolve_options_overrides() {
        let overrides = Overrides {
            signature: Some("UnityWeb".to_string()),
        };
        let options = resolve_options(None, &overrides, Some("_x".to_string())).unwrap();
        assert_eq!(options.signature, "UnityWeb");
        assert_eq!(options.decrypted_suffix, "_x");
    }

    #[test]
    fn test_resolve_options_rejects_empty_signature() {
        let overrides = Overrides {
            signature: Some(String::new()),
        };
        assert!(resolve_options(None, &overrides, None).is_err());
    }

    #[test]
    fn test_resolve_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.yaml");
        std::fs::write(&path, "decrypted_suffix: _clear\n").unwrap();

        let options = resolve_options(Some(&path), &Overrides::default(), None).unwrap();
        assert_eq!(options.decrypted_suffix, "_clear");
        assert_eq!(options.signature, "UnityFS");
    }
}
