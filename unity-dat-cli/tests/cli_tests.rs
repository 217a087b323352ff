//! Runs the `unity-dat` binary against temporary files

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use unity_dat_bundle::fixture::{
    BundleBuilder, ObjectWriter, SerializedFileBuilder, TypeTreeBuilder,
};
use unity_dat_core::class_ids;
use unity_dat_crypt::encrypt;

const PLAIN: &[u8] = b"UnityFS\0\0\0\0\x07\x005.x.x\0cli";

fn unity_dat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_unity-dat"))
        .args(args)
        .output()
        .unwrap()
}

fn write_encrypted(dir: &Path, name: &str, key: u8) -> String {
    let path = dir.join(name);
    std::fs::write(&path, encrypt(PLAIN, key)).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_find_key_prints_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_encrypted(dir.path(), "level0.dat", 0x37);

    let output = unity_dat(&["find-key", &input]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0x37");
}

#[test]
fn test_find_key_fails_on_short_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tiny.dat");
    std::fs::write(&input, b"abc").unwrap();

    let output = unity_dat(&["find-key", input.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_decrypt_writes_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_encrypted(dir.path(), "resources.dat", 0xa5);

    let output = unity_dat(&["decrypt", &input]);

    assert!(output.status.success());
    let decrypted = std::fs::read(dir.path().join("resources_DEC.dat")).unwrap();
    assert_eq!(decrypted, PLAIN);
}

#[test]
fn test_decrypt_with_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_encrypted(dir.path(), "resources.dat", 0x00);
    let target = dir.path().join("clear.bin");

    let output = unity_dat(&["decrypt", &input, "--output", target.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(std::fs::read(&target).unwrap(), PLAIN);
    assert!(!dir.path().join("resources_DEC.dat").exists());
}

#[test]
fn test_decrypt_without_key_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("junk.dat");
    std::fs::write(&input, b"definitely not a bundle").unwrap();

    let output = unity_dat(&["decrypt", input.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(!dir.path().join("junk_DEC.dat").exists());
}

/// Encrypted UnityFS bundle with a text asset, a GameObject and a texture
/// in a format that cannot be decoded
fn write_encrypted_bundle(dir: &Path, key: u8) -> PathBuf {
    let file = SerializedFileBuilder::new()
        .object(
            5,
            class_ids::TEXT_ASSET,
            TypeTreeBuilder::text_asset(),
            ObjectWriter::text_asset("readme", b"hi"),
        )
        .object(
            6,
            class_ids::GAME_OBJECT,
            TypeTreeBuilder::empty("GameObject"),
            vec![7, 7],
        )
        .object(
            7,
            class_ids::TEXTURE_2D,
            TypeTreeBuilder::texture_2d(),
            ObjectWriter::texture_2d("atlas", 4, 4, 12, &[0u8; 16]),
        );
    let bundle = BundleBuilder::new().serialized_file("CAB-cli", &file).build();

    let path = dir.join("assets.dat");
    std::fs::write(&path, encrypt(&bundle, key)).unwrap();
    path
}

/// Decrypt through the binary and return the decrypted sibling
fn decrypt_bundle(dir: &Path) -> String {
    let input = write_encrypted_bundle(dir, 0x37);
    let output = unity_dat(&["decrypt", input.to_str().unwrap()]);
    assert!(output.status.success());
    dir.join("assets_DEC.dat").to_str().unwrap().to_string()
}

#[test]
fn test_list_prints_objects() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = decrypt_bundle(dir.path());

    let output = unity_dat(&["list", &bundle]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<Vec<&str>> = stdout.lines().map(|l| l.split_whitespace().collect()).collect();
    assert_eq!(
        rows,
        vec![
            vec!["0", "TextAsset", "readme"],
            vec!["1", "GameObject", "path_id_6"],
            vec!["2", "Texture2D", "atlas"],
            vec!["3", "objects"],
        ]
    );
}

#[test]
fn test_list_fails_on_encrypted_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_encrypted_bundle(dir.path(), 0x37);

    let output = unity_dat(&["list", input.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_export_all() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = decrypt_bundle(dir.path());
    let out = dir.path().join("out");

    let output = unity_dat(&["export", &bundle, out.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ 2 of 3 objects exported, 0 skipped, 1 failed"));
    assert!(stdout.contains("✗ 2:"));
    assert_eq!(std::fs::read(out.join("readme.bytes")).unwrap(), b"hi");
    assert_eq!(std::fs::read(out.join("path_id_6.bytes")).unwrap(), [7, 7]);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
}

#[test]
fn test_export_by_index() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = decrypt_bundle(dir.path());
    let out = dir.path().join("one");

    let output = unity_dat(&["export", &bundle, out.to_str().unwrap(), "--index", "1"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("path_id_6.bytes"));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);

    // Undecodable texture
    let failed = unity_dat(&["export", &bundle, out.to_str().unwrap(), "--index", "2"]);
    assert!(!failed.status.success());
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);

    let untouched = dir.path().join("untouched");
    let out_of_range = unity_dat(&["export", &bundle, untouched.to_str().unwrap(), "-i", "3"]);
    assert!(!out_of_range.status.success());
    assert!(!untouched.exists());
}
