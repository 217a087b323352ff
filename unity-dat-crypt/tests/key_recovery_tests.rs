//! Key Recovery Tests
//!
//! Property tests for single-byte XOR key recovery and the decrypt
//! transform.

use proptest::prelude::*;
use unity_dat_crypt::{decrypt, encrypt, find_key, key_matches};

proptest! {
    #[test]
    fn recovers_any_key(
        signature in prop::collection::vec(any::<u8>(), 1..16),
        key in any::<u8>(),
        tail in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut data = encrypt(&signature, key);
        data.extend_from_slice(&tail);

        prop_assert_eq!(find_key(&data, &signature), Some(key));
        prop_assert!(key_matches(&data, &signature, key));
    }

    #[test]
    fn short_data_has_no_key(
        signature in prop::collection::vec(any::<u8>(), 2..16),
        cut in 1usize..16,
    ) {
        let cut = cut.min(signature.len() - 1);
        let data = &signature[..signature.len() - cut];
        prop_assert_eq!(find_key(data, &signature), None);
    }

    #[test]
    fn decrypt_inverts_encrypt(
        plain in prop::collection::vec(any::<u8>(), 0..256),
        key in any::<u8>(),
    ) {
        let cipher = encrypt(&plain, key);
        prop_assert_eq!(cipher.len(), plain.len());
        prop_assert_eq!(decrypt(&cipher, key), plain);
    }
}

#[test]
fn test_unity_fs_key_0x37() {
    let mut data: Vec<u8> = b"UnityFS".iter().map(|b| b ^ 0x37).collect();
    data.extend_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2, 1]);

    assert_eq!(data.len(), 16);
    assert_eq!(find_key(&data, b"UnityFS"), Some(0x37));
}

#[test]
fn test_lowest_key_wins() {
    // With an empty signature every key matches trivially
    assert_eq!(find_key(&[0xaa, 0xbb], &[]), Some(0x00));

    // A one-byte signature is satisfied by exactly one key
    assert_eq!(find_key(&[0x00], &[0x80]), Some(0x80));
}

#[test]
fn test_data_shorter_than_signature() {
    let data = encrypt(b"Unity", 0x37);
    assert_eq!(find_key(&data, b"UnityFS"), None);
}
