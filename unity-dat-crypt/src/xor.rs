//! Byte-wise XOR transform

/// XOR every byte of `data` with `key` into a new buffer of the same length
pub fn decrypt(data: &[u8], key: u8) -> Vec<u8> {
    data.iter().map(|&byte| byte ^ key).collect()
}

/// XOR every byte of `data` with `key` in place
pub fn decrypt_in_place(data: &mut [u8], key: u8) {
    for byte in data.iter_mut() {
        *byte ^= key;
    }
}

/// XOR is its own inverse; obfuscating uses the same transform
pub fn encrypt(data: &[u8], key: u8) -> Vec<u8> {
    decrypt(data, key)
}
