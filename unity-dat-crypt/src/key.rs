//! Single-byte XOR key recovery

/// Find the XOR key that turns the start of `data` into `signature`.
///
/// Every key from `0x00` to `0xFF` is tried in ascending order and the
/// first one for which `data[i] ^ key == signature[i]` holds over the
/// whole signature is returned, so the lowest key wins when several
/// match. Returns `None` when `data` is shorter than `signature` or no
/// key matches. An empty signature matches key `0`.
pub fn find_key(data: &[u8], signature: &[u8]) -> Option<u8> {
    let prefix = data.get(..signature.len())?;

    (0..=u8::MAX).find(|&key| {
        prefix
            .iter()
            .zip(signature)
            .all(|(&byte, &expected)| byte ^ key == expected)
    })
}

/// Check that `key` maps the start of `data` onto `signature`
pub fn key_matches(data: &[u8], signature: &[u8], key: u8) -> bool {
    match data.get(..signature.len()) {
        Some(prefix) => prefix
            .iter()
            .zip(signature)
            .all(|(&byte, &expected)| byte ^ key == expected),
        None => false,
    }
}
