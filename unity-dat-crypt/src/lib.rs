//! Unity DAT decryption
//!
//! Game bundles shipped as `.dat` files are often obfuscated by XOR-ing
//! every byte with a single key. Because a decrypted bundle always starts
//! with a known signature (`UnityFS`), the key can be recovered by trying
//! all 256 candidates against the first bytes of the file.
//!
//! # Example
//!
//! ```rust,no_run
//! use unity_dat_crypt::{DatDecryptor, find_key};
//!
//! let data = std::fs::read("sharedassets0.dat")?;
//! if let Some(key) = find_key(&data, b"UnityFS") {
//!     println!("key: {:#04x}", key);
//! }
//!
//! // Writes sharedassets0_DEC.dat next to the input
//! let outcome = DatDecryptor::default().decrypt_to_sibling("sharedassets0.dat")?;
//! println!("wrote {}", outcome.output.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod decryptor;
pub mod key;
pub mod xor;

pub use decryptor::{DatDecryptor, DecryptOutcome, decrypted_path_for};
pub use key::{find_key, key_matches};
pub use xor::{decrypt, decrypt_in_place, encrypt};
