//! Authenticated-encrypted export container.
//!
//! Format: `MAGIC || salt(16) || nonce(12) || AES-256-GCM ciphertext+tag`.
//! The key is derived from the passphrase with scrypt (N=16384, r=8,
//! p=1). Salt and nonce are freshly random on every encrypt call and
//! never reused, even for the same passphrase.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use scrypt::Params;

use mx_core::{MxError, MxResult};

/// Container magic tag.
pub const MAGIC: &[u8] = b"IMEXPORT1";

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// scrypt work factor: N = 2^14, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Encrypt `plaintext` under `passphrase` into a self-contained
/// container.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> MxResult<Vec<u8>> {
    if passphrase.is_empty() {
        return Err(MxError::PassphraseMissing);
    }

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| MxError::Crypto("encryption failed".into()))?;

    let mut out = Vec::with_capacity(MAGIC.len() + SALT_SIZE + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a container produced by [`encrypt`].
///
/// Any authentication failure (wrong passphrase, tampered bytes,
/// truncation) returns `Authentication` and never partial plaintext.
pub fn decrypt(container: &[u8], passphrase: &str) -> MxResult<Vec<u8>> {
    if passphrase.is_empty() {
        return Err(MxError::PassphraseMissing);
    }
    // Minimum: header plus the 16-byte GCM tag of an empty message.
    let min_len = MAGIC.len() + SALT_SIZE + NONCE_SIZE + 16;
    if container.len() < min_len || !container.starts_with(MAGIC) {
        return Err(MxError::Authentication);
    }

    let salt = &container[MAGIC.len()..MAGIC.len() + SALT_SIZE];
    let nonce = &container[MAGIC.len() + SALT_SIZE..MAGIC.len() + SALT_SIZE + NONCE_SIZE];
    let ciphertext = &container[MAGIC.len() + SALT_SIZE + NONCE_SIZE..];

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| MxError::Authentication)
}

fn derive_key(passphrase: &str, salt: &[u8]) -> MxResult<[u8; KEY_SIZE]> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|e| MxError::Crypto(format!("invalid kdf parameters: {e}")))?;
    let mut key = [0u8; KEY_SIZE];
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut key)
        .map_err(|e| MxError::Crypto(format!("key derivation failed: {e}")))?;
    Ok(key)
}
