//! Shared AES-256-GCM encryption utilities for tenant config secrets
//! (SMTP passwords, Twilio auth tokens) at rest in the tenant store.
//!
//! Values are stored in the format:
//! `ENC[AES256-GCM,data:<b64>,iv:<b64>,tag:<b64>]`
//!
//! Decrypted values are returned as [`SecretString`] to prevent accidental
//! logging. The [`MasterKey`] wrapper zeroizes key material on drop.

use std::fmt;
use std::sync::LazyLock;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use regex::Regex;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, Secret, SecretString};

/// Compiled regex for parsing `ENC[AES256-GCM,data:<b64>,iv:<b64>,tag:<b64>]`.
///
/// Captures three groups: data, iv, and tag (all base64-encoded).
static ENC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^ENC\[AES256-GCM,data:([A-Za-z0-9+/=]+),iv:([A-Za-z0-9+/=]+),tag:([A-Za-z0-9+/=]+)\]$",
    )
    .expect("ENC regex is valid")
});

/// A 32-byte AES-256 master key that is zeroized when dropped.
///
/// Prevents key material from lingering in memory after the key is no longer
/// needed. The [`Debug`] implementation is redacted to avoid accidental logging.
///
/// Raw bytes are not accessible outside this crate — all cryptographic
/// operations go through the functions in this module.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    /// Access the raw key bytes (crate-internal only).
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Errors that can occur during encryption/decryption operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The provided master key is not valid (wrong length or encoding).
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    /// The encrypted value format is malformed.
    #[error("invalid encrypted value: {0}")]
    InvalidFormat(String),

    /// Decryption failed — wrong key or corrupted data.
    #[error("decryption failed (wrong key or corrupted data)")]
    DecryptionFailed,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Parse a 32-byte master key from hex or base64.
///
/// Accepts either 64 hex characters or a base64 string that decodes to exactly
/// 32 bytes. The returned [`MasterKey`] is zeroized on drop.
pub fn parse_master_key(raw: &str) -> Result<MasterKey, CryptoError> {
    let trimmed = raw.trim();
    // Try hex first (64 hex chars = 32 bytes).
    if trimmed.len() == 64
        && let Ok(bytes) = hex::decode(trimmed)
        && bytes.len() == 32
    {
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        return Ok(MasterKey(key));
    }
    // Try base64.
    if let Ok(bytes) = B64.decode(trimmed)
        && bytes.len() == 32
    {
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        return Ok(MasterKey(key));
    }
    Err(CryptoError::InvalidKey(
        "must be 32 bytes encoded as 64 hex chars or base64".to_owned(),
    ))
}

/// Returns `true` if `value` looks like an encrypted `ENC[AES256-GCM,...]` marker.
#[must_use]
pub fn is_encrypted(value: &str) -> bool {
    ENC_RE.is_match(value.trim())
}

/// If `value` starts with `ENC[AES256-GCM,...]`, decrypt it using the master
/// key. Otherwise return the value unchanged (pass-through).
///
/// Returns a [`SecretString`] to prevent accidental logging of decrypted
/// secrets.
pub fn decrypt_value(value: &str, master_key: &MasterKey) -> Result<SecretString, CryptoError> {
    let trimmed = value.trim();

    let Some(caps) = ENC_RE.captures(trimmed) else {
        // Not an ENC[...] envelope — pass through unchanged.
        return Ok(SecretString::new(value.to_owned()));
    };

    let data = B64
        .decode(&caps[1])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in data: {e}")))?;
    let iv = B64
        .decode(&caps[2])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in iv: {e}")))?;
    let tag = B64
        .decode(&caps[3])
        .map_err(|e| CryptoError::InvalidFormat(format!("invalid base64 in tag: {e}")))?;

    if iv.len() != 12 {
        return Err(CryptoError::InvalidFormat(format!(
            "IV must be 12 bytes, got {}",
            iv.len()
        )));
    }
    if tag.len() != 16 {
        return Err(CryptoError::InvalidFormat(format!(
            "tag must be 16 bytes, got {}",
            tag.len()
        )));
    }

    // AES-GCM ciphertext = data || tag
    let mut ciphertext = data;
    ciphertext.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let nonce = Nonce::from_slice(&iv);

    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let s = String::from_utf8(plaintext)
        .map_err(|e| CryptoError::InvalidFormat(format!("decrypted value is not UTF-8: {e}")))?;

    Ok(SecretString::new(s))
}

/// Encrypt a plaintext string, producing an `ENC[AES256-GCM,...]` marker.
///
/// The returned string is the encrypted envelope (not secret itself — it is
/// meant to be stored in configuration files).
pub fn encrypt_value(plaintext: &str, master_key: &MasterKey) -> Result<String, CryptoError> {
    use aes_gcm::AeadCore;

    let cipher = Aes256Gcm::new_from_slice(master_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid AES key: {e}")))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    // AES-GCM output = ciphertext_data || 16-byte tag
    let (data, tag) = ciphertext.split_at(ciphertext.len() - 16);

    Ok(format!(
        "ENC[AES256-GCM,data:{},iv:{},tag:{}]",
        B64.encode(data),
        B64.encode(nonce.as_slice()),
        B64.encode(tag),
    ))
}
