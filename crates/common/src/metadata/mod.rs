#![allow(clippy::doc_lazy_continuation)]

/**
 * Metadata Documents
 * ==================
 * Folder listings, file pointers and the device registry are JSON documents
 *  encrypted under a container key and published as opaque bytes.
 * Every document carries a `version` discriminator which is read first;
 *  an unknown version is a hard rejection, never a best-effort parse.
 * Decoding is two-staged:
 *  - serde enforces presence and type of every required field
 *  - `Document::validate` enforces what serde can't (hex decodes, IV
 *    lengths match the encryption mode, names non-empty, ids unique)
 * Either stage failing is `InvalidMetadataFormat`, with the specific
 *  reason only traced at debug level.
 */
mod file;
mod folder;
mod maybe_mime;
mod registry;

pub use file::{EncryptionMode, FileMetadata, FilePointer, FileVersion};
pub use folder::{FileEntry, FilePointerEntry, FolderChild, FolderChildV2, FolderEntry, FolderMetadata};
pub use maybe_mime::MaybeMime;
pub use registry::{AuthStatus, DeviceEntry, DeviceRegistry};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::crypto::encoding::{from_base64, from_hex, to_base64_chunked, to_hex, DEFAULT_BASE64_CHUNK};
use crate::crypto::{decrypt_aes_gcm, encrypt_aes_gcm, generate_iv, Secret, GCM_IV_SIZE};
use crate::error::CryptoError;

pub(crate) fn invalid(reason: &'static str) -> CryptoError {
    tracing::debug!(reason, "metadata rejected");
    CryptoError::InvalidMetadataFormat
}

/// Current time as unix milliseconds, the timestamp unit of every document
pub fn now_millis() -> i64 {
    let now = time::OffsetDateTime::now_utc();
    i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Check that `hex` decodes to exactly `len` bytes
pub(crate) fn check_hex_len(hex: &str, len: usize, reason: &'static str) -> Result<(), CryptoError> {
    match from_hex(hex) {
        Ok(bytes) if bytes.len() == len => Ok(()),
        _ => Err(invalid(reason)),
    }
}

pub(crate) fn check_cid(cid: &str) -> Result<(), CryptoError> {
    cid::Cid::try_from(cid)
        .map(|_| ())
        .map_err(|_| invalid("malformed cid"))
}

pub(crate) fn check_name(name: &str) -> Result<(), CryptoError> {
    if name.is_empty() || name.contains('/') {
        return Err(invalid("malformed name"));
    }
    Ok(())
}

/// A document encrypted under its container key
///
/// ```json
/// { "iv": "<hex, 12 bytes>", "data": "<base64 of ciphertext || tag>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedDocument {
    pub iv: String,
    pub data: String,
}

impl EncryptedDocument {
    pub fn to_json(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self).map_err(|_| CryptoError::EncryptionFailed)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CryptoError> {
        serde_json::from_slice(bytes).map_err(|_| invalid("malformed envelope"))
    }
}

/// A versioned metadata document
///
/// Implementors get encryption, sealing and strict decoding for free and
/// only describe their own semantic checks.
pub trait Document: Serialize + DeserializeOwned + Sized {
    /// Semantic checks beyond serde's structural typing
    fn validate(&self) -> Result<(), CryptoError>;

    fn to_json(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self).map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Parse and validate plaintext JSON
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidMetadataFormat`] for unparseable bytes, an
    /// unknown version, a missing or mistyped field, or a failed semantic
    /// check. Nothing partially decoded is ever returned.
    fn from_json(bytes: &[u8]) -> Result<Self, CryptoError> {
        let document: Self = serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "metadata failed to parse");
            CryptoError::InvalidMetadataFormat
        })?;
        document.validate()?;
        Ok(document)
    }

    fn encrypt(&self, key: &Secret) -> Result<EncryptedDocument, CryptoError> {
        self.encrypt_chunked(key, DEFAULT_BASE64_CHUNK)
    }

    /// Encrypt with a caller-chosen base64 chunk size
    fn encrypt_chunked(&self, key: &Secret, chunk_size: usize) -> Result<EncryptedDocument, CryptoError> {
        self.validate()?;
        let mut plaintext = self.to_json()?;
        let iv = generate_iv();
        let ciphertext = encrypt_aes_gcm(&plaintext, key, &iv);
        crate::crypto::clear_bytes(&mut plaintext);
        Ok(EncryptedDocument {
            iv: to_hex(&iv),
            data: to_base64_chunked(&ciphertext?, chunk_size)?,
        })
    }

    /// Decrypt and strictly decode
    ///
    /// # Errors
    ///
    /// [`CryptoError::DecryptionFailed`] when authentication fails, then
    /// the errors of [`Document::from_json`].
    fn decrypt(document: &EncryptedDocument, key: &Secret) -> Result<Self, CryptoError> {
        let iv = from_hex(&document.iv)?;
        if iv.len() != GCM_IV_SIZE {
            return Err(invalid("envelope iv length"));
        }
        let ciphertext = from_base64(&document.data)?;
        let mut plaintext = decrypt_aes_gcm(&ciphertext, key, &iv)?;
        let decoded = Self::from_json(&plaintext);
        crate::crypto::clear_bytes(&mut plaintext);
        decoded
    }

    /// Seal into the binary `iv || ciphertext || tag` form for the store
    fn seal(&self, key: &Secret) -> Result<Vec<u8>, CryptoError> {
        self.validate()?;
        let mut plaintext = self.to_json()?;
        let sealed = key.seal(&plaintext);
        crate::crypto::clear_bytes(&mut plaintext);
        sealed
    }

    fn unseal(sealed: &[u8], key: &Secret) -> Result<Self, CryptoError> {
        let mut plaintext = key.unseal(sealed)?;
        let decoded = Self::from_json(&plaintext);
        crate::crypto::clear_bytes(&mut plaintext);
        decoded
    }
}
