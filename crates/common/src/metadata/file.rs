use serde::{Deserialize, Serialize};

use super::{check_cid, check_hex_len, check_name, invalid, Document, MaybeMime};
use crate::crypto::encoding::from_hex;
use crate::crypto::{
    decrypt_aes_gcm, decrypt_ctr, decrypt_ctr_range, encrypt_aes_gcm, encrypt_ctr,
    generate_ctr_iv, generate_iv, Secret, WrappedKey, CTR_IV_SIZE, GCM_IV_SIZE,
};
use crate::error::CryptoError;

/// How a file's content bytes were encrypted
///
/// Documents written before the field existed are block mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EncryptionMode {
    #[default]
    Gcm,
    Ctr,
}

impl EncryptionMode {
    pub fn iv_size(self) -> usize {
        match self {
            EncryptionMode::Gcm => GCM_IV_SIZE,
            EncryptionMode::Ctr => CTR_IV_SIZE,
        }
    }

    /// A fresh IV of the right size for this mode
    pub fn generate_iv(self) -> Vec<u8> {
        match self {
            EncryptionMode::Gcm => generate_iv().to_vec(),
            EncryptionMode::Ctr => generate_ctr_iv().to_vec(),
        }
    }

    pub fn encrypt(self, plaintext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionMode::Gcm => encrypt_aes_gcm(plaintext, key, iv),
            EncryptionMode::Ctr => encrypt_ctr(plaintext, key, iv),
        }
    }

    pub fn decrypt(self, ciphertext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionMode::Gcm => decrypt_aes_gcm(ciphertext, key, iv),
            EncryptionMode::Ctr => decrypt_ctr(ciphertext, key, iv),
        }
    }

    /// Decrypt the inclusive range `[start, end]` of the plaintext
    ///
    /// Counter mode touches only the covering blocks. Block mode has to
    /// authenticate the whole ciphertext first.
    pub fn decrypt_range(
        self,
        ciphertext: &[u8],
        key: &Secret,
        iv: &[u8],
        start: usize,
        end: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptionMode::Ctr => decrypt_ctr_range(ciphertext, key, iv, start, end),
            EncryptionMode::Gcm => {
                let plaintext = decrypt_aes_gcm(ciphertext, key, iv)?;
                if start > end || end >= plaintext.len() {
                    return Err(CryptoError::DecryptionFailed);
                }
                Ok(plaintext[start..=end].to_vec())
            }
        }
    }
}

/// One superseded version of a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub cid: String,
    pub file_key: WrappedKey,
    pub file_iv: String,
    pub size: u64,
    #[serde(default)]
    pub encryption_mode: EncryptionMode,
    pub timestamp: i64,
}

impl FileVersion {
    fn validate(&self) -> Result<(), CryptoError> {
        check_cid(&self.cid)?;
        check_hex_len(&self.file_iv, self.encryption_mode.iv_size(), "version iv length")
    }
}

/// Content fields shared by file pointers and inline folder entries
pub(crate) fn validate_content(
    name: &str,
    cid: &str,
    file_iv: &str,
    mode: EncryptionMode,
    versions: &[FileVersion],
) -> Result<(), CryptoError> {
    check_name(name)?;
    check_cid(cid)?;
    check_hex_len(file_iv, mode.iv_size(), "file iv length")?;
    versions.iter().try_for_each(FileVersion::validate)
}

/// Metadata of one file, encrypted under its parent folder's key and
/// published under the file's own derived naming address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePointer {
    pub name: String,
    pub cid: String,
    pub file_key: WrappedKey,
    pub file_iv: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: MaybeMime,
    #[serde(default)]
    pub encryption_mode: EncryptionMode,
    pub created_at: i64,
    pub modified_at: i64,
    /// Prior versions, oldest first
    #[serde(default)]
    pub versions: Vec<FileVersion>,
}

impl FilePointer {
    pub fn iv(&self) -> Result<Vec<u8>, CryptoError> {
        from_hex(&self.file_iv)
    }

    /// Replace the content, keeping the current one as a prior version
    pub fn push_version(
        &mut self,
        cid: String,
        file_key: WrappedKey,
        file_iv: String,
        size: u64,
        encryption_mode: EncryptionMode,
        timestamp: i64,
    ) {
        let previous = FileVersion {
            cid: std::mem::replace(&mut self.cid, cid),
            file_key: std::mem::replace(&mut self.file_key, file_key),
            file_iv: std::mem::replace(&mut self.file_iv, file_iv),
            size: std::mem::replace(&mut self.size, size),
            encryption_mode: std::mem::replace(&mut self.encryption_mode, encryption_mode),
            timestamp: self.modified_at,
        };
        self.versions.push(previous);
        self.modified_at = timestamp;
    }

    /// Drop all but the newest `keep` prior versions
    pub fn prune_versions(&mut self, keep: usize) -> Vec<FileVersion> {
        let excess = self.versions.len().saturating_sub(keep);
        self.versions.drain(..excess).collect()
    }
}

/// Versioned file pointer document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum FileMetadata {
    #[serde(rename = "v1")]
    V1(FilePointer),
}

impl FileMetadata {
    pub fn pointer(&self) -> &FilePointer {
        match self {
            FileMetadata::V1(pointer) => pointer,
        }
    }

    pub fn pointer_mut(&mut self) -> &mut FilePointer {
        match self {
            FileMetadata::V1(pointer) => pointer,
        }
    }
}

impl From<FilePointer> for FileMetadata {
    fn from(pointer: FilePointer) -> Self {
        FileMetadata::V1(pointer)
    }
}

impl Document for FileMetadata {
    fn validate(&self) -> Result<(), CryptoError> {
        let p = self.pointer();
        if p.modified_at < p.created_at {
            return Err(invalid("modified before created"));
        }
        validate_content(&p.name, &p.cid, &p.file_iv, p.encryption_mode, &p.versions)
    }
}
