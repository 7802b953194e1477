//! Deterministic, domain-separated key derivation (HKDF-SHA256)
//!
//! Every purpose has its own versioned `info` literal, so two purposes can
//! never produce the same output from the same root, and any device holding
//! the root identity can recompute a descendant key offline.
//!
//! ```text
//! root secp256k1 scalar
//!   -> HKDF-SHA256(salt = "sealvault-v1", info = <purpose>)
//!   -> 32-byte Ed25519 seed
//!   -> naming keypair -> naming address (k51...)
//! ```

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::identity::RootSecretKey;
use super::keys::{SecretKey, PRIVATE_KEY_SIZE};
use super::secret::Secret;
use crate::error::CryptoError;

/// Salt shared by every derivation in this crate
pub const HKDF_SALT: &[u8] = b"sealvault-v1";
/// Info for the vault's discoverable naming keypair
pub const VAULT_NAMING_INFO: &[u8] = b"sealvault-vault-naming-v1";
/// Info for the device registry naming keypair
pub const REGISTRY_NAMING_INFO: &[u8] = b"sealvault-device-registry-naming-v1";
/// Info prefix for per-file naming keypairs, followed by the file id
pub const FILE_NAMING_INFO_PREFIX: &str = "sealvault-file-naming-v1:";
/// Info for the symmetric key encrypting the device registry
pub const REGISTRY_KEY_INFO: &[u8] = b"sealvault-device-registry-key-v1";
/// Info for the external signer bridge seed
pub const SIGNER_BRIDGE_INFO: &[u8] = b"sealvault-signer-bridge-v1";

/// Minimum length of a file id used for derivation
pub const MIN_FILE_ID_LENGTH: usize = 10;

/// Largest output HKDF-SHA256 can produce
pub const MAX_OUTPUT_LENGTH: usize = 255 * 32;

/// HKDF extract-and-expand over SHA-256
///
/// Pure: identical inputs always produce identical bytes.
///
/// # Errors
///
/// [`CryptoError::InvalidKeySize`] when `output_length` is zero or above
/// [`MAX_OUTPUT_LENGTH`].
pub fn derive(
    input_key_material: &[u8],
    salt: &[u8],
    domain_info: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if output_length == 0 || output_length > MAX_OUTPUT_LENGTH {
        return Err(CryptoError::InvalidKeySize);
    }
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key_material);
    let mut okm = Zeroizing::new(vec![0u8; output_length]);
    hk.expand(domain_info, okm.as_mut_slice())
        .map_err(|_| CryptoError::InvalidKeySize)?;
    Ok(okm)
}

/// Derive a 32-byte seed from the root identity for `domain_info`
pub(crate) fn derive_seed(
    root: &RootSecretKey,
    domain_info: &[u8],
) -> Result<Zeroizing<[u8; PRIVATE_KEY_SIZE]>, CryptoError> {
    let ikm = root.to_bytes();
    let okm = derive(ikm.as_slice(), HKDF_SALT, domain_info, PRIVATE_KEY_SIZE)?;
    let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
    seed.copy_from_slice(&okm);
    Ok(seed)
}

fn derive_naming_key(root: &RootSecretKey, domain_info: &[u8]) -> Result<SecretKey, CryptoError> {
    let seed = derive_seed(root, domain_info)?;
    Ok(SecretKey::from(*seed))
}

/// Deterministic naming keypair locating the vault
pub fn derive_vault_naming_key(root: &RootSecretKey) -> Result<SecretKey, CryptoError> {
    derive_naming_key(root, VAULT_NAMING_INFO)
}

/// Deterministic naming keypair for the device registry
pub fn derive_registry_naming_key(root: &RootSecretKey) -> Result<SecretKey, CryptoError> {
    derive_naming_key(root, REGISTRY_NAMING_INFO)
}

/// Deterministic naming keypair for one file
///
/// The file id is part of the info string, so every file publishes under
/// its own address.
///
/// # Errors
///
/// [`CryptoError::InvalidMetadataFormat`] if `file_id` is shorter than
/// [`MIN_FILE_ID_LENGTH`].
pub fn derive_file_naming_key(root: &RootSecretKey, file_id: &str) -> Result<SecretKey, CryptoError> {
    if file_id.len() < MIN_FILE_ID_LENGTH {
        return Err(CryptoError::InvalidMetadataFormat);
    }
    let info = format!("{}{}", FILE_NAMING_INFO_PREFIX, file_id);
    derive_naming_key(root, info.as_bytes())
}

/// Symmetric key for the device registry document
///
/// Derived rather than wrapped, so a fresh device holding only the root
/// identity can read the registry before it has been approved.
pub fn derive_registry_key(root: &RootSecretKey) -> Result<Secret, CryptoError> {
    let seed = derive_seed(root, REGISTRY_KEY_INFO)?;
    Ok(Secret::from(*seed))
}
