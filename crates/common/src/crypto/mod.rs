//! Cryptographic primitives for SealVault
//!
//! This module provides the foundation every other layer builds on:
//!
//! - **Root identity**: a secp256k1 keypair ([`RootSecretKey`]/[`RootPublicKey`]),
//!   the single secret a user retains
//! - **Naming & device keys**: Ed25519 keypairs ([`SecretKey`]/[`PublicKey`])
//! - **Content encryption**: AES-256-GCM [`Secret`]s with internally generated
//!   IVs, plus AES-256-CTR with range decryption for seekable media
//! - **Key wrapping**: ECIES over secp256k1 ([`WrappedKey`])
//! - **Derivation**: HKDF-SHA256 with fixed, versioned domain strings
//!
//! # Durability Model
//!
//! Every key is either random and wrapped to each authorized holder, or
//! re-derivable from the root identity plus a public identifier. Nothing is
//! random and unrecoverable at the same time.

mod ctr;
pub mod encoding;
mod identity;
pub mod kdf;
mod keys;
mod secret;
mod wrap;

pub use ctr::{decrypt_ctr, decrypt_ctr_range, encrypt_ctr, BLOCK_SIZE, CTR_IV_SIZE};
pub use identity::{RootPublicKey, RootSecretKey, ROOT_PUBLIC_SIZE, ROOT_SECRET_SIZE};
pub use keys::{PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use secret::{
    clear_bytes, decrypt_aes_gcm, encrypt_aes_gcm, generate_iv, Secret, GCM_IV_SIZE, GCM_TAG_SIZE,
    SECRET_SIZE,
};
pub use wrap::{WrappedKey, WRAP_OVERHEAD};

pub(crate) use secret::random_array;

/// Generate a fresh 16-byte counter-mode IV
///
/// The counter half starts at zero so a file of up to 2^64 blocks never
/// wraps into a previously used counter.
pub fn generate_ctr_iv() -> [u8; CTR_IV_SIZE] {
    let mut iv: [u8; CTR_IV_SIZE] = random_array();
    iv[8..].fill(0);
    iv
}
