//! Naming keypairs, addresses and signed records
//!
//! Every mutable pointer in a vault (root folder, sub-folders, files, the
//! device registry) is published as a [`NamingRecord`] under the
//! [`NamingAddress`] of its own Ed25519 keypair. Folder keypairs are random
//! and travel wrapped inside their parent's listing; file and registry
//! keypairs are re-derived from the root identity on demand.

mod address;
mod proto;
mod record;
mod tracker;

pub use address::{NamingAddress, IDENTITY_HASH_CODE, LIBP2P_KEY_CODEC};
pub use record::{
    NamingRecord, RecordOptions, UnsignedRecord, DEFAULT_LIFETIME, DEFAULT_TTL, MAX_RECORD_SIZE,
    SIGNATURE_V2_PREFIX,
};
pub use tracker::SequenceTracker;

use cid::Cid;

use crate::crypto::kdf::{derive_file_naming_key, derive_registry_naming_key, derive_vault_naming_key};
use crate::crypto::{PublicKey, RootSecretKey, SecretKey};
use crate::error::CryptoError;

/// Record value pointing at immutable content
pub fn ipfs_path(cid: &Cid) -> String {
    format!("/ipfs/{}", cid)
}

/// Parse a `/ipfs/<cid>` record value back into a content id
pub fn parse_ipfs_path(value: &str) -> Option<Cid> {
    let cid = value.strip_prefix("/ipfs/")?;
    Cid::try_from(cid).ok()
}

/// An Ed25519 naming keypair together with its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingKeypair {
    secret: SecretKey,
    address: NamingAddress,
}

impl From<SecretKey> for NamingKeypair {
    fn from(secret: SecretKey) -> Self {
        let address = NamingAddress::from_public_key(&secret.public());
        Self { secret, address }
    }
}

impl NamingKeypair {
    /// Random keypair, as used for folders
    pub fn generate() -> Self {
        Self::from(SecretKey::generate())
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> PublicKey {
        self.secret.public()
    }

    pub fn address(&self) -> &NamingAddress {
        &self.address
    }

    /// Create and sign a record under this keypair
    pub fn sign_record(
        &self,
        value: impl Into<Vec<u8>>,
        sequence: u64,
        options: &RecordOptions,
    ) -> Result<NamingRecord, CryptoError> {
        NamingRecord::create(&self.secret, value, sequence, options)
    }

    pub fn clear(&mut self) {
        self.secret.clear();
    }
}

/// Discoverable naming keypair for the vault
pub fn derive_vault_naming_keypair(root: &RootSecretKey) -> Result<NamingKeypair, CryptoError> {
    derive_vault_naming_key(root).map(NamingKeypair::from)
}

/// Naming keypair for the device registry
pub fn derive_registry_naming_keypair(root: &RootSecretKey) -> Result<NamingKeypair, CryptoError> {
    derive_registry_naming_key(root).map(NamingKeypair::from)
}

/// Naming keypair for one file, keyed by its unique id
pub fn derive_file_naming_keypair(
    root: &RootSecretKey,
    file_id: &str,
) -> Result<NamingKeypair, CryptoError> {
    derive_file_naming_key(root, file_id).map(NamingKeypair::from)
}
