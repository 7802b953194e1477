/**
 * Tunables for record production, the signer
 *  cooldown and textual encodings, loaded from TOML.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - Root identity (secp256k1) and naming keys (Ed25519)
 *  - Authenticated and counter-mode encryption
 *  - Key wrapping and HKDF derivation
 */
pub mod crypto;
/**
 * Per-device identities and the approval
 *  handshake between devices.
 */
pub mod device;
/**
 * The error taxonomy every cryptographic
 *  operation reports through.
 */
pub mod error;
/**
 * Encrypted, versioned documents: folder listings,
 *  file pointers and the device registry.
 */
pub mod metadata;
/**
 * Naming addresses and signed, sequence-numbered
 *  records pointing at content.
 */
pub mod naming;
/**
 * Deriving the root identity from one deterministic
 *  signature of an external signer.
 */
pub mod signer;
/**
 * The contract of the storage and relay collaborator,
 *  with an in-memory implementation.
 */
pub mod store;
/**
 * Vault bootstrap, folder keys and publishing
 *  listings through a content store.
 */
pub mod vault;

pub mod prelude {
    pub use crate::config::CoreConfig;
    pub use crate::crypto::{PublicKey, RootPublicKey, RootSecretKey, Secret, SecretKey, WrappedKey};
    pub use crate::device::DeviceIdentity;
    pub use crate::error::CryptoError;
    pub use crate::metadata::{DeviceRegistry, Document, FileMetadata, FolderMetadata};
    pub use crate::naming::{NamingAddress, NamingKeypair, NamingRecord, RecordOptions};
    pub use crate::signer::{ExternalSigner, SignerBridge};
    pub use crate::store::{ContentStore, MemoryStore};
    pub use crate::vault::{EncryptedVaultKeys, FolderKeys, Vault, VaultKeys};
}
