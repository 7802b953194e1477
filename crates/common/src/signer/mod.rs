//! Deterministic root identity from an external signer
//!
//! A wallet-style signer is asked to sign a fixed structured message
//! ([`KeyDerivationMessage`]). The message carries no nonce or timestamp,
//! so the same signer always produces the same signature, and the
//! signature's `r || s` bytes are stretched through HKDF into a
//! [`RootSecretKey`](crate::crypto::RootSecretKey).
//!
//! Signers that return high-S signatures are normalized before derivation
//! so both representations yield one key.

mod bridge;
mod local;
mod signature;
mod typed_data;

use async_trait::async_trait;

pub use alloy::primitives::Address;
pub use bridge::{derive_from_signature, BridgeError, BridgeSession, SignerBridge};
pub use local::LocalSigner;
pub use signature::{normalize_signature, RecoverableSignature, SIGNATURE_SIZE};
pub use typed_data::{
    account_address, KeyDerivationMessage, DOMAIN_NAME, DOMAIN_VERSION, MESSAGE_VERSION, PRIMARY_TYPE,
    PURPOSE,
};

/// Something that holds a secp256k1 account and can sign typed data
///
/// Implementations return 65 bytes `r || s || v`, with `v` in either the
/// 0/1 or the 27/28 convention.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn address(&self) -> Address;

    async fn sign_typed_data(&self, message: &KeyDerivationMessage)
        -> Result<Vec<u8>, Self::Error>;
}
