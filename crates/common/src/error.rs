//! Error taxonomy shared by every cryptographic operation in the core.
//!
//! Several kinds are deliberately undifferentiated: a failed unseal never
//! says whether the tag, the key or the length was wrong, and a rejected
//! record never says which check it failed. Callers get one generic kind;
//! the specific reason is only ever emitted as a `debug` trace.

/// Errors produced by the cryptographic core
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key size")]
    InvalidKeySize,
    #[error("invalid IV size")]
    InvalidIvSize,
    #[error("encryption failed")]
    EncryptionFailed,
    /// Wrong key, bad tag, truncated input, corrupted wrapped key.
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signing failed")]
    SigningFailed,
    /// Bad signature, stale sequence, expired validity, address mismatch.
    #[error("verification failed")]
    VerificationFailed,
    /// Malformed bytes, unknown version, missing or mistyped field.
    #[error("invalid metadata format")]
    InvalidMetadataFormat,
    #[error("derived key out of range")]
    DerivedKeyOutOfRange,
    #[error("rate limited")]
    RateLimited,
}
