//! Root identity keys on secp256k1
//!
//! The root identity is the one secret a user must retain. Its private half
//! seeds every deterministic derivation and unwraps every key wrapped to its
//! public half. It is never persisted by this crate.

use alloy::primitives::Address;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Size of a secp256k1 private scalar in bytes
pub const ROOT_SECRET_SIZE: usize = 32;
/// Size of an uncompressed SEC1 public key in bytes
pub const ROOT_PUBLIC_SIZE: usize = 65;

/// Public half of a root identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPublicKey(pub(crate) k256::PublicKey);

impl RootPublicKey {
    /// Parse a compressed (33 byte) or uncompressed (65 byte) SEC1 key
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Parse a hex-encoded SEC1 key, with or without a "0x" prefix
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Uncompressed SEC1 encoding
    pub fn to_uncompressed(&self) -> [u8; ROOT_PUBLIC_SIZE] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; ROOT_PUBLIC_SIZE];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Hex of the uncompressed SEC1 encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_uncompressed())
    }

    /// The account address an external signer holding this key reports
    pub fn account(&self) -> Address {
        Address::from_raw_public_key(&self.to_uncompressed()[1..])
    }
}

/// Private half of a root identity
///
/// The inner scalar is zeroized on drop; [`RootSecretKey::clear`] lets a
/// holder release it early inside a scoped cleanup.
#[derive(Clone)]
pub struct RootSecretKey(k256::SecretKey);

impl std::fmt::Debug for RootSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootSecretKey(..)")
    }
}

impl RootSecretKey {
    /// Generate a new root identity from OS randomness
    pub fn generate() -> Self {
        loop {
            let bytes = Zeroizing::new(super::secret::random_array::<ROOT_SECRET_SIZE>());
            // Out-of-range draws happen with probability ~2^-128; draw again.
            if let Ok(key) = Self::from_slice(bytes.as_slice()) {
                return key;
            }
        }
    }

    /// Build a key from a 32-byte big-endian scalar
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKeySize`] for the wrong length and
    /// [`CryptoError::DerivedKeyOutOfRange`] for zero or a value not below
    /// the curve order.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ROOT_SECRET_SIZE {
            return Err(CryptoError::InvalidKeySize);
        }
        k256::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::DerivedKeyOutOfRange)
    }

    /// Parse a hex-encoded private scalar
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes =
            Zeroizing::new(hex::decode(hex).map_err(|_| CryptoError::InvalidKeySize)?);
        Self::from_slice(&bytes)
    }

    /// The scalar bytes, wrapped so the copy is zeroized when dropped
    pub fn to_bytes(&self) -> Zeroizing<[u8; ROOT_SECRET_SIZE]> {
        let mut out = Zeroizing::new([0u8; ROOT_SECRET_SIZE]);
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    /// Hex of the private scalar
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.to_bytes().as_slice()))
    }

    /// Derive the public half
    pub fn public(&self) -> RootPublicKey {
        RootPublicKey(self.0.public_key())
    }

    pub(crate) fn inner(&self) -> &k256::SecretKey {
        &self.0
    }

    /// Replace the scalar with a fixed placeholder, dropping (and zeroizing)
    /// the real one
    pub fn clear(&mut self) {
        let mut one = [0u8; ROOT_SECRET_SIZE];
        one[ROOT_SECRET_SIZE - 1] = 1;
        if let Ok(placeholder) = k256::SecretKey::from_slice(&one) {
            self.0 = placeholder;
        }
    }
}
