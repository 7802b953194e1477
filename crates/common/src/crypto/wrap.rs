//! Key wrapping to a root public key (ECIES over secp256k1)
//!
//! To wrap a key for a recipient:
//! 1. **Generate ephemeral keypair** on secp256k1
//! 2. **ECDH**: multiply the recipient's public point by the ephemeral scalar
//! 3. **Derive**: HKDF-SHA256 over `ephemeral_pub || shared_point` (both
//!    uncompressed) yields a one-time AES-256 key
//! 4. **Encrypt** the key bytes with AES-256-GCM under a random 16-byte nonce
//!
//! The recipient repeats step 2 with its own scalar and the ephemeral public
//! key carried in the wrapped bytes.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pub: 65 ][ nonce: 16 ][ tag: 16 ][ ciphertext: len(key) ]
//! ```

use aes::Aes256;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{AesGcm, Key, Nonce, Tag};
use k256::elliptic_curve::group::Curve as _;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use super::identity::{RootPublicKey, RootSecretKey, ROOT_PUBLIC_SIZE};
use super::kdf::derive;
use crate::error::CryptoError;

type WrapCipher = AesGcm<Aes256, U16>;

/// Size of the wrapping nonce in bytes
pub const WRAP_NONCE_SIZE: usize = 16;
/// Size of the wrapping tag in bytes
pub const WRAP_TAG_SIZE: usize = 16;
/// Bytes a wrapped key carries beyond the key itself
pub const WRAP_OVERHEAD: usize = ROOT_PUBLIC_SIZE + WRAP_NONCE_SIZE + WRAP_TAG_SIZE;

/// A key encrypted to one recipient's root public key
///
/// Serializes as a hex string so it can sit inside JSON documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WrappedKey(Vec<u8>);

impl Serialize for WrappedKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WrappedKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        WrappedKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&[u8]> for WrappedKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() <= WRAP_OVERHEAD {
            return Err(CryptoError::DecryptionFailed);
        }
        Ok(Self(bytes.to_vec()))
    }
}

fn shared_key(
    ephemeral_public: &[u8],
    secret: &k256::SecretKey,
    public: &k256::PublicKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let point = (public.to_projective() * *secret.to_nonzero_scalar()).to_affine();
    let shared = k256::PublicKey::from_affine(point).map_err(|_| CryptoError::DecryptionFailed)?;
    let shared = shared.to_encoded_point(false);

    let mut ikm = Zeroizing::new(Vec::with_capacity(ROOT_PUBLIC_SIZE * 2));
    ikm.extend_from_slice(ephemeral_public);
    ikm.extend_from_slice(shared.as_bytes());
    derive(&ikm, b"", b"", 32)
}

impl WrappedKey {
    /// Parse wrapped bytes from hex
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex).map_err(|_| CryptoError::DecryptionFailed)?;
        Self::try_from(bytes.as_slice())
    }

    /// Hex encoding of the wrapped bytes
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Raw wrapped bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Wrap `key` so only the holder of `recipient`'s private key can read it
    pub fn wrap(key: &[u8], recipient: &RootPublicKey) -> Result<Self, CryptoError> {
        if key.is_empty() {
            return Err(CryptoError::InvalidKeySize);
        }
        let ephemeral = RootSecretKey::generate();
        let ephemeral_public = ephemeral.public().to_uncompressed();
        let aes_key = shared_key(&ephemeral_public, ephemeral.inner(), &recipient.0)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let nonce: [u8; WRAP_NONCE_SIZE] = super::secret::random_array();
        let cipher = WrapCipher::new(Key::<WrapCipher>::from_slice(&aes_key));
        let mut buffer = key.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(WRAP_OVERHEAD + buffer.len());
        out.extend_from_slice(&ephemeral_public);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&buffer);
        Ok(Self(out))
    }

    /// Recover the wrapped key with the recipient's private key
    ///
    /// # Errors
    ///
    /// Every failure (wrong recipient, corrupted bytes, malformed ephemeral
    /// key) is [`CryptoError::DecryptionFailed`].
    pub fn unwrap(&self, recipient: &RootSecretKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if self.0.len() <= WRAP_OVERHEAD {
            return Err(CryptoError::DecryptionFailed);
        }
        let (ephemeral_public, rest) = self.0.split_at(ROOT_PUBLIC_SIZE);
        let (nonce, rest) = rest.split_at(WRAP_NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(WRAP_TAG_SIZE);

        let ephemeral = k256::PublicKey::from_sec1_bytes(ephemeral_public)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let aes_key = shared_key(ephemeral_public, recipient.inner(), &ephemeral)?;

        let cipher = WrapCipher::new(Key::<WrapCipher>::from_slice(&aes_key));
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        cipher
            .decrypt_in_place_detached(
                Nonce::<U16>::from_slice(nonce),
                b"",
                buffer.as_mut_slice(),
                Tag::from_slice(tag),
            )
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(buffer)
    }
}
