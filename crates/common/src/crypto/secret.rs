//! Content encryption using AES-256-GCM
//!
//! Every folder, file and metadata document is encrypted under a `Secret`.
//! The high-level [`Secret::seal`] always draws a fresh IV itself, so a
//! caller can never reuse one under the same key. The low-level
//! [`encrypt_aes_gcm`]/[`decrypt_aes_gcm`] pair exists for documents that
//! store their IV next to the ciphertext instead of in front of it.

use std::io::Read;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of the AES-GCM IV in bytes
pub const GCM_IV_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const GCM_TAG_SIZE: usize = 16;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;

/// A 256-bit symmetric key
///
/// Sealed output is `iv (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
/// let sealed = secret.seal(b"sensitive data")?;
/// let recovered = secret.unseal(&sealed)?;
/// assert_eq!(b"sensitive data", &recovered[..]);
/// ```
#[derive(PartialEq, Eq, Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        Self(random_array())
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeySize`] if the slice is not exactly
    /// `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SECRET_SIZE] = data.try_into().map_err(|_| CryptoError::InvalidKeySize)?;
        Ok(bytes.into())
    }

    /// Parse a secret from a hexadecimal string
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; SECRET_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| CryptoError::InvalidKeySize)?;
        Ok(Self(buff))
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Overwrite the key bytes with zeros
    pub fn clear(&mut self) {
        self.0.zeroize();
    }

    /// Encrypt with a freshly generated IV
    ///
    /// Output is `iv || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv: [u8; GCM_IV_SIZE] = random_array();
        let ciphertext = encrypt_aes_gcm(plaintext, self, &iv)?;

        let mut out = Vec::with_capacity(GCM_IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Reverse [`Secret::seal`]
    ///
    /// # Errors
    ///
    /// Any failure (short input, wrong key, tampered bytes) is
    /// [`CryptoError::DecryptionFailed`].
    pub fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < GCM_IV_SIZE + GCM_TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }
        let (iv, ciphertext) = sealed.split_at(GCM_IV_SIZE);
        decrypt_aes_gcm(ciphertext, self, iv).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Seal everything a reader yields
    ///
    /// This buffers the whole input; large media should use counter mode.
    pub fn seal_reader<R>(&self, mut reader: R) -> Result<impl Read, CryptoError>
    where
        R: Read,
    {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let sealed = self.seal(&data);
        data.zeroize();
        Ok(std::io::Cursor::new(sealed?))
    }
}

/// Encrypt `plaintext` under `key` with a caller-supplied 12-byte IV
///
/// Output is `ciphertext || tag`. Prefer [`Secret::seal`] unless the IV is
/// stored separately and was freshly generated for this call.
pub fn encrypt_aes_gcm(plaintext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != GCM_IV_SIZE {
        return Err(CryptoError::InvalidIvSize);
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt `ciphertext || tag` under `key` and a 12-byte IV
pub fn decrypt_aes_gcm(ciphertext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != GCM_IV_SIZE {
        return Err(CryptoError::InvalidIvSize);
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Fill a fixed-size array from the OS RNG
///
/// Panics only if the operating system cannot supply randomness, in which
/// case no key material could be produced safely anyway.
pub(crate) fn random_array<const N: usize>() -> [u8; N] {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
    buff
}

/// Generate a fresh 12-byte GCM IV
pub fn generate_iv() -> [u8; GCM_IV_SIZE] {
    random_array()
}

/// Overwrite a buffer with zeros
///
/// Best effort: copies made elsewhere (by the allocator, by serializers) are
/// outside its reach.
pub fn clear_bytes(bytes: &mut [u8]) {
    bytes.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal() {
        let secret = Secret::generate();
        let data = b"hello world, this is a test message for encryption";

        let sealed = secret.seal(data).unwrap();
        assert_eq!(sealed.len(), GCM_IV_SIZE + data.len() + GCM_TAG_SIZE);
        let opened = secret.unseal(&sealed).unwrap();

        assert_eq!(data.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_seal_uses_fresh_iv() {
        let secret = Secret::generate();
        let a = secret.seal(b"same").unwrap();
        let b = secret.seal(b"same").unwrap();
        assert_ne!(a[..GCM_IV_SIZE], b[..GCM_IV_SIZE]);
    }

    #[test]
    fn test_seal_reader() {
        let secret = Secret::generate();
        let data = b"hello world, this is a test message for reader sealing";

        let mut reader = secret.seal_reader(std::io::Cursor::new(data.to_vec())).unwrap();
        let mut sealed = Vec::new();
        reader.read_to_end(&mut sealed).unwrap();

        assert_eq!(secret.unseal(&sealed).unwrap(), data.to_vec());
    }

    #[test]
    fn test_secret_size_validation() {
        assert_eq!(
            Secret::from_slice(&[1u8; 16]),
            Err(CryptoError::InvalidKeySize)
        );
        assert_eq!(
            Secret::from_slice(&[1u8; 64]),
            Err(CryptoError::InvalidKeySize)
        );
        assert!(Secret::from_slice(&[1u8; SECRET_SIZE]).is_ok());
    }

    #[test]
    fn test_failures_are_indistinguishable() {
        let secret = Secret::generate();
        let mut sealed = secret.seal(b"test data for integrity check").unwrap();

        let wrong_key = Secret::generate().unseal(&sealed).unwrap_err();
        let truncated = secret.unseal(&sealed[..GCM_IV_SIZE + 4]).unwrap_err();
        sealed[GCM_IV_SIZE + 3] ^= 0x01;
        let tampered = secret.unseal(&sealed).unwrap_err();

        assert_eq!(wrong_key, CryptoError::DecryptionFailed);
        assert_eq!(truncated, wrong_key);
        assert_eq!(tampered, wrong_key);
    }

    #[test]
    fn test_every_bit_flip_is_rejected() {
        let secret = Secret::generate();
        let sealed = secret.seal(b"flip me").unwrap();

        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut corrupted = sealed.clone();
                corrupted[byte] ^= 1 << bit;
                assert_eq!(
                    secret.unseal(&corrupted),
                    Err(CryptoError::DecryptionFailed)
                );
            }
        }
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = Secret::generate();
        let sealed = secret.seal(b"").unwrap();
        assert!(secret.unseal(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_low_level_rejects_bad_iv() {
        let secret = Secret::generate();
        assert_eq!(
            encrypt_aes_gcm(b"x", &secret, &[0u8; 16]),
            Err(CryptoError::InvalidIvSize)
        );
        assert_eq!(
            decrypt_aes_gcm(b"x", &secret, &[0u8; 8]),
            Err(CryptoError::InvalidIvSize)
        );
    }

    #[test]
    fn test_clear() {
        let mut secret = Secret::from([7u8; SECRET_SIZE]);
        secret.clear();
        assert_eq!(secret.bytes(), &[0u8; SECRET_SIZE]);

        let mut buff = vec![9u8; 5];
        clear_bytes(&mut buff);
        assert_eq!(buff, vec![0u8; 5]);
    }
}
