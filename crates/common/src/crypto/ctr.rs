//! AES-256-CTR for seekable media
//!
//! The 16-byte IV is split in two: the first 8 bytes are a fixed nonce, the
//! last 8 bytes a big-endian block counter that wraps within those 64 bits.
//! Counter mode carries no authentication tag; the file's integrity comes
//! from its content identifier.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};

use super::secret::Secret;
use crate::error::CryptoError;

type Aes256Ctr = ctr::Ctr64BE<Aes256>;

/// Size of the counter-mode IV in bytes
pub const CTR_IV_SIZE: usize = 16;
/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

fn apply_keystream(data: &mut [u8], key: &Secret, iv: &[u8]) -> Result<(), CryptoError> {
    let mut cipher =
        Aes256Ctr::new_from_slices(key.bytes(), iv).map_err(|_| CryptoError::InvalidIvSize)?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypt `plaintext` in counter mode
pub fn encrypt_ctr(plaintext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != CTR_IV_SIZE {
        return Err(CryptoError::InvalidIvSize);
    }
    let mut out = plaintext.to_vec();
    apply_keystream(&mut out, key, iv).map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(out)
}

/// Decrypt a whole counter-mode ciphertext
pub fn decrypt_ctr(ciphertext: &[u8], key: &Secret, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != CTR_IV_SIZE {
        return Err(CryptoError::InvalidIvSize);
    }
    let mut out = ciphertext.to_vec();
    apply_keystream(&mut out, key, iv).map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(out)
}

/// IV whose counter half has advanced by `blocks`
fn offset_iv(iv: &[u8], blocks: u64) -> [u8; CTR_IV_SIZE] {
    let mut out = [0u8; CTR_IV_SIZE];
    out.copy_from_slice(iv);
    let mut counter = [0u8; 8];
    counter.copy_from_slice(&iv[8..]);
    let counter = u64::from_be_bytes(counter).wrapping_add(blocks);
    out[8..].copy_from_slice(&counter.to_be_bytes());
    out
}

/// Decrypt the inclusive byte range `[start, end]` of a counter-mode ciphertext
///
/// Only the block-aligned span covering the range is processed, so the cost
/// does not depend on how far into the file the range starts.
///
/// # Errors
///
/// [`CryptoError::InvalidIvSize`] for a malformed IV and
/// [`CryptoError::DecryptionFailed`] when the range is empty or falls outside
/// the ciphertext.
pub fn decrypt_ctr_range(
    ciphertext: &[u8],
    key: &Secret,
    iv: &[u8],
    start: usize,
    end: usize,
) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != CTR_IV_SIZE {
        return Err(CryptoError::InvalidIvSize);
    }
    if start > end || end >= ciphertext.len() {
        return Err(CryptoError::DecryptionFailed);
    }

    let first_block = start / BLOCK_SIZE;
    let aligned_start = first_block * BLOCK_SIZE;
    let aligned_end = ((end / BLOCK_SIZE) + 1) * BLOCK_SIZE;
    let span_end = aligned_end.min(ciphertext.len());

    let mut span = ciphertext[aligned_start..span_end].to_vec();
    let iv = offset_iv(iv, first_block as u64);
    apply_keystream(&mut span, key, &iv).map_err(|_| CryptoError::DecryptionFailed)?;

    let offset = start - aligned_start;
    Ok(span[offset..=offset + (end - start)].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixture(len: usize) -> (Secret, [u8; CTR_IV_SIZE], Vec<u8>, Vec<u8>) {
        let key = Secret::generate();
        let mut iv = [0u8; CTR_IV_SIZE];
        getrandom::getrandom(&mut iv).unwrap();
        let plaintext: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let ciphertext = encrypt_ctr(&plaintext, &key, &iv).unwrap();
        (key, iv, plaintext, ciphertext)
    }

    #[test]
    fn test_ctr_roundtrip() {
        let (key, iv, plaintext, ciphertext) = fixture(1000);
        assert_ne!(plaintext, ciphertext);
        assert_eq!(decrypt_ctr(&ciphertext, &key, &iv).unwrap(), plaintext);
    }

    #[test]
    fn test_range_within_single_block() {
        let (key, iv, plaintext, ciphertext) = fixture(64);
        let range = decrypt_ctr_range(&ciphertext, &key, &iv, 17, 20).unwrap();
        assert_eq!(range, plaintext[17..=20]);
    }

    #[test]
    fn test_range_last_byte() {
        let (key, iv, plaintext, ciphertext) = fixture(33);
        let range = decrypt_ctr_range(&ciphertext, &key, &iv, 32, 32).unwrap();
        assert_eq!(range, vec![plaintext[32]]);
    }

    #[test]
    fn test_counter_wraps_within_low_half() {
        let key = Secret::generate();
        let mut iv = [0xAAu8; CTR_IV_SIZE];
        iv[8..].copy_from_slice(&u64::MAX.to_be_bytes());
        let plaintext = vec![5u8; 80];
        let ciphertext = encrypt_ctr(&plaintext, &key, &iv).unwrap();

        let range = decrypt_ctr_range(&ciphertext, &key, &iv, 40, 79).unwrap();
        assert_eq!(range, plaintext[40..80]);
        assert_eq!(offset_iv(&iv, 1)[..8], iv[..8]);
        assert_eq!(offset_iv(&iv, 1)[8..], [0u8; 8]);
    }

    #[test]
    fn test_range_out_of_bounds() {
        let (key, iv, _, ciphertext) = fixture(32);
        assert_eq!(
            decrypt_ctr_range(&ciphertext, &key, &iv, 10, 32),
            Err(CryptoError::DecryptionFailed)
        );
        assert_eq!(
            decrypt_ctr_range(&ciphertext, &key, &iv, 5, 4),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_bad_iv_size() {
        let key = Secret::generate();
        assert_eq!(
            encrypt_ctr(b"data", &key, &[0u8; 12]),
            Err(CryptoError::InvalidIvSize)
        );
    }

    proptest! {
        #[test]
        fn range_decrypt_matches_full_decrypt(
            len in 1usize..600,
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let (key, iv, _, ciphertext) = fixture(len);
            let (x, y) = (a.index(len), b.index(len));
            let (start, end) = (x.min(y), x.max(y));

            let full = decrypt_ctr(&ciphertext, &key, &iv).unwrap();
            let range = decrypt_ctr_range(&ciphertext, &key, &iv, start, end).unwrap();
            prop_assert_eq!(&range[..], &full[start..=end]);
        }
    }
}
