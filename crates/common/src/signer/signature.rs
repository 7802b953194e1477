//! Parsing, low-S normalization and account recovery for 65-byte
//! `r || s || v` secp256k1 signatures

use alloy::primitives::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use super::typed_data::{account_address, KeyDerivationMessage};
use crate::error::CryptoError;

/// Length of an `r || s || v` signature
pub const SIGNATURE_SIZE: usize = 65;

/// A well-formed `r || s || v` signature in canonical low-S form
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    signature: Signature,
    recovery: RecoveryId,
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverableSignature")
            .field("recovery", &self.recovery.to_byte())
            .finish_non_exhaustive()
    }
}

fn parity(v: u8) -> Option<u8> {
    match v {
        0 | 1 => Some(v),
        27 | 28 => Some(v - 27),
        _ => None,
    }
}

impl RecoverableSignature {
    /// Parse and normalize 65 signature bytes
    ///
    /// Scalars must be in range and `v` one of 0, 1, 27, 28. A high-S
    /// signature is replaced by its low-S twin with the recovery parity
    /// flipped, so both representations parse to the same value.
    pub fn parse(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(CryptoError::VerificationFailed);
        }
        let signature =
            Signature::from_slice(&bytes[..64]).map_err(|_| CryptoError::VerificationFailed)?;
        let mut parity = parity(bytes[64]).ok_or(CryptoError::VerificationFailed)?;

        let signature = match signature.normalize_s() {
            Some(low) => {
                parity ^= 1;
                low
            }
            None => signature,
        };
        let recovery = RecoveryId::from_byte(parity).ok_or(CryptoError::VerificationFailed)?;
        Ok(Self {
            signature,
            recovery,
        })
    }

    /// `r || s`, the input to key derivation
    pub fn rs_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.signature.to_bytes());
        out
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery.to_byte()
    }

    /// The signer's address, recovered from a prehashed message
    pub fn recover(&self, prehash: &[u8; 32]) -> Result<Address, CryptoError> {
        let key = VerifyingKey::recover_from_prehash(prehash, &self.signature, self.recovery)
            .map_err(|_| CryptoError::VerificationFailed)?;
        Ok(account_address(&key))
    }

    /// Check that this signature over `message` was made by its account
    pub fn verify(&self, message: &KeyDerivationMessage) -> Result<(), CryptoError> {
        if self.recover(&message.signing_hash())? != message.account {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(())
    }
}

/// Canonicalize 65 signature bytes to low-S
///
/// Idempotent, and keeps the caller's `v` convention (0/1 or 27/28).
pub fn normalize_signature(bytes: &[u8]) -> Result<[u8; SIGNATURE_SIZE], CryptoError> {
    let parsed = RecoverableSignature::parse(bytes)?;
    let offset = if bytes[64] >= 27 { 27 } else { 0 };
    let mut out = [0u8; SIGNATURE_SIZE];
    out[..64].copy_from_slice(&parsed.rs_bytes());
    out[64] = parsed.recovery_id() + offset;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RootSecretKey;
    use k256::ecdsa::SigningKey;

    fn random_key() -> SigningKey {
        SigningKey::from(RootSecretKey::generate().inner())
    }

    fn sign(key: &SigningKey, prehash: &[u8; 32]) -> [u8; 65] {
        let (signature, recovery) = key.sign_prehash_recoverable(prehash).unwrap();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery.to_byte() + 27;
        out
    }

    fn high_s_twin(bytes: &[u8; 65]) -> [u8; 65] {
        let signature = Signature::from_slice(&bytes[..64]).unwrap();
        let (r, s) = signature.split_scalars();
        let high = Signature::from_scalars(r.to_bytes(), (-*s).to_bytes()).unwrap();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&high.to_bytes());
        out[64] = bytes[64] ^ 1;
        out
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let key = random_key();
        let low = sign(&key, &[7u8; 32]);

        assert_eq!(normalize_signature(&low).unwrap(), low);
        let high = high_s_twin(&low);
        assert_ne!(high, low);
        assert_eq!(normalize_signature(&high).unwrap(), low);
        assert_eq!(normalize_signature(&normalize_signature(&high).unwrap()).unwrap(), low);
    }

    #[test]
    fn test_v_conventions_accepted() {
        let key = random_key();
        let mut sig = sign(&key, &[1u8; 32]);
        let a = RecoverableSignature::parse(&sig).unwrap();
        sig[64] -= 27;
        let b = RecoverableSignature::parse(&sig).unwrap();
        assert_eq!(a, b);
        assert_eq!(normalize_signature(&sig).unwrap()[64], sig[64]);

        sig[64] = 2;
        assert!(RecoverableSignature::parse(&sig).is_err());
        sig[64] = 29;
        assert!(RecoverableSignature::parse(&sig).is_err());
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(RecoverableSignature::parse(&[0u8; 64]).is_err());
        assert!(RecoverableSignature::parse(&[0u8; 65]).is_err());
        assert!(RecoverableSignature::parse(&[0xFFu8; 65]).is_err());
    }

    #[test]
    fn test_recovers_both_representations_to_signer() {
        let key = random_key();
        let account = account_address(key.verifying_key());
        let message = KeyDerivationMessage::new(account);
        let low = sign(&key, &message.signing_hash());

        RecoverableSignature::parse(&low).unwrap().verify(&message).unwrap();
        RecoverableSignature::parse(&high_s_twin(&low))
            .unwrap()
            .verify(&message)
            .unwrap();

        let other = KeyDerivationMessage::new(account_address(
            random_key().verifying_key(),
        ));
        assert_eq!(
            RecoverableSignature::parse(&low).unwrap().verify(&other).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }
}
