use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use alloy::primitives::Address;

use super::typed_data::{account_address, KeyDerivationMessage};
use super::ExternalSigner;
use crate::crypto::RootSecretKey;
use crate::error::CryptoError;

/// An in-process signer over a secp256k1 secret
///
/// Behaves like a wallet that signs without prompting, for command line
/// tooling and tests. Signatures use the 27/28 `v` convention.
pub struct LocalSigner {
    key: SigningKey,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address())
            .finish()
    }
}

impl From<&RootSecretKey> for LocalSigner {
    fn from(key: &RootSecretKey) -> Self {
        Self {
            key: SigningKey::from(key.inner()),
        }
    }
}

#[async_trait]
impl ExternalSigner for LocalSigner {
    type Error = CryptoError;

    fn address(&self) -> Address {
        account_address(self.key.verifying_key())
    }

    async fn sign_typed_data(&self, message: &KeyDerivationMessage) -> Result<Vec<u8>, CryptoError> {
        let (signature, recovery) = self
            .key
            .sign_prehash_recoverable(&message.signing_hash())
            .map_err(|_| CryptoError::SigningFailed)?;
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery.to_byte() + 27);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::RecoverableSignature;

    #[tokio::test]
    async fn test_signature_recovers_to_own_address() {
        let signer = LocalSigner::from(&RootSecretKey::generate());
        let message = KeyDerivationMessage::new(signer.address());
        let bytes = signer.sign_typed_data(&message).await.unwrap();
        assert_eq!(bytes.len(), 65);
        assert!(bytes[64] == 27 || bytes[64] == 28);
        RecoverableSignature::parse(&bytes)
            .unwrap()
            .verify(&message)
            .unwrap();
    }
}
