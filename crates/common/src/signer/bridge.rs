//! Rate-limited derivation of a root identity from a wallet signature

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::signature::RecoverableSignature;
use alloy::primitives::Address;

use super::typed_data::KeyDerivationMessage;
use super::ExternalSigner;
use crate::config::CoreConfig;
use crate::crypto::kdf::{derive, HKDF_SALT, SIGNER_BRIDGE_INFO};
use crate::crypto::{RootPublicKey, RootSecretKey, ROOT_SECRET_SIZE};
use crate::error::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("external signer error: {0}")]
    Signer(#[source] E),
}

/// Turns one deterministic external signature into a root identity
///
/// Holds its own cooldown state: a request issued before `min_interval`
/// has passed since the previous one is refused with
/// [`CryptoError::RateLimited`] without prompting the signer.
#[derive(Debug)]
pub struct SignerBridge {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl SignerBridge {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.signer_interval())
    }

    fn claim_slot(&self) -> Result<(), CryptoError> {
        let now = Instant::now();
        let mut last = self.last_request.lock();
        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_interval {
                tracing::debug!(
                    remaining_ms = (self.min_interval - elapsed).as_millis() as u64,
                    "signer request rate limited"
                );
                return Err(CryptoError::RateLimited);
            }
        }
        *last = Some(now);
        Ok(())
    }

    /// Ask `signer` for its structured signature and derive the keypair
    ///
    /// The signature must be well-formed and recover to the signer's own
    /// account; it is normalized to low-S before derivation so either
    /// representation a signer returns yields the same key.
    pub async fn derive<S>(&self, signer: &S) -> Result<BridgeSession, BridgeError<S::Error>>
    where
        S: ExternalSigner,
    {
        self.claim_slot()?;
        let account = signer.address();
        let message = KeyDerivationMessage::new(account);
        tracing::debug!(%account, "requesting key derivation signature");

        let bytes = signer
            .sign_typed_data(&message)
            .await
            .map_err(BridgeError::Signer)?;
        let key = derive_from_signature(&message, &bytes)?;
        Ok(BridgeSession { account, key })
    }
}

/// Derive the root identity from a signature over `message`
///
/// # Errors
///
/// [`CryptoError::VerificationFailed`] if the signature is malformed or was
/// not made by `message.account`, [`CryptoError::DerivedKeyOutOfRange`] in
/// the negligible case that the derived bytes are not a valid scalar.
pub fn derive_from_signature(
    message: &KeyDerivationMessage,
    signature: &[u8],
) -> Result<RootSecretKey, CryptoError> {
    let signature = RecoverableSignature::parse(signature)?;
    signature.verify(message)?;

    let seed = derive(&signature.rs_bytes(), HKDF_SALT, SIGNER_BRIDGE_INFO, ROOT_SECRET_SIZE)?;
    RootSecretKey::from_slice(&seed)
}

/// A derived root identity held for the duration of a session
#[derive(Debug)]
pub struct BridgeSession {
    account: Address,
    key: RootSecretKey,
}

impl BridgeSession {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn public(&self) -> RootPublicKey {
        self.key.public()
    }

    pub fn secret(&self) -> &RootSecretKey {
        &self.key
    }

    /// Overwrite the derived key on logout
    pub fn clear(&mut self) {
        self.key.clear();
    }
}
