//! Per-device identities and the approval handshake
//!
//! A device identity is an Ed25519 keypair generated once per device and
//! persisted locally. It never derives content keys; it only authenticates
//! registry entries and approval requests.
//!
//! Approving a new device:
//! 1. the new device creates an [`ApprovalRequest`] carrying a one-off
//!    secp256k1 public key, signed with its device identity
//! 2. an already-authorized device checks the request and wraps the root
//!    identity to that one-off key
//! 3. the new device unwraps it with the one-off secret

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{PublicKey, RootPublicKey, RootSecretKey, SecretKey, WrappedKey};
use crate::error::CryptoError;
use crate::metadata::{AuthStatus, DeviceEntry};

const APPROVAL_DOMAIN: &[u8] = b"sealvault-device-approval-v1:";

/// hex(SHA-256(public key)), the identifier of a device
pub fn device_id_for(key: &PublicKey) -> String {
    hex::encode(Sha256::digest(key.to_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    key: SecretKey,
    id: String,
}

impl From<SecretKey> for DeviceIdentity {
    fn from(key: SecretKey) -> Self {
        let id = device_id_for(&key.public());
        Self { key, id }
    }
}

impl DeviceIdentity {
    pub fn generate() -> Self {
        Self::from(SecretKey::generate())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public(&self) -> PublicKey {
        self.key.public()
    }

    pub fn to_pem(&self) -> String {
        self.key.to_pem()
    }

    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        SecretKey::from_pem(pem).map(Self::from)
    }

    /// Read a PEM-encoded identity from disk
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_pem())
    }

    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        self.key.sign(msg)
    }

    /// A pending registry entry describing this device
    pub fn entry(&self, name: &str, platform: &str, app_version: &str, now: i64) -> DeviceEntry {
        DeviceEntry {
            device_id: self.id.clone(),
            public_key: self.public().to_hex(),
            name: name.to_string(),
            platform: platform.to_string(),
            app_version: app_version.to_string(),
            status: AuthStatus::Pending,
            last_seen: now,
        }
    }

    /// Ask an authorized device for the root identity
    ///
    /// Returns the request to publish and the one-off secret that will
    /// unwrap the answer. The caller clears the secret after use.
    pub fn request_approval(&self) -> (ApprovalRequest, RootSecretKey) {
        let ephemeral = RootSecretKey::generate();
        let ephemeral_public = ephemeral.public().to_hex();
        let signature = self.sign(&approval_message(&self.id, &ephemeral_public));
        let request = ApprovalRequest {
            device_id: self.id.clone(),
            public_key: self.public().to_hex(),
            ephemeral_public,
            signature: hex::encode(signature),
        };
        (request, ephemeral)
    }
}

fn approval_message(device_id: &str, ephemeral_public: &str) -> Vec<u8> {
    [APPROVAL_DOMAIN, device_id.as_bytes(), b":", ephemeral_public.as_bytes()].concat()
}

/// A new device's request to receive the root identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub device_id: String,
    pub public_key: String,
    pub ephemeral_public: String,
    pub signature: String,
}

impl ApprovalRequest {
    /// Check the device id, the signature and the one-off key
    ///
    /// # Errors
    ///
    /// [`CryptoError::VerificationFailed`] for any mismatch.
    pub fn verify(&self) -> Result<RootPublicKey, CryptoError> {
        let key =
            PublicKey::from_hex(&self.public_key).map_err(|_| CryptoError::VerificationFailed)?;
        if device_id_for(&key) != self.device_id {
            return Err(CryptoError::VerificationFailed);
        }
        let signature =
            hex::decode(&self.signature).map_err(|_| CryptoError::VerificationFailed)?;
        key.verify(&approval_message(&self.device_id, &self.ephemeral_public), &signature)?;
        RootPublicKey::from_hex(&self.ephemeral_public).map_err(|_| CryptoError::VerificationFailed)
    }

    /// Wrap the root identity for the requesting device
    pub fn approve(&self, root: &RootSecretKey) -> Result<WrappedKey, CryptoError> {
        let recipient = self.verify()?;
        tracing::debug!(device_id = %self.device_id, "approving device");
        WrappedKey::wrap(root.to_bytes().as_slice(), &recipient)
    }
}

/// Recover the root identity from an approval answer
pub fn accept_approval(
    answer: &WrappedKey,
    ephemeral: &RootSecretKey,
) -> Result<RootSecretKey, CryptoError> {
    let bytes = answer.unwrap(ephemeral)?;
    RootSecretKey::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_is_hash_of_key() {
        let identity = DeviceIdentity::generate();
        assert_eq!(identity.id().len(), 64);
        assert_eq!(identity.id(), device_id_for(&identity.public()));
        assert_ne!(identity.id(), DeviceIdentity::generate().id());
    }

    #[test]
    fn test_pem_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.pem");
        let identity = DeviceIdentity::generate();
        identity.save(&path).unwrap();

        let loaded = DeviceIdentity::load(&path).unwrap();
        assert_eq!(loaded, identity);
        assert_eq!(loaded.id(), identity.id());

        std::fs::write(&path, "garbage").unwrap();
        assert!(DeviceIdentity::load(&path).is_err());
    }

    #[test]
    fn test_approval_handshake() {
        let root = RootSecretKey::generate();
        let new_device = DeviceIdentity::generate();

        let (request, mut ephemeral) = new_device.request_approval();
        let answer = request.approve(&root).unwrap();
        let recovered = accept_approval(&answer, &ephemeral).unwrap();
        assert_eq!(recovered.public(), root.public());
        ephemeral.clear();
    }

    #[test]
    fn test_tampered_request_rejected() {
        let root = RootSecretKey::generate();
        let (mut request, _) = DeviceIdentity::generate().request_approval();
        // swap in an attacker's one-off key
        request.ephemeral_public = RootSecretKey::generate().public().to_hex();
        assert_eq!(
            request.approve(&root).unwrap_err(),
            CryptoError::VerificationFailed
        );

        let (mut request, _) = DeviceIdentity::generate().request_approval();
        request.device_id = DeviceIdentity::generate().id().to_string();
        assert!(request.verify().is_err());
    }
}
