use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{check_hex_len, invalid, Document};
use crate::crypto::PublicKey;
use crate::device::device_id_for;
use crate::error::CryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Pending,
    Authorized,
    Revoked,
}

/// One device known to the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    /// hex(SHA-256(public key))
    pub device_id: String,
    /// Hex Ed25519 public key of the device identity
    pub public_key: String,
    pub name: String,
    pub platform: String,
    pub app_version: String,
    pub status: AuthStatus,
    pub last_seen: i64,
}

impl DeviceEntry {
    fn validate(&self) -> Result<(), CryptoError> {
        check_hex_len(&self.device_id, 32, "device id length")?;
        let key = PublicKey::from_hex(&self.public_key).map_err(|_| invalid("device public key"))?;
        if device_id_for(&key) != self.device_id {
            return Err(invalid("device id does not match key"));
        }
        if self.name.is_empty() {
            return Err(invalid("empty device name"));
        }
        Ok(())
    }
}

/// Versioned device registry document
///
/// Encrypted under a key derived from the root identity and published
/// under the derived registry naming address, so any device holding the
/// root identity can find and read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum DeviceRegistry {
    #[serde(rename = "v1")]
    V1 { devices: Vec<DeviceEntry> },
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry::V1 { devices: vec![] }
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        match self {
            DeviceRegistry::V1 { devices } => devices,
        }
    }

    fn devices_mut(&mut self) -> &mut Vec<DeviceEntry> {
        match self {
            DeviceRegistry::V1 { devices } => devices,
        }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceEntry> {
        self.devices().iter().find(|d| d.device_id == device_id)
    }

    /// Insert a device, or replace the entry with the same id
    pub fn register(&mut self, entry: DeviceEntry) {
        let devices = self.devices_mut();
        match devices.iter_mut().find(|d| d.device_id == entry.device_id) {
            Some(existing) => *existing = entry,
            None => devices.push(entry),
        }
    }

    fn set_status(&mut self, device_id: &str, status: AuthStatus) -> bool {
        match self.devices_mut().iter_mut().find(|d| d.device_id == device_id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn authorize(&mut self, device_id: &str) -> bool {
        self.set_status(device_id, AuthStatus::Authorized)
    }

    pub fn revoke(&mut self, device_id: &str) -> bool {
        self.set_status(device_id, AuthStatus::Revoked)
    }

    /// Update a device's last-seen timestamp, never moving it backwards
    pub fn touch(&mut self, device_id: &str, at: i64) -> bool {
        match self.devices_mut().iter_mut().find(|d| d.device_id == device_id) {
            Some(entry) => {
                entry.last_seen = entry.last_seen.max(at);
                true
            }
            None => false,
        }
    }

    pub fn authorized(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices()
            .iter()
            .filter(|d| d.status == AuthStatus::Authorized)
    }
}

impl Document for DeviceRegistry {
    fn validate(&self) -> Result<(), CryptoError> {
        let mut seen = HashSet::new();
        for device in self.devices() {
            device.validate()?;
            if !seen.insert(device.device_id.as_str()) {
                return Err(invalid("duplicate device id"));
            }
        }
        Ok(())
    }
}
