//! Naming addresses: CIDv1 with the libp2p-key codec over an identity
//! multihash of the protobuf-encoded Ed25519 public key, printed in base36

use std::fmt;
use std::str::FromStr;

use cid::multibase::Base;
use cid::{Cid, Version};
use multihash::Multihash;
use prost::Message;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::proto::{PublicKeyEntry, KEY_TYPE_ED25519};
use crate::crypto::PublicKey;
use crate::error::CryptoError;

/// Multicodec for libp2p public keys
pub const LIBP2P_KEY_CODEC: u64 = 0x72;
/// Multihash code for the identity "hash"
pub const IDENTITY_HASH_CODE: u64 = 0x00;

/// The publish/resolve address of a naming keypair
///
/// A CIDv1 (`libp2p-key` codec) whose identity multihash inlines the
/// protobuf-encoded public key, rendered in base36. It is a pure function of
/// the public key and can be turned back into one without any lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamingAddress(Cid);

pub(crate) fn encode_public_key(key: &PublicKey) -> Vec<u8> {
    PublicKeyEntry {
        key_type: KEY_TYPE_ED25519,
        data: key.to_bytes().to_vec(),
    }
    .encode_to_vec()
}

pub(crate) fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let entry = PublicKeyEntry::decode(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
    if entry.key_type != KEY_TYPE_ED25519 {
        return Err(CryptoError::InvalidPublicKey);
    }
    PublicKey::try_from(entry.data.as_slice())
}

impl NamingAddress {
    /// Compute the address of a naming public key
    pub fn from_public_key(key: &PublicKey) -> Self {
        // 36 bytes always fit in a 64-byte multihash
        let hash = Multihash::<64>::wrap(IDENTITY_HASH_CODE, &encode_public_key(key))
            .expect("encoded ed25519 key fits in identity multihash");
        Self(Cid::new_v1(LIBP2P_KEY_CODEC, hash))
    }

    /// Recover the public key inlined in the address
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let hash = self.0.hash();
        if hash.code() != IDENTITY_HASH_CODE {
            return Err(CryptoError::InvalidPublicKey);
        }
        decode_public_key(hash.digest())
    }

    /// The underlying content identifier
    pub fn cid(&self) -> &Cid {
        &self.0
    }
}

impl fmt::Display for NamingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.to_string_of_base(Base::Base36Lower).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for NamingAddress {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("/ipns/").unwrap_or(s);
        let cid = Cid::try_from(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        if cid.version() != Version::V1 || cid.codec() != LIBP2P_KEY_CODEC {
            return Err(CryptoError::InvalidPublicKey);
        }
        let address = Self(cid);
        address.public_key()?;
        Ok(address)
    }
}

impl From<&PublicKey> for NamingAddress {
    fn from(key: &PublicKey) -> Self {
        Self::from_public_key(key)
    }
}

impl Serialize for NamingAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NamingAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_address_is_pure_function_of_key() {
        let key = SecretKey::generate().public();
        assert_eq!(
            NamingAddress::from_public_key(&key),
            NamingAddress::from_public_key(&key)
        );
        assert_ne!(
            NamingAddress::from_public_key(&key),
            NamingAddress::from_public_key(&SecretKey::generate().public())
        );
    }

    #[test]
    fn test_address_string_roundtrip() {
        let key = SecretKey::generate().public();
        let address = NamingAddress::from_public_key(&key);
        let text = address.to_string();

        assert!(text.starts_with("k51"));
        let parsed: NamingAddress = text.parse().unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.public_key().unwrap(), key);

        let with_prefix: NamingAddress = format!("/ipns/{}", text).parse().unwrap();
        assert_eq!(with_prefix, address);
    }

    #[test]
    fn test_rejects_non_key_cids() {
        let hash = Multihash::<64>::wrap(IDENTITY_HASH_CODE, b"not a key").unwrap();
        let raw = Cid::new_v1(0x55, hash).to_string();
        assert!(raw.parse::<NamingAddress>().is_err());
        assert!("not-a-cid".parse::<NamingAddress>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let address = NamingAddress::from_public_key(&SecretKey::generate().public());
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address));
        let parsed: NamingAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, address);
    }
}
