//! The EIP-712 message a wallet signs to derive the root identity
//!
//! Hashing follows EIP-712 through `alloy`'s `sol!` struct encoding, with a
//! domain of name and version only. Accounts are `alloy` addresses and are
//! encoded as the EIP-712 `address` type.

use alloy::primitives::Address;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde_json::json;

pub const DOMAIN_NAME: &str = "SealVault";
pub const DOMAIN_VERSION: &str = "1";
pub const PURPOSE: &str = "Derive SealVault encryption key";
pub const MESSAGE_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "KeyDerivation";

alloy::sol! {
    struct KeyDerivation {
        address account;
        string purpose;
        string version;
    }
}

/// Account address of a secp256k1 key: the last 20 bytes of the keccak-256
/// hash of its uncompressed point
pub fn account_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_raw_public_key(&point.as_bytes()[1..])
}

fn domain() -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
    }
}

/// The structured message an external signer is asked to sign
///
/// Only the account, a static purpose and a format version: no nonce or
/// timestamp, so the same signer reproduces the same signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDerivationMessage {
    pub account: Address,
    pub purpose: String,
    pub version: String,
}

impl KeyDerivationMessage {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            purpose: PURPOSE.to_string(),
            version: MESSAGE_VERSION.to_string(),
        }
    }

    fn as_sol(&self) -> KeyDerivation {
        KeyDerivation {
            account: self.account,
            purpose: self.purpose.clone(),
            version: self.version.clone(),
        }
    }

    /// The 32-byte digest a conforming signer signs:
    /// `keccak256(0x19 0x01 || domainSeparator || hashStruct(message))`
    pub fn signing_hash(&self) -> [u8; 32] {
        self.as_sol().eip712_signing_hash(&domain()).0
    }

    /// Typed-data JSON as handed to a wallet's structured-signing call
    pub fn to_typed_data(&self) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                ],
                PRIMARY_TYPE: [
                    { "name": "account", "type": "address" },
                    { "name": "purpose", "type": "string" },
                    { "name": "version", "type": "string" },
                ],
            },
            "primaryType": PRIMARY_TYPE,
            "domain": { "name": DOMAIN_NAME, "version": DOMAIN_VERSION },
            "message": {
                "account": self.account.to_checksum(None),
                "purpose": self.purpose,
                "version": self.version,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    const GENERATOR: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    #[test]
    fn test_account_is_address_typed() {
        assert_eq!(
            KeyDerivation::eip712_encode_type(),
            "KeyDerivation(address account,string purpose,string version)"
        );
    }

    // private key 1 maps to the well-known generator-point address
    #[test]
    fn test_address_of_generator() {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let key = k256::ecdsa::SigningKey::from_slice(&bytes).unwrap();
        let address = account_address(key.verifying_key());
        assert_eq!(address.to_string(), GENERATOR);
        assert_eq!(address, GENERATOR.to_lowercase().parse::<Address>().unwrap());
    }

    #[test]
    fn test_signing_hash_matches_manual_encoding() {
        let account: Address = GENERATOR.parse().unwrap();
        let message = KeyDerivationMessage::new(account);

        let domain_separator = keccak256(
            [
                keccak256("EIP712Domain(string name,string version)").as_slice(),
                keccak256(DOMAIN_NAME).as_slice(),
                keccak256(DOMAIN_VERSION).as_slice(),
            ]
            .concat(),
        );
        let mut padded = [0u8; 32];
        padded[12..].copy_from_slice(account.as_slice());
        let struct_hash = keccak256(
            [
                keccak256("KeyDerivation(address account,string purpose,string version)").as_slice(),
                padded.as_slice(),
                keccak256(PURPOSE).as_slice(),
                keccak256(MESSAGE_VERSION).as_slice(),
            ]
            .concat(),
        );
        let expected = keccak256(
            [&[0x19u8, 0x01][..], domain_separator.as_slice(), struct_hash.as_slice()].concat(),
        );
        assert_eq!(message.signing_hash(), expected.0);
    }

    #[test]
    fn test_signing_hash_is_deterministic_and_account_bound() {
        let a: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
        let b: Address = "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf".parse().unwrap();
        let message = KeyDerivationMessage::new(a);
        assert_eq!(message.signing_hash(), KeyDerivationMessage::new(a).signing_hash());
        assert_ne!(message.signing_hash(), KeyDerivationMessage::new(b).signing_hash());
    }

    #[test]
    fn test_typed_data_shape() {
        let account: Address = GENERATOR.parse().unwrap();
        let typed = KeyDerivationMessage::new(account).to_typed_data();
        assert_eq!(typed["primaryType"], PRIMARY_TYPE);
        assert_eq!(typed["domain"]["name"], DOMAIN_NAME);
        assert_eq!(typed["message"]["account"], GENERATOR);
        assert_eq!(typed["message"]["version"], MESSAGE_VERSION);
        assert_eq!(typed["types"][PRIMARY_TYPE][0]["type"], "address");
        assert_eq!(typed["types"][PRIMARY_TYPE].as_array().unwrap().len(), 3);
    }
}
