//! Protobuf wire types for naming records and their embedded keys

/// Key type tag for Ed25519 in the embedded public key message
pub(crate) const KEY_TYPE_ED25519: i32 = 1;
/// Validity type "end of life": the record expires at `validity`
pub(crate) const VALIDITY_EOL: i32 = 0;

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct RecordEntry {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub value: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature_v1: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "3")]
    pub validity_type: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub validity: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "5")]
    pub sequence: Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub ttl: Option<u64>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub pub_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "8")]
    pub signature_v2: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "9")]
    pub data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PublicKeyEntry {
    #[prost(int32, tag = "1")]
    pub key_type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}
