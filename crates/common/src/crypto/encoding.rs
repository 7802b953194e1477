//! Textual encodings for byte sequences embedded in documents

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;

/// Default number of input bytes encoded per base64 chunk
pub const DEFAULT_BASE64_CHUNK: usize = 32_768;

/// Base64-encode `bytes`, `chunk_size` input bytes at a time
///
/// Chunks are multiples of three bytes, so the concatenated output is
/// identical to a single-shot encoding; chunking only bounds the size of
/// each individual encoder call.
///
/// # Errors
///
/// [`CryptoError::InvalidMetadataFormat`] if `chunk_size` is zero or not a
/// multiple of three.
pub fn to_base64_chunked(bytes: &[u8], chunk_size: usize) -> Result<String, CryptoError> {
    if chunk_size == 0 || chunk_size % 3 != 0 {
        return Err(CryptoError::InvalidMetadataFormat);
    }
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(chunk_size) {
        STANDARD.encode_string(chunk, &mut out);
    }
    Ok(out)
}

/// Base64-encode with the default chunk size
pub fn to_base64(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(DEFAULT_BASE64_CHUNK) {
        STANDARD.encode_string(chunk, &mut out);
    }
    out
}

/// Decode standard, padded base64
pub fn from_base64(text: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(text)
        .map_err(|_| CryptoError::InvalidMetadataFormat)
}

/// Lower-case hex
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex, accepting an optional "0x" prefix
pub fn from_hex(text: &str) -> Result<Vec<u8>, CryptoError> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(text).map_err(|_| CryptoError::InvalidMetadataFormat)
}
