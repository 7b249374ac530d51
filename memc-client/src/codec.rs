//! # Value Codecs
//!
//! Purpose: Transform values on their way to and from the connection
//! engine. Two layers compose here:
//!
//! - The **structured layer** serializes typed values with `serde_json` and
//!   marks the payload with the reserved `FLAG_SERIALIZED` bit, so decoding
//!   can distinguish serialized payloads from opaque bytes.
//! - The **byte-transform layer** (`Codec`) is pluggable per client and sees
//!   every set/get payload; the default is a passthrough. Compression and
//!   encryption shaped transforms belong here.
//!
//! Append and prepend move raw bytes and bypass both layers.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use memc_common::FLAG_SERIALIZED;

use crate::error::{ClientError, ClientResult};

/// Byte-level transform applied to stored payloads.
///
/// `encode` may rewrite the payload and raise flag bits; `decode` receives
/// the stored flags and must reverse the transform exactly.
pub trait Codec: Send + Sync {
    fn encode(&self, key: &[u8], value: Bytes, flags: u32) -> ClientResult<(Bytes, u32)>;
    fn decode(&self, key: &[u8], payload: Bytes, flags: u32) -> ClientResult<Bytes>;
}

/// The default passthrough codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, _key: &[u8], value: Bytes, flags: u32) -> ClientResult<(Bytes, u32)> {
        Ok((value, flags))
    }

    fn decode(&self, _key: &[u8], payload: Bytes, _flags: u32) -> ClientResult<Bytes> {
        Ok(payload)
    }
}

/// Serializes a typed value, marking the payload as structured.
pub fn serialize_value<T: Serialize>(value: &T, flags: u32) -> ClientResult<(Bytes, u32)> {
    let body = serde_json::to_vec(value).map_err(|err| ClientError::Codec(err.to_string()))?;
    Ok((Bytes::from(body), flags | FLAG_SERIALIZED))
}

/// Deserializes a payload previously produced by `serialize_value`.
///
/// Payloads without the serialized flag are opaque bytes and cannot be
/// decoded on the typed path.
pub fn deserialize_value<T: DeserializeOwned>(payload: &[u8], flags: u32) -> ClientResult<T> {
    if flags & FLAG_SERIALIZED == 0 {
        return Err(ClientError::Codec(
            "payload was not produced by the serialization codec".to_string(),
        ));
    }
    serde_json::from_slice(payload).map_err(|err| ClientError::Codec(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_sets_the_reserved_flag() {
        let (payload, flags) = serialize_value(&vec![1u32, 2, 3], 0).unwrap();
        assert_ne!(flags & FLAG_SERIALIZED, 0);
        let back: Vec<u32> = deserialize_value(&payload, flags).unwrap();
        assert_eq!(back, [1, 2, 3]);
    }

    #[test]
    fn unflagged_payloads_are_rejected_on_the_typed_path() {
        let err = deserialize_value::<String>(b"raw bytes", 0).unwrap_err();
        assert!(matches!(err, ClientError::Codec(_)));
    }

    #[test]
    fn identity_codec_passes_payloads_through() {
        let codec = IdentityCodec;
        let (payload, flags) = codec
            .encode(b"key", Bytes::from_static(b"value"), 9)
            .unwrap();
        assert_eq!(&payload[..], b"value");
        assert_eq!(flags, 9);
        let decoded = codec.decode(b"key", payload, flags).unwrap();
        assert_eq!(&decoded[..], b"value");
    }
}
