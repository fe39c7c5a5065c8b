//! Codec selection and the concrete serialize/deserialize backends.
//!
//! The dispatch engine treats codecs as collaborators: `serialize` turns a
//! serde value into envelope text, `deserialize` recovers a typed value, and
//! every failure surfaces as a [`CodecError`] with no recovery attempted.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Serialization format selector. Set as the dispatcher default at
/// construction, and optionally overridden per `post` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Json,
    Xml,
    /// Compact binary slot. Entities carry serde schemas, not `.proto`
    /// descriptors, so the wire format is MessagePack bytes hex-encoded
    /// into the envelope's text field.
    Protobuf,
}

/// A payload could not be encoded, or could not be decoded into the
/// requested target type.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml encode: {0}")]
    XmlEncode(#[from] quick_xml::SeError),

    #[error("xml decode: {0}")]
    XmlDecode(#[from] quick_xml::DeError),

    #[error("binary encode: {0}")]
    BinaryEncode(#[from] rmp_serde::encode::Error),

    #[error("binary decode: {0}")]
    BinaryDecode(#[from] rmp_serde::decode::Error),

    #[error("binary payload is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl CodecKind {
    /// Serialize `value` to envelope text in this format.
    pub fn serialize<T: Serialize>(self, value: &T) -> Result<String, CodecError> {
        match self {
            CodecKind::Json => Ok(serde_json::to_string(value)?),
            CodecKind::Xml => Ok(quick_xml::se::to_string(value)?),
            CodecKind::Protobuf => Ok(hex::encode(rmp_serde::to_vec_named(value)?)),
        }
    }

    /// Deserialize envelope text into `T`.
    pub fn deserialize<T: DeserializeOwned>(self, data: &str) -> Result<T, CodecError> {
        match self {
            CodecKind::Json => Ok(serde_json::from_str(data)?),
            CodecKind::Xml => Ok(quick_xml::de::from_str(data)?),
            CodecKind::Protobuf => {
                let bytes = hex::decode(data)?;
                Ok(rmp_serde::from_slice(&bytes)?)
            }
        }
    }
}
