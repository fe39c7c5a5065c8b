//! Wire-level units: a serialized payload paired with its VersionId.
//!
//! # Serialization bridge
//! The constructors double as the bridge between typed entities and the
//! wire: `encode` stamps the version resolved from the type, `encode_as`
//! takes a caller-supplied version (schema aliasing, tests), and
//! `to_transport` / `from_transport` round-trip the envelope through its
//! own serialized string form. Codec failures propagate unmodified.

use serde::{Deserialize, Serialize};

use super::version::{VersionId, Versioned};
use crate::codec::{CodecError, CodecKind};

/// One version-tagged message: opaque serialized payload plus the
/// `VersionId` the dispatcher keys on. Immutable once constructed and
/// short-lived (exists for the duration of a dispatch call).
///
/// Wire names are PascalCase (`Data`, `Version`) for compatibility with
/// external producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionedMessage {
    pub data: String,
    pub version: VersionId,
}

impl VersionedMessage {
    pub fn new(data: impl Into<String>, version: VersionId) -> Self {
        Self {
            data: data.into(),
            version,
        }
    }

    /// Serialize `entity` with `codec` and stamp its canonical version.
    pub fn encode<T: Versioned>(entity: &T, codec: CodecKind) -> Result<Self, CodecError> {
        Ok(Self {
            data: codec.serialize(entity)?,
            version: T::version_id(),
        })
    }

    /// Serialize `entity` with `codec` under a caller-supplied version.
    ///
    /// The wire version may intentionally differ from anything the type
    /// declares, so `entity` only needs to be serializable.
    pub fn encode_as<T: Serialize>(
        entity: &T,
        version: VersionId,
        codec: CodecKind,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            data: codec.serialize(entity)?,
            version,
        })
    }

    /// Serialize the envelope itself (envelope-of-envelope).
    pub fn to_transport(&self, codec: CodecKind) -> Result<String, CodecError> {
        codec.serialize(self)
    }

    /// Recover an envelope from its own serialized form, optionally
    /// overriding the recovered version.
    pub fn from_transport(
        text: &str,
        codec: CodecKind,
        version_override: Option<VersionId>,
    ) -> Result<Self, CodecError> {
        let mut message: Self = codec.deserialize(text)?;
        if let Some(version) = version_override {
            message.version = version;
        }
        Ok(message)
    }
}

/// An ordered sequence of envelopes. Order is significant: the dispatchers
/// process elements strictly left to right. May be empty (no-op dispatch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchedVersionedMessage {
    pub messages: Vec<VersionedMessage>,
}

impl BatchedVersionedMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: VersionedMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<VersionedMessage>> for BatchedVersionedMessage {
    fn from(messages: Vec<VersionedMessage>) -> Self {
        Self { messages }
    }
}
