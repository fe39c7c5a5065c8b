//! VersionId - スキーマバージョンを表す値型。dispatch のキーになる。
//!
//! # 設計メモ
//! - 構造的等価性（PartialEq/Eq/Hash）のみ。identity 比較はしない。
//! - 1つのバージョンは、由来した型とは別の型のハンドラにも手動で
//!   束縛できるため、VersionId は型の identity から独立している。

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identifies one message schema version: a schema name plus an integer
/// major version. Two `VersionId`s are equal iff both parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionId {
    schema: String,
    version: u32,
}

impl VersionId {
    pub fn new(schema: impl Into<String>, version: u32) -> Self {
        Self {
            schema: schema.into(),
            version,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.v{}", self.schema, self.version)
    }
}

/// Versioned binds a message type to its canonical `VersionId`.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct ChargeRequest {
///     amount: u64,
/// }
///
/// impl Versioned for ChargeRequest {
///     const SCHEMA: &'static str = "acme.billing.charge";
///     const VERSION: u32 = 1;
/// }
/// ```
///
/// # Trait bounds
/// - `Serialize` / `DeserializeOwned`: the envelope bridge converts both ways
/// - `Send + Sync + 'static`: handlers live in a shared registry
pub trait Versioned: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Schema name, e.g. `"acme.billing.charge"`.
    const SCHEMA: &'static str;

    /// Major version of the schema.
    const VERSION: u32;

    /// The canonical `VersionId` for this type. Stable across calls.
    fn version_id() -> VersionId {
        VersionId::new(Self::SCHEMA, Self::VERSION)
    }
}
