//! courier-core
//!
//! Versioned message dispatch: route an opaque, version-tagged payload to
//! exactly one statically-typed handler, chosen by the VersionId carried
//! alongside the payload rather than by inspecting the payload itself.
//!
//! # モジュール構成
//! - **domain**: 値型（VersionId, Versioned, envelope, errors）
//! - **codec**: CodecKind セレクタと serialize/deserialize の実装
//! - **dispatch**: ハンドラの type erasure と同期/非同期ディスパッチャ
//!
//! # Two-layer design
//! - Surface: typed registration (`on::<T>(action)`) - the compiler ties a
//!   handler to its message type.
//! - Inside: type-erased entries keyed by `VersionId` - one map holds
//!   handlers for heterogeneous target types.

pub mod codec;
pub mod dispatch;
pub mod domain;

pub use codec::{CodecError, CodecKind};
pub use dispatch::{AsyncDispatcher, Dispatcher};
pub use domain::{
    BatchedVersionedMessage, DispatchError, HandlerFault, VersionId, Versioned, VersionedMessage,
};
