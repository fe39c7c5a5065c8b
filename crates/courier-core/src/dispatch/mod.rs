//! Dispatch - version-keyed handler registry and the dispatch engines.
//!
//! # 二層構造
//! - 表層: `on::<T>(action)` - 型安全な登録 API
//! - 内部: `ErasedAction` / `ErasedAsyncAction` - object-safe, type erasure
//!
//! The sync and async dispatchers share the same registry and error-routing
//! semantics; only the shape of the stored action differs.

mod async_dispatcher;
mod dispatcher;
mod handler;

pub use async_dispatcher::AsyncDispatcher;
pub use dispatcher::Dispatcher;
