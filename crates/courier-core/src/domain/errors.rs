//! Dispatch error taxonomy.

use thiserror::Error;

use super::version::VersionId;
use crate::codec::CodecError;

/// A failure raised inside a user-supplied handler. Boxed so the error
/// action and callers can downcast to the concrete fault type.
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by registration and dispatch.
///
/// Routing rules:
/// - `Codec` always reaches the `post` caller; a malformed payload is a
///   transport defect, not a handler-logic fault, so it bypasses the error
///   action regardless of `throw_on_error`.
/// - `Handler` reaches the caller only when `throw_on_error` is set;
///   otherwise the fault goes to the registered error action.
/// - `MissingFallback` / `MissingErrorAction` are configuration faults:
///   a reached-but-unset slot fails loudly instead of dropping the message.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler already registered for version {0}")]
    DuplicateHandler(VersionId),

    #[error("cannot decode payload for version {version}: {source}")]
    Codec {
        version: VersionId,
        #[source]
        source: CodecError,
    },

    #[error("handler fault for version {version}: {fault}")]
    Handler {
        version: VersionId,
        fault: HandlerFault,
    },

    #[error("no handler matches version {0} and no fallback is registered")]
    MissingFallback(VersionId),

    #[error("handler fault for version {0} but no error action is registered")]
    MissingErrorAction(VersionId),
}
