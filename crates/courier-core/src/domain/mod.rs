//! Domain model (version keys, envelopes, errors).

pub mod envelope;
pub mod errors;
pub mod version;

pub use envelope::{BatchedVersionedMessage, VersionedMessage};
pub use errors::{DispatchError, HandlerFault};
pub use version::{VersionId, Versioned};
