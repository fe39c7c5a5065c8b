//! Synchronous dispatcher: registry, fluent registration, and `post`.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::handler::{ErasedAction, InvokeError, TypedAction};
use crate::codec::CodecKind;
use crate::domain::{
    BatchedVersionedMessage, DispatchError, HandlerFault, VersionId, Versioned, VersionedMessage,
};

/// Routes version-tagged envelopes to statically-typed handlers.
///
/// # 使用例
/// ```ignore
/// let dispatcher = Dispatcher::new(CodecKind::Json, false)
///     .on::<ChargeRequest, _>(|req| { process(req); Ok(()) })?
///     .on::<RefundRequest, _>(|req| { refund(req); Ok(()) })?
///     .otherwise(|raw| archive_unknown(raw))
///     .on_error(|fault| report(fault));
///
/// dispatcher.post(&envelope)?;
/// ```
///
/// # Registration vs. dispatch
/// Registration mutates; `post` only reads. The two are not internally
/// synchronized: finish configuring before dispatching from multiple
/// threads. Once configuration is done, concurrent `post` calls are safe.
pub struct Dispatcher {
    registry: HashMap<VersionId, Box<dyn ErasedAction>>,
    default_codec: CodecKind,
    throw_on_error: bool,
    fallback: Option<Box<dyn Fn(&str) + Send + Sync>>,
    error_action: Option<Box<dyn Fn(&HandlerFault) + Send + Sync>>,
}

impl Dispatcher {
    pub fn new(default_codec: CodecKind, throw_on_error: bool) -> Self {
        Self {
            registry: HashMap::new(),
            default_codec,
            throw_on_error,
            fallback: None,
            error_action: None,
        }
    }

    /// Register `action` for `T`'s canonical version.
    ///
    /// Fails fast with [`DispatchError::DuplicateHandler`] if that version
    /// is already taken.
    pub fn on<T, F>(self, action: F) -> Result<Self, DispatchError>
    where
        T: Versioned,
        F: Fn(T) -> Result<(), HandlerFault> + Send + Sync + 'static,
    {
        self.on_version::<T, F>(T::version_id(), action)
    }

    /// Register `action` under an explicit version, decoupling the dispatch
    /// key from the type's canonical version. Lets multiple wire versions
    /// funnel into one handler, or a handler be keyed by a version the type
    /// does not itself declare.
    pub fn on_version<T, F>(mut self, version: VersionId, action: F) -> Result<Self, DispatchError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(T) -> Result<(), HandlerFault> + Send + Sync + 'static,
    {
        if self.registry.contains_key(&version) {
            return Err(DispatchError::DuplicateHandler(version));
        }
        self.registry
            .insert(version, Box::new(TypedAction::<T, F>::new(action)));
        Ok(self)
    }

    /// Set the fallback for unmatched versions. It receives the raw,
    /// still-serialized payload. Re-registering overwrites (last wins).
    pub fn otherwise<F>(mut self, action: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(action));
        self
    }

    /// Set the error action invoked for handler faults when
    /// `throw_on_error` is off. Observational only; re-registering
    /// overwrites (last wins).
    pub fn on_error<F>(mut self, action: F) -> Self
    where
        F: Fn(&HandlerFault) + Send + Sync + 'static,
    {
        self.error_action = Some(Box::new(action));
        self
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registered_versions(&self) -> Vec<VersionId> {
        self.registry.keys().cloned().collect()
    }

    /// Dispatch one envelope with the default codec.
    pub fn post(&self, message: &VersionedMessage) -> Result<(), DispatchError> {
        self.post_with(message, self.default_codec)
    }

    /// Dispatch one envelope, substituting `codec` for the default.
    pub fn post_with(
        &self,
        message: &VersionedMessage,
        codec: CodecKind,
    ) -> Result<(), DispatchError> {
        let Some(entry) = self.registry.get(&message.version) else {
            return match &self.fallback {
                Some(fallback) => {
                    debug!(version = %message.version, "no handler, routing to fallback");
                    fallback(&message.data);
                    Ok(())
                }
                None => Err(DispatchError::MissingFallback(message.version.clone())),
            };
        };

        match entry.invoke(&message.data, codec) {
            Ok(()) => Ok(()),
            // Decode failures bypass the error policy entirely.
            Err(InvokeError::Decode(source)) => Err(DispatchError::Codec {
                version: message.version.clone(),
                source,
            }),
            Err(InvokeError::Fault(fault)) => self.route_fault(&message.version, fault),
        }
    }

    /// Dispatch each element of `batch` in order. A handled fault or a
    /// fallback hit does not stop the batch; any returned error (codec
    /// failure, rethrown fault, configuration fault) aborts the rest.
    pub fn post_batch(&self, batch: &BatchedVersionedMessage) -> Result<(), DispatchError> {
        for message in &batch.messages {
            self.post(message)?;
        }
        Ok(())
    }

    fn route_fault(&self, version: &VersionId, fault: HandlerFault) -> Result<(), DispatchError> {
        if self.throw_on_error {
            return Err(DispatchError::Handler {
                version: version.clone(),
                fault,
            });
        }
        match &self.error_action {
            Some(error_action) => {
                debug!(version = %version, "handler fault routed to error action");
                error_action(&fault);
                Ok(())
            }
            None => Err(DispatchError::MissingErrorAction(version.clone())),
        }
    }
}
