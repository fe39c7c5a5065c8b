//! Type-erased handler entries.
//!
//! A registration captures two things behind one object-safe surface: the
//! decode into the concrete target type, and the user callback. The registry
//! can then hold handlers for heterogeneous types in a single map.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::codec::{CodecError, CodecKind};
use crate::domain::HandlerFault;

/// Outcome of one erased invocation, before the error policy is applied.
///
/// Decode failures and handler faults are kept apart here: the dispatcher
/// must propagate the former unconditionally while routing the latter
/// through `throw_on_error`.
pub(crate) enum InvokeError {
    Decode(CodecError),
    Fault(HandlerFault),
}

/// Object-safe form of a typed synchronous action.
pub(crate) trait ErasedAction: Send + Sync {
    fn invoke(&self, data: &str, codec: CodecKind) -> Result<(), InvokeError>;
}

/// Wraps a typed callback; created once per registration call.
pub(crate) struct TypedAction<T, F> {
    action: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> TypedAction<T, F> {
    pub(crate) fn new(action: F) -> Self {
        Self {
            action,
            _marker: PhantomData,
        }
    }
}

impl<T, F> ErasedAction for TypedAction<T, F>
where
    T: DeserializeOwned + Send + Sync + 'static,
    F: Fn(T) -> Result<(), HandlerFault> + Send + Sync,
{
    fn invoke(&self, data: &str, codec: CodecKind) -> Result<(), InvokeError> {
        let value: T = codec.deserialize(data).map_err(InvokeError::Decode)?;
        (self.action)(value).map_err(InvokeError::Fault)
    }
}

/// Object-safe form of a typed asynchronous action. The returned future is
/// awaited to completion by the dispatcher before the next message starts.
#[async_trait]
pub(crate) trait ErasedAsyncAction: Send + Sync {
    async fn invoke(&self, data: &str, codec: CodecKind) -> Result<(), InvokeError>;
}

pub(crate) struct TypedAsyncAction<T, F> {
    action: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> TypedAsyncAction<T, F> {
    pub(crate) fn new(action: F) -> Self {
        Self {
            action,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> ErasedAsyncAction for TypedAsyncAction<T, F>
where
    T: DeserializeOwned + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerFault>> + Send + 'static,
{
    async fn invoke(&self, data: &str, codec: CodecKind) -> Result<(), InvokeError> {
        let value: T = codec.deserialize(data).map_err(InvokeError::Decode)?;
        (self.action)(value).await.map_err(InvokeError::Fault)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Probe {
        value: i32,
    }

    #[test]
    fn typed_action_decodes_then_invokes() {
        let erased = TypedAction::<Probe, _>::new(|p: Probe| {
            assert_eq!(p.value, 100);
            Ok(())
        });
        erased
            .invoke(r#"{"value":100}"#, CodecKind::Json)
            .map_err(|_| "invoke failed")
            .unwrap();
    }

    #[test]
    fn decode_failure_is_not_a_fault() {
        let erased = TypedAction::<Probe, _>::new(|_: Probe| Ok(()));
        let err = erased.invoke("{broken", CodecKind::Json).unwrap_err();
        assert!(matches!(err, InvokeError::Decode(_)));
    }

    #[tokio::test]
    async fn typed_async_action_decodes_then_invokes() {
        let erased = TypedAsyncAction::<Probe, _>::new(|p: Probe| async move {
            assert_eq!(p.value, 7);
            Ok(())
        });
        erased
            .invoke(r#"{"value":7}"#, CodecKind::Json)
            .await
            .map_err(|_| "invoke failed")
            .unwrap();
    }
}
