//! Asynchronous dispatcher.
//!
//! Same registry and error-routing semantics as [`Dispatcher`], but every
//! registered action, the fallback, and the error action may suspend. Batch
//! elements are processed strictly in order: each element is awaited to
//! completion (error/fallback path included) before the next begins. There
//! is no parallel fan-out across elements.
//!
//! [`Dispatcher`]: super::Dispatcher

use std::collections::HashMap;
use std::future::Future;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::handler::{ErasedAsyncAction, InvokeError, TypedAsyncAction};
use crate::codec::CodecKind;
use crate::domain::{
    BatchedVersionedMessage, DispatchError, HandlerFault, VersionId, Versioned, VersionedMessage,
};

type FallbackSlot = Box<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;
type ErrorSlot = Box<dyn Fn(HandlerFault) -> BoxFuture<'static, ()> + Send + Sync>;

/// Routes version-tagged envelopes to suspending handlers.
///
/// Registration mirrors [`Dispatcher`](super::Dispatcher): `on`/`on_version`
/// fail fast on duplicates, `otherwise`/`on_error` overwrite. Actions are
/// async fns or closures returning a future.
pub struct AsyncDispatcher {
    registry: HashMap<VersionId, Box<dyn ErasedAsyncAction>>,
    default_codec: CodecKind,
    throw_on_error: bool,
    fallback: Option<FallbackSlot>,
    error_action: Option<ErrorSlot>,
}

impl AsyncDispatcher {
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
    pub fn on<T, F, Fut>(self, action: F) -> Result<Self, DispatchError>
    where
        T: Versioned,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerFault>> + Send + 'static,
    {
        self.on_version::<T, F, Fut>(T::version_id(), action)
    }

    /// Register `action` under an explicit version.
    pub fn on_version<T, F, Fut>(
        mut self,
        version: VersionId,
        action: F,
    ) -> Result<Self, DispatchError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerFault>> + Send + 'static,
    {
        if self.registry.contains_key(&version) {
            return Err(DispatchError::DuplicateHandler(version));
        }
        self.registry
            .insert(version, Box::new(TypedAsyncAction::<T, F>::new(action)));
        Ok(self)
    }

    /// Set the fallback for unmatched versions; receives the raw payload.
    pub fn otherwise<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.fallback = Some(Box::new(move |data| Box::pin(action(data))));
        self
    }

    /// Set the error action for handler faults when `throw_on_error` is off.
    pub fn on_error<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(HandlerFault) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.error_action = Some(Box::new(move |fault| Box::pin(action(fault))));
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

    /// Dispatch one envelope with the default codec, awaiting the resolved
    /// action to completion.
    pub async fn post(&self, message: &VersionedMessage) -> Result<(), DispatchError> {
        self.post_with(message, self.default_codec).await
    }

    /// Dispatch one envelope with a per-call codec.
    pub async fn post_with(
        &self,
        message: &VersionedMessage,
        codec: CodecKind,
    ) -> Result<(), DispatchError> {
        let Some(entry) = self.registry.get(&message.version) else {
            return match &self.fallback {
                Some(fallback) => {
                    debug!(version = %message.version, "no handler, routing to fallback");
                    fallback(message.data.clone()).await;
                    Ok(())
                }
                None => Err(DispatchError::MissingFallback(message.version.clone())),
            };
        };

        match entry.invoke(&message.data, codec).await {
            Ok(()) => Ok(()),
            Err(InvokeError::Decode(source)) => Err(DispatchError::Codec {
                version: message.version.clone(),
                source,
            }),
            Err(InvokeError::Fault(fault)) => self.route_fault(&message.version, fault).await,
        }
    }

    /// Dispatch each element of `batch` in order, one in flight at a time.
    /// Any returned error aborts the remaining elements.
    pub async fn post_batch(&self, batch: &BatchedVersionedMessage) -> Result<(), DispatchError> {
        for message in &batch.messages {
            self.post(message).await?;
        }
        Ok(())
    }

    async fn route_fault(
        &self,
        version: &VersionId,
        fault: HandlerFault,
    ) -> Result<(), DispatchError> {
        if self.throw_on_error {
            return Err(DispatchError::Handler {
                version: version.clone(),
                fault,
            });
        }
        match &self.error_action {
            Some(error_action) => {
                debug!(version = %version, "handler fault routed to error action");
                error_action(fault).await;
                Ok(())
            }
            None => Err(DispatchError::MissingErrorAction(version.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct EntityA {
        value1: String,
        value2: i32,
    }

    impl Versioned for EntityA {
        const SCHEMA: &'static str = "test.entity_a";
        const VERSION: u32 = 1;
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct EntityB {
        label: String,
    }

    impl Versioned for EntityB {
        const SCHEMA: &'static str = "test.entity_b";
        const VERSION: u32 = 1;
    }

    #[derive(Debug, Error)]
    #[error("async boom")]
    struct Boom;

    #[tokio::test]
    async fn routes_to_registered_async_handler() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, true)
            .on::<EntityA, _, _>(move |e: EntityA| {
                let seen = Arc::clone(&seen_in);
                async move {
                    *seen.lock().unwrap() = Some(e);
                    Ok(())
                }
            })
            .unwrap();

        let entity = EntityA {
            value1: "test".to_string(),
            value2: 42,
        };
        let msg = VersionedMessage::encode(&entity, CodecKind::Json).unwrap();
        dispatcher.post(&msg).await.unwrap();

        assert_eq!(seen.lock().unwrap().take(), Some(entity));
    }

    #[tokio::test]
    async fn batch_elements_complete_strictly_in_order() {
        // The first handler suspends; if elements overlapped, "b" would win.
        let order = Arc::new(Mutex::new(Vec::new()));
        let (oa, ob) = (Arc::clone(&order), Arc::clone(&order));

        let dispatcher = AsyncDispatcher::new(CodecKind::Json, true)
            .on::<EntityA, _, _>(move |_: EntityA| {
                let order = Arc::clone(&oa);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    order.lock().unwrap().push("a");
                    Ok(())
                }
            })
            .unwrap()
            .on::<EntityB, _, _>(move |_: EntityB| {
                let order = Arc::clone(&ob);
                async move {
                    order.lock().unwrap().push("b");
                    Ok(())
                }
            })
            .unwrap();

        let batch = BatchedVersionedMessage::from(vec![
            VersionedMessage::encode(
                &EntityA {
                    value1: "x".to_string(),
                    value2: 1,
                },
                CodecKind::Json,
            )
            .unwrap(),
            VersionedMessage::encode(
                &EntityB {
                    label: "y".to_string(),
                },
                CodecKind::Json,
            )
            .unwrap(),
        ]);
        dispatcher.post_batch(&batch).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unmatched_version_awaits_async_fallback() {
        let raw = Arc::new(Mutex::new(String::new()));
        let raw_in = Arc::clone(&raw);
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, true).otherwise(move |data| {
            let raw = Arc::clone(&raw_in);
            async move {
                raw.lock().unwrap().push_str(&data);
            }
        });

        let msg = VersionedMessage::new("opaque-bytes", VersionId::new("unknown", 9));
        dispatcher.post(&msg).await.unwrap();
        assert_eq!(raw.lock().unwrap().as_str(), "opaque-bytes");
    }

    #[tokio::test]
    async fn fault_routing_matches_sync_contract() {
        let saw_boom = Arc::new(AtomicU32::new(0));
        let s = Arc::clone(&saw_boom);
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, false)
            .on::<EntityA, _, _>(|_: EntityA| async { Err(Box::new(Boom) as HandlerFault) })
            .unwrap()
            .on_error(move |fault| {
                let saw = Arc::clone(&s);
                async move {
                    if fault.downcast_ref::<Boom>().is_some() {
                        saw.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });

        let entity = EntityA {
            value1: "x".to_string(),
            value2: 1,
        };
        let msg = VersionedMessage::encode(&entity, CodecKind::Json).unwrap();
        dispatcher.post(&msg).await.unwrap();
        assert_eq!(saw_boom.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rethrown_fault_aborts_the_batch() {
        let after = Arc::new(AtomicU32::new(0));
        let a = Arc::clone(&after);
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, true)
            .on::<EntityA, _, _>(|_: EntityA| async { Err(Box::new(Boom) as HandlerFault) })
            .unwrap()
            .on::<EntityB, _, _>(move |_: EntityB| {
                let after = Arc::clone(&a);
                async move {
                    after.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let batch = BatchedVersionedMessage::from(vec![
            VersionedMessage::encode(
                &EntityA {
                    value1: "x".to_string(),
                    value2: 1,
                },
                CodecKind::Json,
            )
            .unwrap(),
            VersionedMessage::encode(
                &EntityB {
                    label: "never".to_string(),
                },
                CodecKind::Json,
            )
            .unwrap(),
        ]);
        let err = dispatcher.post_batch(&batch).await.unwrap_err();

        assert!(matches!(err, DispatchError::Handler { .. }));
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decode_failure_propagates_unconditionally() {
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, false)
            .on::<EntityA, _, _>(|_: EntityA| async { Ok(()) })
            .unwrap()
            .on_error(|_| async {});

        let msg = VersionedMessage::new("{malformed", EntityA::version_id());
        let err = dispatcher.post(&msg).await.unwrap_err();
        assert!(matches!(err, DispatchError::Codec { .. }));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let result = AsyncDispatcher::new(CodecKind::Json, true)
            .on::<EntityA, _, _>(|_: EntityA| async { Ok(()) })
            .unwrap()
            .on::<EntityA, _, _>(|_: EntityA| async { Ok(()) });
        assert!(matches!(result, Err(DispatchError::DuplicateHandler(_))));
    }

    #[tokio::test]
    async fn per_call_codec_override() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = Arc::clone(&hits);
        let dispatcher = AsyncDispatcher::new(CodecKind::Json, true)
            .on::<EntityA, _, _>(move |_: EntityA| {
                let hits = Arc::clone(&h);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let entity = EntityA {
            value1: "multi".to_string(),
            value2: 3,
        };
        for codec in [CodecKind::Protobuf, CodecKind::Xml, CodecKind::Json] {
            let msg = VersionedMessage::encode(&entity, codec).unwrap();
            dispatcher.post_with(&msg, codec).await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
