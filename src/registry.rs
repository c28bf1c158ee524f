//! Registry of consumer handlers keyed by queue name.
//!
//! The stub channel stores a handler here instead of subscribing, and the
//! harness looks handlers up to deliver simulated messages straight into the
//! service's own consumer logic.

use dashmap::DashMap;

use crate::broker::ConsumeHandler;

/// Concurrent map of queue name to its single consumer.
#[derive(Default)]
pub struct QueueHandlerRegistry(DashMap<String, ConsumeHandler>);

impl QueueHandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store `handler` for `queue`, replacing any previous handler.
    ///
    /// Returns true if a handler was replaced.
    pub fn register(&self, queue: impl Into<String>, handler: ConsumeHandler) -> bool {
        self.0.insert(queue.into(), handler).is_some()
    }

    /// Retrieve a clone of the handler for `queue`.
    ///
    /// The map guard is released before returning so callers may await the
    /// handler without holding a shard lock.
    #[must_use]
    pub fn get(&self, queue: &str) -> Option<ConsumeHandler> {
        self.0.get(queue).map(|entry| entry.value().clone())
    }

    /// Whether a handler is registered for `queue`.
    #[must_use]
    pub fn contains(&self, queue: &str) -> bool { self.0.contains_key(queue) }

    /// Names of all queues with a registered handler, sorted.
    #[must_use]
    pub fn queues(&self) -> Vec<String> {
        let mut queues: Vec<String> = self.0.iter().map(|entry| entry.key().clone()).collect();
        queues.sort();
        queues
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no handler has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl std::fmt::Debug for QueueHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandlerRegistry")
            .field("queues", &self.queues())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        broker::handler_fn,
        codec::Payload,
        message::{DeliveryFields, Message, MessageProperties},
    };

    fn counting_handler(counter: Arc<AtomicUsize>) -> ConsumeHandler {
        handler_fn(move |_message: Message| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn message() -> Message {
        Message {
            properties: MessageProperties::default(),
            fields: DeliveryFields::default(),
            content: Payload::Passthrough(serde_json::Value::Null),
        }
    }

    #[tokio::test]
    async fn registering_twice_overwrites() {
        let registry = QueueHandlerRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(!registry.register("orders", counting_handler(Arc::clone(&first))));
        assert!(registry.register("orders", counting_handler(Arc::clone(&second))));
        assert_eq!(registry.len(), 1);

        let handler = registry.get("orders").expect("handler registered");
        handler(message()).await.expect("handler succeeds");

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_queue_yields_none() {
        let registry = QueueHandlerRegistry::new();
        assert!(registry.get("orders").is_none());
        assert!(!registry.contains("orders"));
        assert!(registry.is_empty());
    }

    #[test]
    fn lists_queues_sorted() {
        let registry = QueueHandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("b", counting_handler(Arc::clone(&counter)));
        registry.register("a", counting_handler(counter));
        assert_eq!(registry.queues(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
