//! In-memory substitute for a broker channel.
//!
//! [`StubChannel`] accepts every operation, records it in a per-operation
//! [`CallHistory`], and turns `consume` into a registration in the shared
//! [`QueueHandlerRegistry`].

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::history::CallHistory;
use crate::{
    broker::{
        BrokerError,
        Channel,
        ConsumeHandler,
        ExchangeKind,
        ExchangeOptions,
        PublishOptions,
        QueueDescriptor,
        QueueOptions,
    },
    codec::Payload,
    message::Message,
    registry::QueueHandlerRegistry,
};

/// Queue name returned for an anonymous exclusive queue declaration.
pub const EXCLUSIVE_QUEUE: &str = "exclusiveQueue";

/// Recorded `assert_exchange` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertExchangeCall {
    /// Declared exchange.
    pub exchange: String,
    /// Routing strategy requested.
    pub kind: ExchangeKind,
    /// Declaration options.
    pub options: ExchangeOptions,
}

/// Recorded `assert_queue` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertQueueCall {
    /// Requested queue name, possibly empty.
    pub queue: String,
    /// Declaration options.
    pub options: QueueOptions,
}

/// Recorded `bind_exchange` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindExchangeCall {
    /// Exchange receiving messages.
    pub destination: String,
    /// Exchange forwarding messages.
    pub source: String,
    /// Routing pattern.
    pub pattern: String,
}

/// Recorded `bind_queue` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindQueueCall {
    /// Bound queue.
    pub queue: String,
    /// Exchange the queue is bound to.
    pub exchange: String,
    /// Routing pattern.
    pub pattern: String,
}

/// Recorded `publish` call.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishCall {
    /// Target exchange.
    pub exchange: String,
    /// Event name.
    pub routing_key: String,
    /// Published body.
    pub payload: Payload,
    /// Message properties.
    pub options: PublishOptions,
}

/// Recorded `send_to_queue` call.
#[derive(Clone, Debug, PartialEq)]
pub struct SendToQueueCall {
    /// Target queue.
    pub queue: String,
    /// Sent body.
    pub payload: Payload,
    /// Message properties.
    pub options: PublishOptions,
}

/// Channel stub recording every call.
#[derive(Debug)]
pub struct StubChannel {
    registry: Arc<QueueHandlerRegistry>,
    exchanges: CallHistory<AssertExchangeCall>,
    queues: CallHistory<AssertQueueCall>,
    exchange_bindings: CallHistory<BindExchangeCall>,
    queue_bindings: CallHistory<BindQueueCall>,
    prefetches: CallHistory<u16>,
    consumers: CallHistory<String>,
    publishes: CallHistory<PublishCall>,
    replies: CallHistory<SendToQueueCall>,
    acks: CallHistory<Message>,
    closes: AtomicUsize,
}

impl StubChannel {
    /// Create a channel storing consumers in `registry`.
    #[must_use]
    pub fn new(registry: Arc<QueueHandlerRegistry>) -> Self {
        Self {
            registry,
            exchanges: CallHistory::default(),
            queues: CallHistory::default(),
            exchange_bindings: CallHistory::default(),
            queue_bindings: CallHistory::default(),
            prefetches: CallHistory::default(),
            consumers: CallHistory::default(),
            publishes: CallHistory::default(),
            replies: CallHistory::default(),
            acks: CallHistory::default(),
            closes: AtomicUsize::new(0),
        }
    }

    /// Registry receiving consumers.
    #[must_use]
    pub fn registry(&self) -> &Arc<QueueHandlerRegistry> { &self.registry }

    /// History of `assert_exchange` calls.
    #[must_use]
    pub fn asserted_exchanges(&self) -> &CallHistory<AssertExchangeCall> { &self.exchanges }

    /// History of `assert_queue` calls.
    #[must_use]
    pub fn asserted_queues(&self) -> &CallHistory<AssertQueueCall> { &self.queues }

    /// History of `bind_exchange` calls.
    #[must_use]
    pub fn exchange_bindings(&self) -> &CallHistory<BindExchangeCall> { &self.exchange_bindings }

    /// History of `bind_queue` calls.
    #[must_use]
    pub fn queue_bindings(&self) -> &CallHistory<BindQueueCall> { &self.queue_bindings }

    /// History of `prefetch` counts.
    #[must_use]
    pub fn prefetches(&self) -> &CallHistory<u16> { &self.prefetches }

    /// Queues passed to `consume`, in call order.
    #[must_use]
    pub fn consumers(&self) -> &CallHistory<String> { &self.consumers }

    /// History of `publish` calls.
    #[must_use]
    pub fn publishes(&self) -> &CallHistory<PublishCall> { &self.publishes }

    /// History of `send_to_queue` calls.
    #[must_use]
    pub fn replies(&self) -> &CallHistory<SendToQueueCall> { &self.replies }

    /// Messages passed to `ack`.
    #[must_use]
    pub fn acks(&self) -> &CallHistory<Message> { &self.acks }

    /// Number of times `close` was called.
    #[must_use]
    pub fn close_count(&self) -> usize { self.closes.load(Ordering::SeqCst) }
}

#[async_trait]
impl Channel for StubChannel {
    async fn assert_exchange(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        options: ExchangeOptions,
    ) -> Result<(), BrokerError> {
        self.exchanges.record(AssertExchangeCall {
            exchange: exchange.to_owned(),
            kind,
            options,
        });
        Ok(())
    }

    async fn assert_queue(
        &self,
        queue: &str,
        options: QueueOptions,
    ) -> Result<QueueDescriptor, BrokerError> {
        let descriptor = if queue.is_empty() && options.exclusive {
            QueueDescriptor::named(EXCLUSIVE_QUEUE)
        } else {
            QueueDescriptor::named(queue)
        };
        self.queues.record(AssertQueueCall {
            queue: queue.to_owned(),
            options,
        });
        Ok(descriptor)
    }

    async fn bind_exchange(
        &self,
        destination: &str,
        source: &str,
        pattern: &str,
    ) -> Result<(), BrokerError> {
        self.exchange_bindings.record(BindExchangeCall {
            destination: destination.to_owned(),
            source: source.to_owned(),
            pattern: pattern.to_owned(),
        });
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        pattern: &str,
    ) -> Result<(), BrokerError> {
        self.queue_bindings.record(BindQueueCall {
            queue: queue.to_owned(),
            exchange: exchange.to_owned(),
            pattern: pattern.to_owned(),
        });
        Ok(())
    }

    async fn prefetch(&self, count: u16) -> Result<(), BrokerError> {
        self.prefetches.record(count);
        Ok(())
    }

    async fn consume(&self, queue: &str, handler: ConsumeHandler) -> Result<(), BrokerError> {
        if self.registry.register(queue, handler) {
            tracing::debug!(queue, "replaced consumer");
        }
        self.consumers.record(queue.to_owned());
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Payload,
        options: PublishOptions,
    ) -> Result<(), BrokerError> {
        tracing::trace!(exchange, routing_key, "recorded publish");
        self.publishes.record(PublishCall {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            payload,
            options,
        });
        Ok(())
    }

    async fn send_to_queue(
        &self,
        queue: &str,
        payload: Payload,
        options: PublishOptions,
    ) -> Result<(), BrokerError> {
        tracing::trace!(queue, "recorded send_to_queue");
        self.replies.record(SendToQueueCall {
            queue: queue.to_owned(),
            payload,
            options,
        });
        Ok(())
    }

    async fn ack(&self, message: &Message) -> Result<(), BrokerError> {
        self.acks.record(message.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
