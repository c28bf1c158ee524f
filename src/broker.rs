//! Broker client surface a service talks to.
//!
//! These traits describe the subset of an AMQP-style client a queue-driven
//! service uses: connect, open a channel, declare topology, consume, publish
//! and acknowledge. Production code backs them with a real client; the
//! harness backs them with [`crate::stub`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::{codec::Payload, error::BoxError, message::Message};

/// Consumer callback stored for a queue.
///
/// The returned future resolves once the service has finished handling the
/// delivery, including anything it publishes in response.
pub type ConsumeHandler =
    Arc<dyn Fn(Message) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Wrap an async closure as a [`ConsumeHandler`].
///
/// ```
/// use queue_harness::broker::handler_fn;
///
/// let handler = handler_fn(|message| async move {
///     assert!(!message.routing_key().is_empty());
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> ConsumeHandler
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |message| -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(f(message))
    })
}

/// Errors surfaced by broker operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
}

/// Exchange routing strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Route on exact routing key.
    Direct,
    /// Route on routing key patterns.
    #[default]
    Topic,
    /// Route to every bound queue.
    Fanout,
    /// Route on header values.
    Headers,
}

/// Options for declaring an exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeOptions {
    /// Survive broker restarts.
    pub durable: bool,
    /// Delete once the last binding is removed.
    pub auto_delete: bool,
}

/// Options for declaring a queue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Scope the queue to the declaring connection.
    pub exclusive: bool,
    /// Survive broker restarts.
    pub durable: bool,
    /// Delete once the last consumer unsubscribes.
    pub auto_delete: bool,
}

impl QueueOptions {
    /// Options for a private reply queue.
    #[must_use]
    pub fn exclusive() -> Self {
        Self {
            exclusive: true,
            ..Self::default()
        }
    }

    /// Options for a queue that survives restarts.
    #[must_use]
    pub fn durable() -> Self {
        Self {
            durable: true,
            ..Self::default()
        }
    }
}

/// Result of a queue declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueDescriptor {
    /// Name assigned to the queue.
    pub queue: String,
    /// Messages ready in the queue.
    pub message_count: u32,
    /// Active consumers on the queue.
    pub consumer_count: u32,
}

impl QueueDescriptor {
    /// Describe an empty queue called `queue`.
    #[must_use]
    pub fn named(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            ..Self::default()
        }
    }
}

/// Properties attached to an outbound message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Identifier pairing a reply with its request.
    pub correlation_id: Option<String>,
    /// Queue the recipient should reply to.
    pub reply_to: Option<String>,
    /// Content-type tag of the payload.
    pub content_type: Option<String>,
    /// Ask the broker to persist the message.
    pub persistent: bool,
}

/// Entry point of a broker client.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to the broker.
    async fn connect(&self) -> Result<Arc<dyn Connection>, BrokerError>;
}

/// An open broker connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Open a channel on this connection.
    async fn create_channel(&self) -> Result<Arc<dyn Channel>, BrokerError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// A broker channel.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Declare an exchange.
    async fn assert_exchange(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        options: ExchangeOptions,
    ) -> Result<(), BrokerError>;

    /// Declare a queue. An empty name asks the broker to generate one.
    async fn assert_queue(
        &self,
        queue: &str,
        options: QueueOptions,
    ) -> Result<QueueDescriptor, BrokerError>;

    /// Bind `destination` exchange to `source` exchange.
    async fn bind_exchange(
        &self,
        destination: &str,
        source: &str,
        pattern: &str,
    ) -> Result<(), BrokerError>;

    /// Bind `queue` to `exchange`.
    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str)
    -> Result<(), BrokerError>;

    /// Limit unacknowledged deliveries per consumer.
    async fn prefetch(&self, count: u16) -> Result<(), BrokerError>;

    /// Start delivering messages from `queue` to `handler`.
    async fn consume(&self, queue: &str, handler: ConsumeHandler) -> Result<(), BrokerError>;

    /// Publish to `exchange` with `routing_key`.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Payload,
        options: PublishOptions,
    ) -> Result<(), BrokerError>;

    /// Send directly to `queue`.
    async fn send_to_queue(
        &self,
        queue: &str,
        payload: Payload,
        options: PublishOptions,
    ) -> Result<(), BrokerError>;

    /// Acknowledge a delivery.
    async fn ack(&self, message: &Message) -> Result<(), BrokerError>;

    /// Close the channel.
    async fn close(&self) -> Result<(), BrokerError>;
}
