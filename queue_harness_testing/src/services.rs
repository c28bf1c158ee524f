//! Sample queue-driven services for exercising the harness.
//!
//! Each service talks to the broker exclusively through the
//! [`queue_harness::broker`] traits, exactly as production code would.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use queue_harness::{
    BoxError,
    Channel,
    Codec,
    JsonCodec,
    Message,
    Service,
    ServiceConfig,
    broker::{BrokerError, ExchangeKind, ExchangeOptions, PublishOptions, QueueOptions},
    handler_fn,
};
use serde_json::{Value, json};

/// Exchange the sample services publish events to.
pub const EVENTS_EXCHANGE: &str = "events";

/// Encode `value` and publish it as `routing_key` on [`EVENTS_EXCHANGE`].
async fn publish_event(
    channel: &dyn Channel,
    routing_key: &str,
    value: &Value,
    correlation_id: &str,
) -> Result<(), BoxError> {
    let encoded = JsonCodec.encode(value)?;
    let options = PublishOptions {
        correlation_id: Some(correlation_id.to_owned()),
        content_type: Some(encoded.content_type.to_string()),
        ..PublishOptions::default()
    };
    channel
        .publish(EVENTS_EXCHANGE, routing_key, encoded.payload, options)
        .await?;
    Ok(())
}

/// Order workflow: confirms every `order.created` with `order.confirmed`.
///
/// Confirmations carry sequential ids starting at 1. `order.cancelled`
/// publishes `order.refunded` echoing the cancelled payload. Other events
/// are acknowledged and ignored.
#[derive(Debug)]
pub struct OrderService {
    next_id: Arc<AtomicU64>,
}

impl OrderService {
    /// Queue the service consumes from.
    pub const QUEUE: &'static str = "orders";

    /// Create the service with ids starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for OrderService {
    fn default() -> Self { Self::new() }
}

async fn handle_order(
    channel: Arc<dyn Channel>,
    next_id: Arc<AtomicU64>,
    message: Message,
) -> Result<(), BoxError> {
    let data = JsonCodec.decode(message.content_type(), &message.content)?;
    match message.routing_key() {
        "order.created" => {
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            publish_event(
                channel.as_ref(),
                "order.confirmed",
                &json!({ "id": id }),
                message.correlation_id(),
            )
            .await?;
        }
        "order.cancelled" => {
            publish_event(
                channel.as_ref(),
                "order.refunded",
                &data,
                message.correlation_id(),
            )
            .await?;
        }
        _ => {}
    }
    channel.ack(&message).await?;
    Ok(())
}

#[async_trait]
impl Service for OrderService {
    fn name(&self) -> &str { Self::QUEUE }

    async fn start(&self, config: ServiceConfig) -> Result<(), BoxError> {
        let connection = config.amqp.connect().await?;
        let channel = connection.create_channel().await?;
        channel
            .assert_exchange(
                EVENTS_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeOptions {
                    durable: true,
                    ..ExchangeOptions::default()
                },
            )
            .await?;
        channel
            .assert_queue(Self::QUEUE, QueueOptions::durable())
            .await?;
        channel
            .bind_queue(Self::QUEUE, EVENTS_EXCHANGE, "order.*")
            .await?;
        channel.prefetch(1).await?;

        let handler_channel = Arc::clone(&channel);
        let next_id = Arc::clone(&self.next_id);
        channel
            .consume(
                Self::QUEUE,
                handler_fn(move |message| {
                    handle_order(Arc::clone(&handler_channel), Arc::clone(&next_id), message)
                }),
            )
            .await?;
        Ok(())
    }
}

/// RPC-style pricing service answering `quote.requested` on the reply queue.
///
/// Replies carry `{ "sku": <sku>, "price": 42 }` and the request's
/// correlation id. A request without a reply queue fails the handler.
#[derive(Debug, Default)]
pub struct QuoteService;

impl QuoteService {
    /// Queue the service consumes from.
    pub const QUEUE: &'static str = "quotes";
    /// Price quoted for every sku.
    pub const PRICE: u64 = 42;
}

async fn handle_quote(channel: Arc<dyn Channel>, message: Message) -> Result<(), BoxError> {
    if message.routing_key() == "quote.requested" {
        let Some(reply_to) = message.reply_to() else {
            return Err("quote request without reply queue".into());
        };
        let request = JsonCodec.decode(message.content_type(), &message.content)?;
        let reply = json!({ "sku": request["sku"], "price": QuoteService::PRICE });
        let encoded = JsonCodec.encode(&reply)?;
        let options = PublishOptions {
            correlation_id: Some(message.correlation_id().to_owned()),
            content_type: Some(encoded.content_type.to_string()),
            ..PublishOptions::default()
        };
        channel
            .send_to_queue(reply_to, encoded.payload, options)
            .await?;
    }
    channel.ack(&message).await?;
    Ok(())
}

#[async_trait]
impl Service for QuoteService {
    fn name(&self) -> &str { Self::QUEUE }

    async fn start(&self, config: ServiceConfig) -> Result<(), BoxError> {
        let connection = config.amqp.connect().await?;
        let channel = connection.create_channel().await?;
        channel
            .assert_queue(Self::QUEUE, QueueOptions::default())
            .await?;
        // Private queue for answers to the service's own outbound requests.
        let replies = channel.assert_queue("", QueueOptions::exclusive()).await?;
        channel
            .consume(&replies.queue, handler_fn(|_| async { Ok(()) }))
            .await?;

        let handler_channel = Arc::clone(&channel);
        channel
            .consume(
                Self::QUEUE,
                handler_fn(move |message| handle_quote(Arc::clone(&handler_channel), message)),
            )
            .await?;
        Ok(())
    }
}

/// Service that connects but never subscribes to its queue.
#[derive(Debug, Default)]
pub struct SilentService;

#[async_trait]
impl Service for SilentService {
    fn name(&self) -> &str { "silent" }

    async fn start(&self, config: ServiceConfig) -> Result<(), BoxError> {
        let connection = config.amqp.connect().await?;
        let channel = connection.create_channel().await?;
        channel
            .assert_queue(self.name(), QueueOptions::default())
            .await?;
        Ok(())
    }
}

/// Service whose broker connection is always refused.
#[derive(Debug, Default)]
pub struct FailingService;

#[async_trait]
impl Service for FailingService {
    fn name(&self) -> &str { "failing" }

    async fn start(&self, _config: ServiceConfig) -> Result<(), BoxError> {
        Err(BrokerError::Connect("cannot reach broker".to_owned()).into())
    }
}
