//! Test-only services used by the crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    broker::{BrokerError, Channel, PublishOptions, QueueOptions, handler_fn},
    codec::{Codec, JsonCodec},
    error::BoxError,
    message::Message,
    service::{Service, ServiceConfig},
};

/// Service that records deliveries and echoes them back.
///
/// Every delivery is published again as `<routing key>.done` with the same
/// payload and, when the message carries a reply queue, sent there too.
pub(crate) struct RecordingService {
    queue: String,
    consume: bool,
    reply_queue: bool,
    failing_on: Option<String>,
    stalling_on: Option<String>,
    received: Arc<Mutex<Vec<Message>>>,
    broker_path: Mutex<Option<String>>,
}

impl RecordingService {
    pub(crate) fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            consume: true,
            reply_queue: false,
            failing_on: None,
            stalling_on: None,
            received: Arc::default(),
            broker_path: Mutex::new(None),
        }
    }

    /// Start without registering a consumer.
    pub(crate) fn without_consumer(mut self) -> Self {
        self.consume = false;
        self
    }

    /// Declare an anonymous exclusive reply queue during start.
    pub(crate) fn with_reply_queue(mut self) -> Self {
        self.reply_queue = true;
        self
    }

    /// Fail deliveries routed with `event`.
    pub(crate) fn failing_on(mut self, event: &str) -> Self {
        self.failing_on = Some(event.to_owned());
        self
    }

    /// Never finish deliveries routed with `event`.
    pub(crate) fn stalling_on(mut self, event: &str) -> Self {
        self.stalling_on = Some(event.to_owned());
        self
    }

    pub(crate) fn received(&self) -> Vec<Message> { self.received.lock().expect("lock").clone() }

    pub(crate) fn broker_path(&self) -> Option<String> {
        self.broker_path.lock().expect("lock").clone()
    }
}

#[derive(Clone)]
struct Behaviour {
    channel: Arc<dyn Channel>,
    received: Arc<Mutex<Vec<Message>>>,
    failing_on: Option<String>,
    stalling_on: Option<String>,
}

impl Behaviour {
    async fn handle(self, message: Message) -> Result<(), BoxError> {
        self.received.lock().expect("lock").push(message.clone());
        if self.stalling_on.as_deref() == Some(message.routing_key()) {
            std::future::pending::<()>().await;
        }
        if self.failing_on.as_deref() == Some(message.routing_key()) {
            return Err("handler failure".into());
        }

        let data = JsonCodec.decode(message.content_type(), &message.content)?;
        let encoded = JsonCodec.encode(&data)?;
        let options = PublishOptions {
            correlation_id: Some(message.correlation_id().to_owned()),
            content_type: Some(encoded.content_type.to_string()),
            ..PublishOptions::default()
        };
        let done = format!("{}.done", message.routing_key());
        self.channel
            .publish("events", &done, encoded.payload.clone(), options.clone())
            .await?;
        if let Some(reply_to) = message.reply_to() {
            self.channel
                .send_to_queue(reply_to, encoded.payload, options)
                .await?;
        }
        self.channel.ack(&message).await?;
        Ok(())
    }
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> &str { &self.queue }

    async fn start(&self, config: ServiceConfig) -> Result<(), BoxError> {
        *self.broker_path.lock().expect("lock") = Some(config.broker_path.clone());
        let connection = config.amqp.connect().await?;
        let channel = connection.create_channel().await?;
        channel
            .assert_queue(&self.queue, QueueOptions::durable())
            .await?;

        if self.reply_queue {
            let reply = channel.assert_queue("", QueueOptions::exclusive()).await?;
            channel
                .consume(&reply.queue, handler_fn(|_| async { Ok(()) }))
                .await?;
        }
        if !self.consume {
            return Ok(());
        }

        let behaviour = Behaviour {
            channel: Arc::clone(&channel),
            received: Arc::clone(&self.received),
            failing_on: self.failing_on.clone(),
            stalling_on: self.stalling_on.clone(),
        };
        channel
            .consume(
                &self.queue,
                handler_fn(move |message| behaviour.clone().handle(message)),
            )
            .await?;
        Ok(())
    }
}

/// Service whose start sequence always fails.
pub(crate) struct FailingService;

#[async_trait]
impl Service for FailingService {
    fn name(&self) -> &str { "broken" }

    async fn start(&self, _config: ServiceConfig) -> Result<(), BoxError> {
        Err(BrokerError::Connect("broker unavailable".to_owned()).into())
    }
}
