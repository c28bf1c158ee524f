//! Delivery envelope handed to a consumer.
//!
//! [`Message`] mirrors the shape a broker client delivers: publisher-supplied
//! `properties`, broker-supplied `fields` and the opaque `content`.

use crate::codec::{ContentType, Payload};

/// Application headers attached to a message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    /// Tag describing how `content` was encoded.
    pub content_type: ContentType,
}

/// Publisher-supplied message properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageProperties {
    /// Identifier pairing a reply with its request.
    pub correlation_id: String,
    /// Application headers.
    pub headers: Headers,
    /// Queue a reply should be sent to, for RPC-style deliveries.
    pub reply_to: Option<String>,
}

/// Broker-supplied delivery metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryFields {
    /// Event name the message was routed with.
    pub routing_key: String,
    /// Exchange the message arrived through.
    pub exchange: String,
    /// Channel-scoped delivery counter.
    pub delivery_tag: u64,
    /// Whether the broker has delivered this message before.
    pub redelivered: bool,
}

/// A single delivery to a consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Publisher-supplied properties.
    pub properties: MessageProperties,
    /// Broker-supplied delivery metadata.
    pub fields: DeliveryFields,
    /// Message body.
    pub content: Payload,
}

impl Message {
    /// Event name the message was routed with.
    #[must_use]
    pub fn routing_key(&self) -> &str { &self.fields.routing_key }

    /// Content-type tag from the message headers.
    #[must_use]
    pub fn content_type(&self) -> ContentType { self.properties.headers.content_type }

    /// Reply queue, if the sender expects a response.
    #[must_use]
    pub fn reply_to(&self) -> Option<&str> { self.properties.reply_to.as_deref() }

    /// Correlation identifier of the message.
    #[must_use]
    pub fn correlation_id(&self) -> &str { &self.properties.correlation_id }
}
