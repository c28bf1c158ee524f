//! Payload codec used to move application values on and off the wire.
//!
//! The harness treats the codec as a collaborator: it only needs
//! [`Codec::encode`] to learn which content-type tag a value would carry and
//! [`Codec::decode`] to turn a recorded payload back into a value.
//! [`JsonCodec`] is the reference implementation.

use std::{fmt, str::FromStr};

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

/// Content-type tag carried in message headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Payload is handed over as-is; no decoding is performed.
    #[default]
    Buffer,
    /// UTF-8 text.
    String,
    /// JSON document.
    Json,
}

impl ContentType {
    /// Wire representation of the tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::String => "string",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ContentType {
    type Err = CodecError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "buffer" => Ok(Self::Buffer),
            "string" => Ok(Self::String),
            "json" => Ok(Self::Json),
            other => Err(CodecError::UnknownContentType(other.to_owned())),
        }
    }
}

/// Message body as seen by a consumer or recorded by the stub channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Wire bytes produced by a codec.
    Encoded(Bytes),
    /// Application value delivered without encoding.
    Passthrough(Value),
}

impl Payload {
    /// Return the encoded bytes, if this payload went through a codec.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Encoded(bytes) => Some(bytes),
            Self::Passthrough(_) => None,
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self { Self::Encoded(bytes) }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self { Self::Encoded(Bytes::from(bytes)) }
}

/// Output of [`Codec::encode`].
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    /// Tag describing how `payload` was produced.
    pub content_type: ContentType,
    /// Encoded body.
    pub payload: Payload,
}

/// Errors raised while encoding or decoding payloads.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodecError {
    /// The header carried a tag this codec does not understand.
    #[error("unknown content type `{0}`")]
    UnknownContentType(String),
    /// A `string` payload was not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    /// A `json` payload could not be encoded or decoded.
    #[error("invalid JSON payload")]
    Json(#[from] serde_json::Error),
}

/// Inverse pair converting application values to wire payloads and back.
pub trait Codec: Send + Sync + 'static {
    /// Encode `value` and report the content-type tag used.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the value cannot be represented.
    fn encode(&self, value: &Value) -> Result<Encoded, CodecError>;

    /// Decode `payload` according to `content_type`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the payload does not match the tag.
    fn decode(&self, content_type: ContentType, payload: &Payload) -> Result<Value, CodecError>;
}

/// Codec storing strings as UTF-8 text and everything else as JSON.
///
/// ```
/// use queue_harness::codec::{Codec, ContentType, JsonCodec};
/// use serde_json::json;
///
/// let encoded = JsonCodec.encode(&json!({"id": 1})).unwrap();
/// assert_eq!(encoded.content_type, ContentType::Json);
/// let value = JsonCodec
///     .decode(encoded.content_type, &encoded.payload)
///     .unwrap();
/// assert_eq!(value, json!({"id": 1}));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Encoded, CodecError> {
        let encoded = match value {
            Value::String(text) => Encoded {
                content_type: ContentType::String,
                payload: Payload::Encoded(Bytes::copy_from_slice(text.as_bytes())),
            },
            other => Encoded {
                content_type: ContentType::Json,
                payload: Payload::Encoded(Bytes::from(serde_json::to_vec(other)?)),
            },
        };
        Ok(encoded)
    }

    fn decode(&self, content_type: ContentType, payload: &Payload) -> Result<Value, CodecError> {
        // Pass-through values never hit the wire, whatever the tag says.
        let bytes = match payload {
            Payload::Passthrough(value) => return Ok(value.clone()),
            Payload::Encoded(bytes) => bytes,
        };
        match content_type {
            ContentType::Buffer => Ok(Value::Array(
                bytes.iter().map(|byte| Value::from(*byte)).collect(),
            )),
            ContentType::String => Ok(Value::String(std::str::from_utf8(bytes)?.to_owned())),
            ContentType::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}
