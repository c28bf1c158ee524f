#![doc(html_root_url = "https://docs.rs/queue_harness/latest")]
//! Public API for the `queue_harness` library.
//!
//! This crate replaces a message broker with in-memory stubs so a
//! queue-driven service can be tested without network I/O. A [`Harness`]
//! starts the service against the stubs, delivers simulated messages into the
//! consumer it registered, and matches what the service published against
//! scripted expectations:
//!
//! ```rust,ignore
//! let mut harness = Harness::start(Arc::new(OrderService::new())).await?;
//! harness
//!     .emit("order.created", json!({"sku": "X"}))
//!     .expect_emitted("order.confirmed", json!({"id": 1}))
//!     .end(|| {})
//!     .await?;
//! ```

pub mod broker;
pub mod codec;
pub mod config;
pub mod error;
pub mod harness;
pub mod matching;
pub mod message;
pub mod registry;
pub mod scenario;
pub mod service;
pub mod stub;

#[cfg(test)]
mod test_helpers;

pub use broker::{Channel, ConsumeHandler, Connection, Connector, handler_fn};
pub use codec::{Codec, ContentType, JsonCodec, Payload};
pub use config::HarnessConfig;
pub use error::{BoxError, CallKind, HarnessError, Result};
pub use harness::{Harness, HarnessState};
pub use matching::Mismatch;
pub use message::Message;
pub use registry::QueueHandlerRegistry;
pub use scenario::Scenario;
pub use service::{Service, ServiceConfig};
pub use stub::{EXCLUSIVE_QUEUE, StubChannel, StubConnector};
