//! In-memory broker stubs.
//!
//! The stubs implement the [`crate::broker`] traits without any I/O. Every
//! operation succeeds immediately and is appended to a call history that the
//! harness later matches expectations against.

pub mod channel;
pub mod connection;
pub mod history;

use std::sync::Arc;

pub use channel::{
    AssertExchangeCall,
    AssertQueueCall,
    BindExchangeCall,
    BindQueueCall,
    EXCLUSIVE_QUEUE,
    PublishCall,
    SendToQueueCall,
    StubChannel,
};
pub use connection::{StubConnection, StubConnector};
pub use history::CallHistory;

use crate::registry::QueueHandlerRegistry;

/// Build a connector, connection and channel sharing `registry`.
#[must_use]
pub fn stub_pair(registry: Arc<QueueHandlerRegistry>) -> (Arc<StubConnector>, Arc<StubChannel>) {
    let channel = Arc::new(StubChannel::new(registry));
    let connection = Arc::new(StubConnection::new(Arc::clone(&channel)));
    (Arc::new(StubConnector::new(connection)), channel)
}
