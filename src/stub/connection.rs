//! Connection and connector stubs that always resolve to the shared channel.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::channel::StubChannel;
use crate::broker::{BrokerError, Channel, Connection, Connector};

/// Connection stub handing out a single shared [`StubChannel`].
#[derive(Debug)]
pub struct StubConnection {
    channel: Arc<StubChannel>,
    channels_created: AtomicUsize,
    closes: AtomicUsize,
}

impl StubConnection {
    /// Wrap `channel` in a connection.
    #[must_use]
    pub fn new(channel: Arc<StubChannel>) -> Self {
        Self {
            channel,
            channels_created: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// The channel every `create_channel` call returns.
    #[must_use]
    pub fn channel(&self) -> &Arc<StubChannel> { &self.channel }

    /// Number of `create_channel` calls.
    #[must_use]
    pub fn channels_created(&self) -> usize { self.channels_created.load(Ordering::SeqCst) }

    /// Number of `close` calls.
    #[must_use]
    pub fn close_count(&self) -> usize { self.closes.load(Ordering::SeqCst) }
}

#[async_trait]
impl Connection for StubConnection {
    async fn create_channel(&self) -> Result<Arc<dyn Channel>, BrokerError> {
        self.channels_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.channel.clone())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector stub whose `connect` always yields the same [`StubConnection`].
#[derive(Debug)]
pub struct StubConnector {
    connection: Arc<StubConnection>,
    connects: AtomicUsize,
}

impl StubConnector {
    /// Wrap `connection` in a connector.
    #[must_use]
    pub fn new(connection: Arc<StubConnection>) -> Self {
        Self {
            connection,
            connects: AtomicUsize::new(0),
        }
    }

    /// The connection every `connect` call returns.
    #[must_use]
    pub fn connection(&self) -> &Arc<StubConnection> { &self.connection }

    /// Number of `connect` calls.
    #[must_use]
    pub fn connect_count(&self) -> usize { self.connects.load(Ordering::SeqCst) }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self) -> Result<Arc<dyn Connection>, BrokerError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.connection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::QueueHandlerRegistry;

    #[tokio::test]
    async fn every_channel_is_the_shared_stub() {
        let channel = Arc::new(StubChannel::new(Arc::new(QueueHandlerRegistry::new())));
        let connector = StubConnector::new(Arc::new(StubConnection::new(Arc::clone(&channel))));

        let connection = connector.connect().await.expect("connect");
        let first = connection.create_channel().await.expect("create_channel");
        let second = connection.create_channel().await.expect("create_channel");
        first.prefetch(1).await.expect("prefetch");
        second.prefetch(2).await.expect("prefetch");
        connection.close().await.expect("close");

        assert_eq!(channel.prefetches().snapshot(), vec![1, 2]);
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(connector.connection().channels_created(), 2);
        assert_eq!(connector.connection().close_count(), 1);
    }
}
