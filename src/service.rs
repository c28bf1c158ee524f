//! Contract between the harness and the service under test.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{broker::Connector, error::BoxError};

/// Configuration handed to [`Service::start`].
#[derive(Clone)]
pub struct ServiceConfig {
    /// Logical identity of this broker binding.
    pub broker_path: String,
    /// Broker client the service must connect through.
    pub amqp: Arc<dyn Connector>,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("broker_path", &self.broker_path)
            .finish_non_exhaustive()
    }
}

/// A queue-driven service the harness can start and drive.
///
/// `start` must finish declaring its topology and registering its consumer
/// before it returns; the harness issues no scripted step until then.
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use queue_harness::{BoxError, Service, ServiceConfig};
///
/// struct Orders;
///
/// #[async_trait]
/// impl Service for Orders {
///     fn name(&self) -> &str { "orders" }
///
///     async fn start(&self, config: ServiceConfig) -> Result<(), BoxError> {
///         let connection = config.amqp.connect().await?;
///         let channel = connection.create_channel().await?;
///         // declare topology and call `channel.consume(self.name(), ...)`
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync {
    /// Queue the service consumes from.
    fn name(&self) -> &str;

    /// Connect through `config.amqp` and wire up consumers.
    async fn start(&self, config: ServiceConfig) -> Result<(), BoxError>;
}
