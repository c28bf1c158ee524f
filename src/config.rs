//! Harness configuration.
//!
//! [`HarnessConfig`] controls the identity the service sees, the metadata
//! stamped on simulated deliveries, the codec used to decode recorded
//! payloads and how long a single step may run.

use std::{fmt, sync::Arc, time::Duration};

use crate::codec::{Codec, JsonCodec};

/// Settings applied when starting a [`crate::Harness`].
///
/// ```
/// use std::time::Duration;
///
/// use queue_harness::HarnessConfig;
///
/// let config = HarnessConfig::default()
///     .with_broker_path("billing")
///     .with_step_timeout(Duration::from_millis(250));
/// assert_eq!(config.broker_path(), "billing");
/// ```
#[derive(Clone)]
pub struct HarnessConfig {
    pub(crate) broker_path: String,
    pub(crate) reply_queue: String,
    pub(crate) correlation_prefix: String,
    pub(crate) step_timeout: Duration,
    pub(crate) codec: Arc<dyn Codec>,
}

impl HarnessConfig {
    /// Broker path passed to the service by default.
    pub const DEFAULT_BROKER_PATH: &'static str = "harness";
    /// Reply queue stamped on `request` deliveries by default.
    pub const DEFAULT_REPLY_QUEUE: &'static str = "harness.reply";
    /// Prefix of generated correlation identifiers.
    pub const DEFAULT_CORRELATION_PREFIX: &'static str = "harness";
    /// Time a single step may take by default.
    pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Set the broker path handed to the service.
    #[must_use]
    pub fn with_broker_path(mut self, broker_path: impl Into<String>) -> Self {
        self.broker_path = broker_path.into();
        self
    }

    /// Set the reply queue stamped on `request` deliveries.
    ///
    /// An empty name is ignored so requests always carry a reply queue.
    #[must_use]
    pub fn with_reply_queue(mut self, reply_queue: impl Into<String>) -> Self {
        let reply_queue = reply_queue.into();
        if !reply_queue.is_empty() {
            self.reply_queue = reply_queue;
        }
        self
    }

    /// Set the prefix of generated correlation identifiers.
    #[must_use]
    pub fn with_correlation_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.correlation_prefix = prefix.into();
        self
    }

    /// Set the time a single step may take.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Set the codec used to decode recorded payloads.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Broker path handed to the service.
    #[must_use]
    pub fn broker_path(&self) -> &str { &self.broker_path }

    /// Reply queue stamped on `request` deliveries.
    #[must_use]
    pub fn reply_queue(&self) -> &str { &self.reply_queue }

    /// Prefix of generated correlation identifiers.
    #[must_use]
    pub fn correlation_prefix(&self) -> &str { &self.correlation_prefix }

    /// Time a single step may take.
    #[must_use]
    pub fn step_timeout(&self) -> Duration { self.step_timeout }

    /// Codec used to decode recorded payloads.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn Codec> { &self.codec }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            broker_path: Self::DEFAULT_BROKER_PATH.to_owned(),
            reply_queue: Self::DEFAULT_REPLY_QUEUE.to_owned(),
            correlation_prefix: Self::DEFAULT_CORRELATION_PREFIX.to_owned(),
            step_timeout: Self::DEFAULT_STEP_TIMEOUT,
            codec: Arc::new(JsonCodec),
        }
    }
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("broker_path", &self.broker_path)
            .field("reply_queue", &self.reply_queue)
            .field("correlation_prefix", &self.correlation_prefix)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}
