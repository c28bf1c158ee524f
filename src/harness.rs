//! Scripting harness driving a service through the broker stubs.
//!
//! [`Harness::start`] injects a [`StubConnector`] into the service and waits
//! for its start sequence to finish. Scripting calls then return a
//! [`Scenario`] that queues steps and runs them strictly in order once
//! awaited.
//!
//! ```rust,ignore
//! let mut harness = Harness::start(Arc::new(OrderService::new())).await?;
//! harness
//!     .emit("order.created", json!({"sku": "X"}))
//!     .expect_emitted("order.confirmed", json!({"id": 1}))
//!     .end(|| {})
//!     .await?;
//! ```

use std::{fmt, sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument as _;

use crate::{
    codec::{ContentType, Payload},
    config::HarnessConfig,
    error::{CallKind, HarnessError, Result},
    matching::{self, Cursors},
    message::{DeliveryFields, Headers, Message, MessageProperties},
    registry::QueueHandlerRegistry,
    scenario::{Scenario, Step},
    service::{Service, ServiceConfig},
    stub::{self, StubChannel, StubConnector},
};

/// Lifecycle of a [`Harness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarnessState {
    /// Stubs exist but the service has not been started.
    Constructed,
    /// The service's start sequence is running.
    Starting,
    /// Scripted steps may run.
    Ready,
    /// `end` has run; no further steps are accepted.
    Ended,
}

/// Drives a [`Service`] through in-memory broker stubs.
pub struct Harness {
    service: Arc<dyn Service>,
    config: HarnessConfig,
    registry: Arc<QueueHandlerRegistry>,
    connector: Arc<StubConnector>,
    channel: Arc<StubChannel>,
    cursors: Cursors,
    deliveries: u64,
    state: HarnessState,
}

impl Harness {
    fn new(service: Arc<dyn Service>, config: HarnessConfig) -> Self {
        let registry = Arc::new(QueueHandlerRegistry::new());
        let (connector, channel) = stub::stub_pair(Arc::clone(&registry));
        Self {
            service,
            config,
            registry,
            connector,
            channel,
            cursors: Cursors::default(),
            deliveries: 0,
            state: HarnessState::Constructed,
        }
    }

    /// Start `service` with the default [`HarnessConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Start`] if the service fails to start, or
    /// [`HarnessError::StepTimeout`] if it does not finish in time.
    pub async fn start(service: Arc<dyn Service>) -> Result<Self> {
        Self::start_with(service, HarnessConfig::default()).await
    }

    /// Start `service` with `config`.
    ///
    /// The returned harness is always [`HarnessState::Ready`]: the service's
    /// topology declarations and consumer registration have completed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Start`] if the service fails to start, or
    /// [`HarnessError::StepTimeout`] if it does not finish in time.
    pub async fn start_with(service: Arc<dyn Service>, config: HarnessConfig) -> Result<Self> {
        let mut harness = Self::new(service, config);
        tracing::debug!(service = %harness.service.name(), "harness created");

        harness.state = HarnessState::Starting;
        let service_config = ServiceConfig {
            broker_path: harness.config.broker_path.clone(),
            amqp: harness.connector.clone(),
        };
        let timeout = harness.config.step_timeout;
        let started = tokio::time::timeout(timeout, harness.service.start(service_config)).await;
        match started {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                tracing::error!(
                    service = %harness.service.name(),
                    error = %source,
                    "service failed to start"
                );
                return Err(HarnessError::Start(source));
            }
            Err(_) => {
                tracing::error!(service = %harness.service.name(), ?timeout, "service start timed out");
                return Err(HarnessError::StepTimeout {
                    step: "start".to_owned(),
                    timeout,
                });
            }
        }

        harness.state = HarnessState::Ready;
        tracing::info!(
            service = %harness.service.name(),
            broker_path = %harness.config.broker_path,
            "service started"
        );
        Ok(harness)
    }

    /// Begin an empty scenario.
    pub fn scenario(&mut self) -> Scenario<'_> { Scenario::new(self) }

    /// Deliver `event` with `data` to the service's queue.
    pub fn emit(&mut self, event: impl Into<String>, data: impl Serialize) -> Scenario<'_> {
        self.scenario().emit(event, data)
    }

    /// Deliver `event` with `data` and a reply queue to the service's queue.
    pub fn request(&mut self, event: impl Into<String>, data: impl Serialize) -> Scenario<'_> {
        self.scenario().request(event, data)
    }

    /// Expect the oldest unmatched publish to be `event` carrying `data`.
    pub fn expect_emitted(
        &mut self,
        event: impl Into<String>,
        data: impl Serialize,
    ) -> Scenario<'_> {
        self.scenario().expect_emitted(event, data)
    }

    /// Expect the oldest unmatched reply to carry `data`.
    pub fn expect_replied(&mut self, data: impl Serialize) -> Scenario<'_> {
        self.scenario().expect_replied(data)
    }

    /// Expect every publish and reply to have been matched.
    pub fn expect_quiet(&mut self) -> Scenario<'_> { self.scenario().expect_quiet() }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HarnessState { self.state }

    /// Configuration in force.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig { &self.config }

    /// Queue the service consumes from.
    #[must_use]
    pub fn service_name(&self) -> &str { self.service.name() }

    /// Stub channel holding every recorded call.
    #[must_use]
    pub fn channel(&self) -> &StubChannel { &self.channel }

    /// Stub connector handed to the service.
    #[must_use]
    pub fn connector(&self) -> &StubConnector { &self.connector }

    /// Consumers registered by the service.
    #[must_use]
    pub fn registry(&self) -> &QueueHandlerRegistry { &self.registry }

    /// Number of recorded calls of `kind` no expectation has matched yet.
    #[must_use]
    pub fn unmatched(&self, kind: CallKind) -> usize {
        let recorded = match kind {
            CallKind::Publish => self.channel.publishes().len(),
            CallKind::Reply => self.channel.replies().len(),
        };
        self.cursors.pending(kind, recorded)
    }

    pub(crate) async fn run_step(&mut self, step: Step, timeout: Duration) -> Result<()> {
        if self.state == HarnessState::Ended {
            return Err(HarnessError::Ended);
        }
        let label = step.label();
        let span = tracing::debug_span!("harness.step", step = %label);
        match tokio::time::timeout(timeout, self.execute(step).instrument(span)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(step = %label, ?timeout, "step timed out");
                Err(HarnessError::StepTimeout {
                    step: label,
                    timeout,
                })
            }
        }
    }

    pub(crate) fn finalize(&mut self) {
        if self.state != HarnessState::Ended {
            self.state = HarnessState::Ended;
            tracing::debug!(service = %self.service.name(), "harness ended");
        }
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        match step {
            Step::Emit { event, data } => self.deliver(event, data, None).await,
            Step::Request { event, data } => {
                let reply_to = self.config.reply_queue.clone();
                self.deliver(event, data, Some(reply_to)).await
            }
            Step::ExpectEmitted { event, data } => self.match_publish(&event, data),
            Step::ExpectReplied { data } => self.match_reply(data),
            Step::ExpectQuiet => self.check_quiet(),
        }
    }

    async fn deliver(&mut self, event: String, data: Value, reply_to: Option<String>) -> Result<()> {
        let queue = self.service.name().to_owned();
        let Some(handler) = self.registry.get(&queue) else {
            return Err(HarnessError::HandlerNotFound { queue });
        };

        self.deliveries += 1;
        let message = Message {
            properties: MessageProperties {
                correlation_id: format!("{}-{}", self.config.correlation_prefix, self.deliveries),
                headers: Headers {
                    content_type: ContentType::Buffer,
                },
                reply_to,
            },
            fields: DeliveryFields {
                routing_key: event,
                exchange: String::new(),
                delivery_tag: self.deliveries,
                redelivered: false,
            },
            content: Payload::Passthrough(data),
        };
        tracing::debug!(
            queue = %queue,
            routing_key = %message.routing_key(),
            reply_to = ?message.reply_to(),
            "delivering event"
        );

        handler(message)
            .await
            .map_err(|source| HarnessError::Handler { queue, source })
    }

    fn match_publish(&mut self, event: &str, expected: Value) -> Result<()> {
        let position = self.cursors.position(CallKind::Publish);
        let Some(call) = self.channel.publishes().get(position) else {
            return Err(HarnessError::NotEmitted {
                event: event.to_owned(),
                expected,
            });
        };
        if call.routing_key != event {
            return Err(HarnessError::UnexpectedEvent {
                expected: event.to_owned(),
                actual: call.routing_key,
            });
        }

        let actual = self.decode_like(&expected, &call.payload)?;
        matching::compare(format!("event `{event}`"), &expected, &actual)?;
        self.cursors.advance(CallKind::Publish);
        tracing::debug!(event, "matched publish");
        Ok(())
    }

    fn match_reply(&mut self, expected: Value) -> Result<()> {
        let position = self.cursors.position(CallKind::Reply);
        let Some(call) = self.channel.replies().get(position) else {
            return Err(HarnessError::NotReplied { expected });
        };

        let actual = self.decode_like(&expected, &call.payload)?;
        matching::compare("reply", &expected, &actual)?;
        self.cursors.advance(CallKind::Reply);
        tracing::debug!(queue = %call.queue, "matched reply");
        Ok(())
    }

    fn check_quiet(&self) -> Result<()> {
        for kind in [CallKind::Publish, CallKind::Reply] {
            let count = self.unmatched(kind);
            if count > 0 {
                return Err(HarnessError::Unconsumed { kind, count });
            }
        }
        Ok(())
    }

    /// Decode `payload` with the content type the codec picks for `expected`.
    fn decode_like(&self, expected: &Value, payload: &Payload) -> Result<Value> {
        let codec = &self.config.codec;
        let content_type = codec.encode(expected)?.content_type;
        Ok(codec.decode(content_type, payload)?)
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("service", &self.service.name())
            .field("state", &self.state)
            .field("cursors", &self.cursors)
            .field("deliveries", &self.deliveries)
            .finish_non_exhaustive()
    }
}
