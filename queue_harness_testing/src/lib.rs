//! Sample services and fixtures for testing with
//! [`Harness`](queue_harness::Harness).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use queue_harness::Harness;
//! use queue_harness_testing::{OrderService, TestResult};
//! use serde_json::json;
//!
//! # async fn example() -> TestResult {
//! let mut harness = Harness::start(Arc::new(OrderService::new())).await?;
//! harness
//!     .emit("order.created", json!({"sku": "X"}))
//!     .expect_emitted("order.confirmed", json!({"id": 1}))
//!     .end(|| {})
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod services;
pub mod strategies;

pub use logging::{LoggerHandle, logger};
pub use services::{EVENTS_EXCHANGE, FailingService, OrderService, QuoteService, SilentService};
pub use strategies::{json_scalars, json_values};

/// Shared result type for integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
