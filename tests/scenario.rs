//! End-to-end scenarios driving the sample services through the harness.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use queue_harness::{
    CallKind,
    EXCLUSIVE_QUEUE,
    Harness,
    HarnessConfig,
    HarnessError,
    HarnessState,
    broker::{BrokerError, QueueOptions},
};
use queue_harness_testing::{
    FailingService,
    OrderService,
    QuoteService,
    SilentService,
    TestResult,
};
use rstest::{fixture, rstest};
use serde::Serialize;
use serde_json::json;

#[fixture]
fn order_service() -> Arc<OrderService> { Arc::new(OrderService::new()) }

#[rstest]
#[tokio::test]
async fn confirms_a_created_order(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    let checked = AtomicBool::new(false);

    harness
        .emit("order.created", json!({"sku": "X"}))
        .expect_emitted("order.confirmed", json!({"id": 1}))
        .end(|| checked.store(true, Ordering::SeqCst))
        .await?;

    assert!(checked.load(Ordering::SeqCst));
    assert_eq!(harness.state(), HarnessState::Ended);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn expectations_follow_publish_order(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    harness
        .emit("order.created", json!({"sku": "A"}))
        .emit("order.cancelled", json!({"sku": "A"}))
        .emit("order.created", json!({"sku": "B"}))
        .expect_emitted("order.confirmed", json!({"id": 1}))
        .expect_emitted("order.refunded", json!({"sku": "A"}))
        .expect_emitted("order.confirmed", json!({"id": 2}))
        .expect_quiet()
        .end(|| {})
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn steps_can_be_split_across_scenarios(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    harness.emit("order.created", json!({})).await?;
    assert_eq!(harness.unmatched(CallKind::Publish), 1);

    harness
        .expect_emitted("order.confirmed", json!({"id": 1}))
        .await?;
    assert_eq!(harness.unmatched(CallKind::Publish), 0);

    harness.scenario().end(|| {}).await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn wrong_payload_fails_and_skips_the_check(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    let checked = AtomicBool::new(false);

    let err = harness
        .emit("order.created", json!({"sku": "X"}))
        .expect_emitted("order.confirmed", json!({"id": 7}))
        .end(|| checked.store(true, Ordering::SeqCst))
        .await
        .expect_err("payload differs");

    assert!(err.is_assertion());
    let mismatch = err.mismatch().expect("mismatch details");
    assert_eq!(mismatch.actual(), &json!({"id": 1}));
    assert!(!checked.load(Ordering::SeqCst));
    assert_eq!(harness.state(), HarnessState::Ended);
    Ok(())
}

#[rstest]
#[case(1.532_934_923_937_696_9e-28)]
#[case(3.156_587_168_203_050_7e109)]
#[case(0.1)]
#[tokio::test]
async fn echoed_float_payload_matches_exactly(
    order_service: Arc<OrderService>,
    #[case] amount: f64,
) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    harness
        .emit("order.cancelled", json!({"amount": amount}))
        .expect_emitted("order.refunded", json!({"amount": amount}))
        .end(|| {})
        .await?;
    Ok(())
}

#[derive(Serialize)]
struct QuoteRequest<'a> {
    sku: &'a str,
}

#[tokio::test]
async fn quote_requests_are_answered_on_the_reply_queue() -> TestResult {
    let mut harness = Harness::start(Arc::new(QuoteService)).await?;
    harness
        .request("quote.requested", QuoteRequest { sku: "X" })
        .expect_replied(json!({"sku": "X", "price": QuoteService::PRICE}))
        .expect_quiet()
        .end(|| {})
        .await?;

    let reply = harness.channel().replies().get(0).expect("reply recorded");
    assert_eq!(reply.queue, HarnessConfig::DEFAULT_REPLY_QUEUE);
    Ok(())
}

#[tokio::test]
async fn emitted_quote_request_has_nowhere_to_reply() -> TestResult {
    let mut harness = Harness::start(Arc::new(QuoteService)).await?;
    let err = harness
        .emit("quote.requested", json!({"sku": "X"}))
        .await
        .expect_err("no reply queue");
    assert!(matches!(err, HarnessError::Handler { queue, .. } if queue == "quotes"));
    Ok(())
}

#[tokio::test]
async fn custom_reply_queue_is_used() -> TestResult {
    let config = HarnessConfig::default().with_reply_queue("pricing.replies");
    let mut harness = Harness::start_with(Arc::new(QuoteService), config).await?;
    harness
        .request("quote.requested", json!({"sku": "Y"}))
        .expect_replied(json!({"sku": "Y", "price": 42}))
        .await?;
    let reply = harness.channel().replies().get(0).expect("reply recorded");
    assert_eq!(reply.queue, "pricing.replies");
    Ok(())
}

#[tokio::test]
async fn service_reply_queue_resolves_to_exclusive_name() -> TestResult {
    let harness = Harness::start(Arc::new(QuoteService)).await?;
    let declared = harness.channel().asserted_queues().snapshot();
    assert!(
        declared
            .iter()
            .any(|call| call.queue.is_empty() && call.options == QueueOptions::exclusive())
    );
    assert!(harness.registry().contains(EXCLUSIVE_QUEUE));
    assert_eq!(
        harness.registry().queues(),
        vec![EXCLUSIVE_QUEUE.to_owned(), QuoteService::QUEUE.to_owned()]
    );
    Ok(())
}

#[tokio::test]
async fn service_without_consumer_reports_missing_handler() -> TestResult {
    let mut harness = Harness::start(Arc::new(SilentService)).await?;
    let err = harness
        .emit("anything", json!({}))
        .end(|| {})
        .await
        .expect_err("no consumer");
    assert!(matches!(err, HarnessError::HandlerNotFound { queue } if queue == "silent"));
    Ok(())
}

#[tokio::test]
async fn failing_start_is_reported() {
    let err = Harness::start(Arc::new(FailingService))
        .await
        .expect_err("start fails");
    assert_eq!(err.to_string(), "service failed to start");
    let source = std::error::Error::source(&err).expect("start error keeps its cause");
    assert!(matches!(
        source.downcast_ref::<BrokerError>(),
        Some(BrokerError::Connect(reason)) if reason == "cannot reach broker"
    ));
    assert_eq!(source.to_string(), "connection failed: cannot reach broker");
}

#[rstest]
#[tokio::test]
async fn ended_harness_rejects_further_steps(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    harness.scenario().end(|| {}).await?;

    let err = harness
        .emit("order.created", json!({}))
        .await
        .expect_err("harness ended");
    assert!(matches!(err, HarnessError::Ended));

    let err = harness
        .scenario()
        .end(|| {})
        .await
        .expect_err("already ended");
    assert!(matches!(err, HarnessError::Ended));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn finish_hands_the_outcome_to_the_callback(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    let mut outcome = Some(HarnessError::Ended);
    harness
        .emit("order.created", json!({}))
        .expect_emitted("order.shipped", json!({}))
        .finish(|| {}, |err| outcome = err)
        .await;
    assert!(matches!(
        outcome,
        Some(HarnessError::UnexpectedEvent { expected, actual })
            if expected == "order.shipped" && actual == "order.confirmed"
    ));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn within_bounds_each_step(order_service: Arc<OrderService>) -> TestResult {
    let mut harness = Harness::start(order_service).await?;
    harness
        .emit("order.created", json!({}))
        .expect_emitted("order.confirmed", json!({"id": 1}))
        .within(Duration::from_millis(500))
        .end(|| {})
        .await?;
    Ok(())
}
