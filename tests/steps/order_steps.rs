//! Step definitions for order flow behavioural tests.

use cucumber::{given, then, when};
use queue_harness::HarnessError;
use serde_json::json;

use crate::world::OrderWorld;

#[given("an order service under test")]
async fn order_service(world: &mut OrderWorld) { world.start().await; }

#[when(regex = r#"^the order "(\S+)" is created$"#)]
async fn order_created(world: &mut OrderWorld, sku: String) {
    world.create_order(&sku).await;
    world.assert_succeeded();
}

#[when("the harness is ended")]
async fn harness_ended(world: &mut OrderWorld) {
    world.end().await;
    world.assert_succeeded();
}

#[then(regex = r"^an order confirmation with id (\d+) is emitted$")]
async fn confirmation_emitted(world: &mut OrderWorld, id: u64) {
    world.expect_event("order.confirmed", json!({ "id": id })).await;
    world.assert_succeeded();
}

#[then("nothing else was published")]
async fn nothing_else(world: &mut OrderWorld) {
    world.expect_quiet().await;
    world.assert_succeeded();
}

#[then(regex = r#"^expecting "(\S+)" fails with an unexpected event$"#)]
async fn unexpected_event(world: &mut OrderWorld, event: String) {
    world.expect_event(&event, json!({})).await;
    let err = world.take_error();
    assert!(
        matches!(&err, HarnessError::UnexpectedEvent { expected, .. } if *expected == event),
        "unexpected error: {err}"
    );
}

#[then("creating an order fails because the harness ended")]
async fn create_after_end(world: &mut OrderWorld) {
    world.create_order("late").await;
    let err = world.take_error();
    assert!(matches!(err, HarnessError::Ended), "unexpected error: {err}");
}
