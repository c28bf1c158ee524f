//! Step definitions for the behaviour suite.

mod order_steps;
