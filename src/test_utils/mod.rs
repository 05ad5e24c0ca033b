//! Helpers for exercising the driver without a real engine.
//!
//! Enabled for this crate's own tests and, through the `test-utils`
//! feature, for downstream test suites.

mod mock;
mod test_helpers;

pub use mock::{MockDriver, MockEvent, MockResponse};
pub use test_helpers::{create_test_row, test_config};
