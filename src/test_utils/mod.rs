//! Mocks and assertion helpers for exercising the sync core without a network.
//!
//! Enabled for the crate's own tests and, for downstream crates, through the `test-utils` feature.

#[macro_use]
pub mod macros;
mod mocks;
mod recorder;

pub use mocks::{EndpointBehavior, MockProbe, MockRpcClient};
pub use recorder::EventRecorder;
