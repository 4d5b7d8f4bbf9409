//! esfleet end-to-end tests
//!
//! Operation scenarios driven through the scripted control plane, and the same
//! flows driven through the HTTP client against a local axum server.

pub mod harness;
pub mod http_flows;
pub mod scenarios;

pub use harness::{handle, serve, CaptureWriter};
