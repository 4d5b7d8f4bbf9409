#![warn(missing_docs)]

//! esfleet remote control-plane client: wire models, error mapping, HTTP façade.

pub mod cluster;
pub mod config;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod plan;
pub mod platform;
pub mod remote;
pub mod users;

pub use cluster::{ChangeTicket, ClusterKind, MutationResponse, ResourceRef};
pub use config::{request_timeout, ApiConfig, Credentials};
pub use error::{ApiError, Result};
pub use http::HttpApi;
pub use remote::RemoteApi;
