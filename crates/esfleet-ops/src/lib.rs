#![warn(missing_docs)]

//! esfleet operations: validated fleet operations, plan tracking, upgrade planning.

pub mod apikey;
pub mod cluster;
pub mod diagnose;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod keystore;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod multierror;
pub mod pipeline;
pub mod planner;
pub mod proxy;
pub mod query;
pub mod reallocate;
pub mod repository;
pub mod repository_config;
pub mod resync;
pub mod track;
pub mod upgrade;
pub mod user;
pub mod validate;
pub mod version;

#[cfg(test)]
mod test_support;

pub use dispatch::{dispatch, handle_response, Dispatched, ResponseParams};
pub use error::{ConfigError, OpError, Result};
pub use multierror::MultiError;
pub use planner::plan_upgrade;
pub use track::{track, TrackParams, TrackReport};
pub use validate::ApiHandle;
pub use version::Version;
