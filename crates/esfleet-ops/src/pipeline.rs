//! Glue shared by every operation: spans, best-effort side effects and
//! optional tracking of command endpoints.

use crate::error::Result;
use crate::track::{track, TrackParams, TrackReport};
use esfleet_api::{RemoteApi, ResourceRef};
use std::fmt::Display;
use std::future::Future;
use tracing::{info, info_span, warn, Instrument};

/// Runs an operation body inside a span carrying the operation name and its
/// target, logging the outcome.
pub async fn instrumented<T, F>(operation: &'static str, target: &str, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let span = info_span!("operation", op = operation, resource = target);
    async move {
        info!("started");
        let result = body.await;
        match &result {
            Ok(_) => info!("finished"),
            Err(e) => info!(error = %e, "failed"),
        }
        result
    }
    .instrument(span)
    .await
}

/// Awaits a side effect whose failure must not fail the operation. Failures
/// are logged at warn level.
pub async fn best_effort<T, E, F>(what: &str, fut: F) -> Option<T>
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(what, error = %e, "best-effort step failed");
            None
        }
    }
}

/// Tracks `resource` when the caller supplied tracking parameters.
pub async fn track_if_requested(
    api: &dyn RemoteApi,
    resource: ResourceRef,
    params: Option<&mut TrackParams>,
    ignore_downstream: bool,
) -> Result<Option<TrackReport>> {
    match params {
        Some(params) => Ok(Some(track(api, resource, params, ignore_downstream).await?)),
        None => Ok(None),
    }
}
