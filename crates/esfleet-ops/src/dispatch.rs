//! Response dispatch for mutating calls.
//!
//! A mutation yields either a created or an accepted ticket. The populated one
//! is selected, its cluster identifier extracted, and the plan tracked when
//! the caller asked for it.

use crate::error::{OpError, Result};
use crate::track::{track, TrackParams, TrackReport};
use esfleet_api::{ChangeTicket, MutationResponse, RemoteApi};
use tracing::debug;

pub const EMPTY_RESPONSE: &str = "One of Create or Update response must be populated";

/// Picks the populated ticket. A created ticket wins over an accepted one.
pub fn select_ticket(
    created: Option<ChangeTicket>,
    updated: Option<ChangeTicket>,
) -> Result<ChangeTicket> {
    created
        .or(updated)
        .ok_or_else(|| OpError::Response(EMPTY_RESPONSE.to_string()))
}

/// Splits a mutation outcome into its created and accepted halves.
pub fn split(response: MutationResponse) -> (Option<ChangeTicket>, Option<ChangeTicket>) {
    match response {
        MutationResponse::Created(t) => (Some(t), None),
        MutationResponse::Accepted(t) => (None, Some(t)),
    }
}

/// Result of a dispatched mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub ticket: ChangeTicket,
    /// Present when the plan was tracked.
    pub report: Option<TrackReport>,
}

pub struct ResponseParams<'a> {
    pub api: &'a dyn RemoteApi,
    pub created: Option<ChangeTicket>,
    pub updated: Option<ChangeTicket>,
    pub track: Option<&'a mut TrackParams>,
    /// Default downstream policy of the calling operation.
    pub ignore_downstream: bool,
}

pub async fn handle_response(params: ResponseParams<'_>) -> Result<Dispatched> {
    let ticket = select_ticket(params.created, params.updated)?;

    let Some(track_params) = params.track else {
        return Ok(Dispatched {
            ticket,
            report: None,
        });
    };

    let resource = ticket.resource().ok_or_else(|| {
        OpError::Response("change ticket carries no cluster identifier".to_string())
    })?;
    debug!(%resource, "tracking change");
    let report = track(params.api, resource, track_params, params.ignore_downstream).await?;

    Ok(Dispatched {
        ticket,
        report: Some(report),
    })
}

/// Shorthand for [`handle_response`] on a single mutation outcome.
pub async fn dispatch(
    api: &dyn RemoteApi,
    response: MutationResponse,
    track: Option<&mut TrackParams>,
    ignore_downstream: bool,
) -> Result<Dispatched> {
    let (created, updated) = split(response);
    handle_response(ResponseParams {
        api,
        created,
        updated,
        track,
        ignore_downstream,
    })
    .await
}
