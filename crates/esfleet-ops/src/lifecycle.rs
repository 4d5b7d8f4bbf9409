//! Restart, shutdown and instance stop commands.
//!
//! Command endpoints return an empty acknowledgement rather than a change
//! ticket, so tracking targets the cluster named in the parameters.

use crate::cluster::ClusterParams;
use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::{instrumented, track_if_requested};
use crate::track::{check_track, TrackParams, TrackReport};
use crate::validate::api;
use esfleet_api::cluster::{RestartOptions, ShutdownOptions, StopInstancesOptions};
use esfleet_api::ResourceRef;

#[derive(Debug, Default)]
pub struct RestartParams {
    pub cluster: ClusterParams,
    pub skip_snapshot: bool,
    pub restore_snapshot: bool,
    pub cancel_pending: bool,
    /// Restart instances grouped by this attribute instead of all at once.
    pub group_by: Option<String>,
    pub track: Option<TrackParams>,
}

impl RestartParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch restart");
        merr.merge_result(self.cluster.validate());
        if self.group_by.as_deref().is_some_and(|g| g.trim().is_empty()) {
            merr.push("group by attribute cannot be empty");
        }
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

pub async fn restart(mut params: RestartParams) -> Result<Option<TrackReport>> {
    params.validate()?;
    let id = params.cluster.cluster_id.clone();
    instrumented("elasticsearch restart", &id, async {
        let api = api(&params.cluster.api)?;
        let opts = RestartOptions {
            cancel_pending: params.cancel_pending,
            restore_snapshot: params.restore_snapshot,
            skip_snapshot: params.skip_snapshot,
            group_attribute: params.group_by.clone(),
        };
        api.restart_cluster(&id, &opts).await?;
        track_if_requested(api, ResourceRef::elasticsearch(&id), params.track.as_mut(), true).await
    })
    .await
}

#[derive(Debug, Default)]
pub struct ShutdownParams {
    pub cluster: ClusterParams,
    /// Hide the cluster from listings once it is stopped.
    pub hide: bool,
    pub skip_snapshot: bool,
    pub track: Option<TrackParams>,
}

impl ShutdownParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch shutdown");
        merr.merge_result(self.cluster.validate());
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

pub async fn shutdown(mut params: ShutdownParams) -> Result<Option<TrackReport>> {
    params.validate()?;
    let id = params.cluster.cluster_id.clone();
    instrumented("elasticsearch shutdown", &id, async {
        let api = api(&params.cluster.api)?;
        let opts = ShutdownOptions {
            hide: params.hide,
            skip_snapshot: params.skip_snapshot,
        };
        api.shutdown_cluster(&id, &opts).await?;
        track_if_requested(api, ResourceRef::elasticsearch(&id), params.track.as_mut(), true).await
    })
    .await
}

#[derive(Debug, Default)]
pub struct StopParams {
    pub cluster: ClusterParams,
    /// Instances to stop. Empty stops every instance.
    pub instances: Vec<String>,
    pub ignore_missing: bool,
    pub track: Option<TrackParams>,
}

impl StopParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch stop");
        merr.merge_result(self.cluster.validate());
        if self.instances.iter().any(|i| i.trim().is_empty()) {
            merr.push("instance names cannot be empty");
        }
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

pub async fn stop(mut params: StopParams) -> Result<Option<TrackReport>> {
    params.validate()?;
    let id = params.cluster.cluster_id.clone();
    instrumented("elasticsearch stop", &id, async {
        let api = api(&params.cluster.api)?;
        let opts = StopInstancesOptions {
            ignore_missing: params.ignore_missing,
        };
        api.stop_instances(&id, &params.instances, &opts).await?;
        track_if_requested(api, ResourceRef::elasticsearch(&id), params.track.as_mut(), true).await
    })
    .await
}
