//! Instance reallocation.
//!
//! Moves instances of a cluster off their current allocators. Without an
//! explicit instance list every instance of the cluster's topology moves.
//! A note naming the moved instances is attached first on a best-effort basis.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::{best_effort, instrumented, track_if_requested};
use crate::track::{check_track, TrackParams, TrackReport};
use crate::validate::{api, check_api, check_cluster_id, ApiHandle};
use esfleet_api::cluster::{MoveOptions, Note, ShowOptions};
use esfleet_api::{ClusterKind, RemoteApi, ResourceRef};
use tracing::debug;

pub struct ReallocateParams {
    pub api: ApiHandle,
    pub cluster_id: String,
    pub kind: ClusterKind,
    /// Instances to move. Empty moves every instance.
    pub instances: Vec<String>,
    /// Recorded on the note attached before the move.
    pub user_id: Option<String>,
    /// Move even when the plan would otherwise be rejected.
    pub force: bool,
    pub ignore_missing: bool,
    pub track: Option<TrackParams>,
}

impl Default for ReallocateParams {
    fn default() -> Self {
        Self {
            api: None,
            cluster_id: String::new(),
            kind: ClusterKind::Elasticsearch,
            instances: Vec::new(),
            user_id: None,
            force: false,
            ignore_missing: false,
            track: None,
        }
    }
}

impl ReallocateParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("reallocate");
        check_api(&self.api, &mut merr);
        check_cluster_id(&self.cluster_id, &mut merr);
        if self.kind != ClusterKind::Elasticsearch && self.instances.is_empty() {
            merr.push(format!(
                "instances must be specified for {} clusters",
                self.kind.as_path()
            ));
        }
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

async fn topology_instances(api: &dyn RemoteApi, id: &str) -> Result<Vec<String>> {
    let info = api.get_cluster(id, &ShowOptions::default()).await?;
    Ok(info
        .instances()
        .iter()
        .map(|i| i.instance_name.clone())
        .collect())
}

pub fn note_message(instances: &[String]) -> String {
    format!("Moving instances [{}]", instances.join(", "))
}

pub async fn reallocate(mut params: ReallocateParams) -> Result<Option<TrackReport>> {
    params.validate()?;
    let id = params.cluster_id.clone();

    instrumented("reallocate", &id, async {
        let api = api(&params.api)?;
        let instances = if params.instances.is_empty() {
            topology_instances(api, &id).await?
        } else {
            params.instances.clone()
        };
        debug!(count = instances.len(), "moving instances");

        let note = Note {
            message: note_message(&instances),
            user_id: params.user_id.clone(),
        };
        best_effort("note", api.add_note(params.kind, &id, &note)).await;

        let opts = MoveOptions {
            force_update: params.force,
            ignore_missing: params.ignore_missing,
            ..MoveOptions::default()
        };
        api.move_instances(params.kind, &id, &instances, None, &opts)
            .await?;

        track_if_requested(
            api,
            ResourceRef::new(params.kind, id.clone()),
            params.track.as_mut(),
            true,
        )
        .await
    })
    .await
}
