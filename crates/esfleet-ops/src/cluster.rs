//! Elasticsearch cluster create, read, update and delete.

use crate::dispatch::{dispatch, Dispatched};
use crate::error::{OpError, Result};
use crate::filter::{filter_elasticsearch, filter_kibana};
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::track::{check_track, TrackParams};
use crate::validate::{api, check_api, check_cluster_id, ApiHandle};
use esfleet_api::cluster::{
    CreateElasticsearchClusterRequest, ElasticsearchClusterInfo, ElasticsearchClustersInfo,
    KibanaClustersInfo, ListOptions, ShowOptions,
};
use esfleet_api::plan::ElasticsearchClusterPlan;
use std::fmt;
use tracing::debug;

/// API handle plus the cluster an operation targets. Embedded by every
/// single-cluster parameter record.
#[derive(Clone, Default)]
pub struct ClusterParams {
    pub api: ApiHandle,
    pub cluster_id: String,
}

impl fmt::Debug for ClusterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterParams")
            .field("api", &self.api.is_some())
            .field("cluster_id", &self.cluster_id)
            .finish()
    }
}

impl ClusterParams {
    pub fn new(api: ApiHandle, cluster_id: impl Into<String>) -> Self {
        Self {
            api,
            cluster_id: cluster_id.into(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::default();
        check_api(&self.api, &mut merr);
        check_cluster_id(&self.cluster_id, &mut merr);
        merr.into_result()
    }
}

#[derive(Default)]
pub struct CreateParams {
    pub api: ApiHandle,
    pub request: CreateElasticsearchClusterRequest,
    pub validate_only: bool,
    pub track: Option<TrackParams>,
}

impl CreateParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch create");
        check_api(&self.api, &mut merr);
        if self.request.plan.cluster_topology.is_empty() {
            merr.push("plan must define at least one topology element");
        }
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

/// Creates a cluster. Tracking follows downstream clusters, since a create may
/// carry a paired Kibana.
pub async fn create(mut params: CreateParams) -> Result<Dispatched> {
    params.validate()?;
    let name = params.request.cluster_name.clone().unwrap_or_default();
    instrumented("elasticsearch create", &name, async {
        let api = api(&params.api)?;
        let response = api
            .create_cluster(&params.request, params.validate_only)
            .await?;
        dispatch(api, response, params.track.as_mut(), false).await
    })
    .await
}

#[derive(Debug, Default)]
pub struct ShowParams {
    pub cluster: ClusterParams,
    pub show_plans: bool,
    pub show_plan_logs: bool,
    pub show_metadata: bool,
    pub show_settings: bool,
}

impl ShowParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch show");
        merr.merge_result(self.cluster.validate());
        merr.into_result()
    }
}

pub async fn show(params: ShowParams) -> Result<ElasticsearchClusterInfo> {
    params.validate()?;
    instrumented("elasticsearch show", &params.cluster.cluster_id, async {
        let opts = ShowOptions {
            show_metadata: params.show_metadata,
            show_plans: params.show_plans,
            show_plan_logs: params.show_plan_logs,
            show_settings: params.show_settings,
        };
        Ok(api(&params.cluster.api)?
            .get_cluster(&params.cluster.cluster_id, &opts)
            .await?)
    })
    .await
}

#[derive(Default)]
pub struct ListParams {
    pub api: ApiHandle,
    /// Keep only clusters whose current plan runs this version. Empty keeps all.
    pub version: String,
    pub size: Option<u64>,
    pub query: Option<String>,
}

impl ListParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch list");
        check_api(&self.api, &mut merr);
        if self.size == Some(0) {
            merr.push("size must be greater than zero");
        }
        merr.into_result()
    }

    fn options(&self) -> ListOptions {
        ListOptions {
            size: self.size,
            query: self.query.clone(),
            show_metadata: true,
            // the version filter reads the current plan
            show_plans: !self.version.is_empty(),
        }
    }
}

pub async fn list(params: ListParams) -> Result<ElasticsearchClustersInfo> {
    params.validate()?;
    instrumented("elasticsearch list", &params.version, async {
        let list = api(&params.api)?.list_clusters(&params.options()).await?;
        debug!(fetched = list.return_count, "listed clusters");
        Ok(filter_elasticsearch(list, &params.version))
    })
    .await
}

pub async fn list_kibana(params: ListParams) -> Result<KibanaClustersInfo> {
    params.validate()?;
    instrumented("kibana list", &params.version, async {
        let list = api(&params.api)?
            .list_kibana_clusters(&params.options())
            .await?;
        Ok(filter_kibana(list, &params.version))
    })
    .await
}

#[derive(Debug, Default)]
pub struct UpdateParams {
    pub cluster: ClusterParams,
    pub plan: ElasticsearchClusterPlan,
    pub validate_only: bool,
    pub track: Option<TrackParams>,
}

impl UpdateParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch update");
        merr.merge_result(self.cluster.validate());
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

/// Submits an arbitrary plan.
pub async fn update(mut params: UpdateParams) -> Result<Dispatched> {
    params.validate()?;
    let target = params.cluster.cluster_id.clone();
    instrumented("elasticsearch update", &target, async {
        let api = api(&params.cluster.api)?;
        let response = api
            .update_cluster_plan(&params.cluster.cluster_id, &params.plan, params.validate_only)
            .await?;
        dispatch(api, response, params.track.as_mut(), true).await
    })
    .await
}

pub const DELETE_OPERATION: &str = "elasticsearch delete";

/// Deletes a stopped cluster. A cluster in any other state is left alone.
pub async fn delete(params: ClusterParams) -> Result<()> {
    let mut merr = MultiError::new(DELETE_OPERATION);
    merr.merge_result(params.validate());
    merr.into_result()?;

    instrumented(DELETE_OPERATION, &params.cluster_id, async {
        let api = api(&params.api)?;
        let info = api
            .get_cluster(&params.cluster_id, &ShowOptions::default())
            .await?;
        if !info.status.is_some_and(|s| s.is_stopped()) {
            return Err(OpError::precondition(
                DELETE_OPERATION,
                "deployment must be stopped",
            ));
        }
        api.delete_cluster(&params.cluster_id).await?;
        Ok(())
    })
    .await
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::test_support::{scripted, SharedBuf};
    use crate::validate::{API_REQUIRED, CLUSTER_ID_INVALID};
    use proptest::prelude::*;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy)]
    enum Track {
        Off,
        Ok,
        NoWriter,
        ZeroInterval,
    }

    fn track_params(t: Track) -> Option<TrackParams> {
        match t {
            Track::Off => None,
            Track::Ok => Some(TrackParams::new(SharedBuf::default())),
            Track::NoWriter => Some(TrackParams::default()),
            Track::ZeroInterval => {
                Some(TrackParams::new(SharedBuf::default()).with_frequency(Duration::ZERO, 1))
            }
        }
    }

    fn arb_track() -> impl Strategy<Value = Track> {
        prop_oneof![
            Just(Track::Off),
            Just(Track::Ok),
            Just(Track::NoWriter),
            Just(Track::ZeroInterval),
        ]
    }

    proptest! {
        #[test]
        fn update_errors_are_canonical(
            with_api in any::<bool>(),
            id_len in 0usize..40,
            track in arb_track(),
            order in Just(vec![0u8, 1, 2]).prop_shuffle(),
        ) {
            let mut params = UpdateParams::default();
            for field in order {
                match field {
                    0 => params.cluster.api = if with_api { scripted().1 } else { None },
                    1 => params.cluster.cluster_id = "a".repeat(id_len),
                    _ => params.track = track_params(track),
                }
            }

            let mut expected = Vec::new();
            if !with_api {
                expected.push(API_REQUIRED.to_string());
            }
            if id_len != 32 {
                expected.push(CLUSTER_ID_INVALID.to_string());
            }
            match track {
                Track::NoWriter => {
                    expected.push("track params: output device cannot be empty".to_string())
                }
                Track::ZeroInterval => {
                    expected.push("track params: poll frequency must be greater than zero".to_string())
                }
                Track::Off | Track::Ok => {}
            }

            match params.validate() {
                Ok(()) => prop_assert!(expected.is_empty()),
                Err(merr) => {
                    prop_assert_eq!(merr.prefix(), "elasticsearch update");
                    prop_assert_eq!(merr.errors(), expected.as_slice());
                }
            }
        }
    }
}
