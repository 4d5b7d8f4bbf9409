//! Version upgrade of an Elasticsearch cluster.

use crate::cluster::ClusterParams;
use crate::dispatch::{dispatch, Dispatched};
use crate::error::{OpError, Result};
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::planner::{plan_upgrade, InstanceSignals};
use crate::track::{check_track, TrackParams};
use crate::validate::api;
use crate::version::Version;
use esfleet_api::cluster::ShowOptions;
use esfleet_api::plan::ElasticsearchClusterPlan;
use tracing::info;

pub const UPGRADE_OPERATION: &str = "elasticsearch upgrade";

#[derive(Debug, Default)]
pub struct UpgradeParams {
    pub cluster: ClusterParams,
    /// Target version, as written to the plan.
    pub version: String,
    pub track: Option<TrackParams>,
}

impl UpgradeParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(UPGRADE_OPERATION);
        merr.merge_result(self.cluster.validate());
        if let Err(e) = self.version.parse::<Version>() {
            merr.push_err(e);
        }
        check_track(&self.track, &mut merr);
        merr.into_result()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upgraded {
    /// The plan that was submitted.
    pub plan: ElasticsearchClusterPlan,
    pub dispatched: Dispatched,
}

/// Reads the current plan and topology, derives the upgrade plan and submits
/// it.
pub async fn upgrade(mut params: UpgradeParams) -> Result<Upgraded> {
    params.validate()?;
    let target: Version = params.version.parse().map_err(|e| {
        let mut merr = MultiError::new(UPGRADE_OPERATION);
        merr.push_err(e);
        OpError::Validation(merr)
    })?;
    let id = params.cluster.cluster_id.clone();

    instrumented(UPGRADE_OPERATION, &id, async {
        let api = api(&params.cluster.api)?;
        let info = api
            .get_cluster(
                &id,
                &ShowOptions {
                    show_plans: true,
                    ..ShowOptions::default()
                },
            )
            .await?;

        let current_plan = info
            .current_plan()
            .ok_or_else(|| OpError::precondition(UPGRADE_OPERATION, "cluster has no plan information"))?;
        let current: Version = current_plan.elasticsearch.version.parse().map_err(|e| {
            OpError::precondition(
                UPGRADE_OPERATION,
                format!("current version {:?}: {}", current_plan.elasticsearch.version, e),
            )
        })?;

        let topology: Vec<InstanceSignals> = info
            .instances()
            .iter()
            .filter_map(InstanceSignals::from_instance)
            .collect();
        let plan = plan_upgrade(current_plan, &current, &target, &params.version, &topology);
        info!(
            from = %current,
            to = %target,
            strategy = ?plan.transient.as_ref().and_then(|t| t.strategy.as_ref()),
            "submitting upgrade plan"
        );

        let response = api.update_cluster_plan(&id, &plan, false).await?;
        let dispatched = dispatch(api, response, params.track.as_mut(), true).await?;
        Ok(Upgraded { plan, dispatched })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scripted, CLUSTER_ID};
    use esfleet_api::plan::PlanStrategy;
    use serde_json::json;

    fn cluster_doc(version: &str, instances: serde_json::Value) -> serde_json::Value {
        json!({
            "cluster_id": CLUSTER_ID,
            "plan_info": {"current": {"plan": {
                "elasticsearch": {
                    "version": version,
                    "system_settings": {"default_shards_per_index": 1}
                },
                "cluster_topology": [{"memory_per_node": 1024}]
            }}},
            "topology": {"instances": instances}
        })
    }

    fn instance(pressure: i64, capacity: i64, disk: i64) -> serde_json::Value {
        json!({
            "instance_name": "instance-0000000000",
            "memory": {"instance_capacity": capacity, "memory_pressure": pressure},
            "disk": {"disk_space_used": disk}
        })
    }

    fn params(handle: crate::validate::ApiHandle, version: &str) -> UpgradeParams {
        UpgradeParams {
            cluster: ClusterParams::new(handle, CLUSTER_ID),
            version: version.to_string(),
            track: None,
        }
    }

    #[tokio::test]
    async fn test_major_upgrade_submits_adjusted_plan() {
        let (mock, handle) = scripted();
        mock.push_ok("get_cluster", cluster_doc("2.4.5", json!([])))
            .push_accepted(
                "update_cluster_plan",
                json!({"elasticsearch_cluster_id": CLUSTER_ID}),
            );

        let out = upgrade(params(handle, "5.5.0")).await.unwrap();
        assert_eq!(
            out.plan.transient.as_ref().unwrap().strategy,
            Some(PlanStrategy::MajorUpgrade)
        );
        assert_eq!(
            out.plan
                .elasticsearch
                .system_settings
                .as_ref()
                .unwrap()
                .default_shards_per_index,
            Some(0)
        );

        let calls = mock.calls();
        assert_eq!(calls[0].args["show_plans"], json!(true));
        assert_eq!(calls[1].args["plan"]["elasticsearch"]["version"], json!("5.5.0"));
        assert_eq!(
            calls[1].args["plan"]["transient"]["strategy"],
            json!({"major_upgrade": {}})
        );
    }

    #[tokio::test]
    async fn test_minor_upgrade_reads_topology() {
        let (mock, handle) = scripted();
        mock.push_ok("get_cluster", cluster_doc("5.4.3", json!([instance(10, 1024, 7168)])))
            .push_accepted("update_cluster_plan", json!({}));

        let out = upgrade(params(handle, "5.5.0")).await.unwrap();
        assert_eq!(
            out.plan.transient.unwrap().strategy,
            Some(PlanStrategy::RollingByName)
        );
    }

    #[tokio::test]
    async fn test_quiet_minor_upgrade_is_default() {
        let (mock, handle) = scripted();
        mock.push_ok("get_cluster", cluster_doc("5.4.1", json!([instance(10, 1024, 200)])))
            .push_accepted("update_cluster_plan", json!({}));

        let out = upgrade(params(handle, "5.5.0")).await.unwrap();
        assert_eq!(out.plan.transient.unwrap().strategy, Some(PlanStrategy::Default));
    }

    #[tokio::test]
    async fn test_huge_target_major_is_planned() {
        let (mock, handle) = scripted();
        mock.push_ok("get_cluster", cluster_doc("7.17.0", json!([])))
            .push_accepted("update_cluster_plan", json!({}));

        let out = upgrade(params(handle, "9223372036854775808.0.0")).await.unwrap();
        assert_eq!(
            out.plan.transient.unwrap().strategy,
            Some(PlanStrategy::MajorUpgrade)
        );
    }

    #[tokio::test]
    async fn test_missing_plan_is_precondition() {
        let (mock, handle) = scripted();
        mock.push_ok("get_cluster", json!({"cluster_id": CLUSTER_ID}));

        let err = upgrade(params(handle, "5.5.0")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "elasticsearch upgrade: cluster has no plan information"
        );
        assert_eq!(mock.call_count("update_cluster_plan"), 0);
    }

    #[tokio::test]
    async fn test_bad_target_version_fails_before_io() {
        let (mock, handle) = scripted();
        let err = upgrade(params(handle, "5.x")).await.unwrap_err();
        let merr = err.validation().unwrap();
        assert_eq!(merr.len(), 1);
        assert!(merr.errors()[0].chars().all(|c| !c.is_uppercase()));
        assert!(mock.calls().is_empty());
    }
}
