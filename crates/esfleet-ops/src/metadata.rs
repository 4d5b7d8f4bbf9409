//! Raw cluster metadata and metadata settings.

use crate::cluster::ClusterParams;
use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::api;
use esfleet_api::cluster::ClusterMetadataSettings;
use serde_json::Value;

pub async fn show(params: ClusterParams) -> Result<Value> {
    let mut merr = MultiError::new("metadata show");
    merr.merge_result(params.validate());
    merr.into_result()?;
    instrumented("metadata show", &params.cluster_id, async {
        Ok(api(&params.api)?
            .get_cluster_metadata(&params.cluster_id)
            .await?)
    })
    .await
}

#[derive(Debug, Default)]
pub struct SetParams {
    pub cluster: ClusterParams,
    /// Replacement metadata document.
    pub metadata: Value,
    /// Expected current version; the remote rejects stale writes.
    pub version: Option<u64>,
}

impl SetParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("metadata set");
        merr.merge_result(self.cluster.validate());
        if !self.metadata.is_object() {
            merr.push("metadata must be a json object");
        }
        merr.into_result()
    }
}

pub async fn set(params: SetParams) -> Result<Value> {
    params.validate()?;
    instrumented("metadata set", &params.cluster.cluster_id, async {
        Ok(api(&params.cluster.api)?
            .set_cluster_metadata(&params.cluster.cluster_id, &params.metadata, params.version)
            .await?)
    })
    .await
}

#[derive(Debug, Default)]
pub struct UpdateSettingsParams {
    pub cluster: ClusterParams,
    pub settings: ClusterMetadataSettings,
}

impl UpdateSettingsParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("metadata update settings");
        merr.merge_result(self.cluster.validate());
        if self.settings.cluster_name.is_none() && self.settings.extra.is_empty() {
            merr.push("settings cannot be empty");
        }
        merr.into_result()
    }
}

pub async fn update_settings(params: UpdateSettingsParams) -> Result<ClusterMetadataSettings> {
    params.validate()?;
    instrumented("metadata update settings", &params.cluster.cluster_id, async {
        Ok(api(&params.cluster.api)?
            .update_cluster_metadata_settings(&params.cluster.cluster_id, &params.settings)
            .await?)
    })
    .await
}
