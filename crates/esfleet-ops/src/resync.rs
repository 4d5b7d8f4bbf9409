//! Re-synchronisation of cluster documents with the control-plane index.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::{api, check_api, check_cluster_id, ApiHandle};
use esfleet_api::cluster::IndexSynchronizationResults;
use esfleet_api::ClusterKind;
use tracing::info;

pub struct ResyncParams {
    pub api: ApiHandle,
    pub kind: ClusterKind,
    /// Single cluster to resync. `None` resyncs every cluster of `kind`.
    pub cluster_id: Option<String>,
    /// When resyncing all clusters, skip those already on the current version.
    pub skip_matching_version: bool,
}

impl Default for ResyncParams {
    fn default() -> Self {
        Self {
            api: None,
            kind: ClusterKind::Elasticsearch,
            cluster_id: None,
            skip_matching_version: false,
        }
    }
}

impl ResyncParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(format!("{} resync", self.kind.as_path()));
        check_api(&self.api, &mut merr);
        if let Some(id) = &self.cluster_id {
            check_cluster_id(id, &mut merr);
        }
        merr.into_result()
    }
}

/// Resyncs one cluster or all of them. A single-cluster resync reports the
/// cluster as synced on success.
pub async fn resync(params: ResyncParams) -> Result<IndexSynchronizationResults> {
    params.validate()?;
    let target = params.cluster_id.clone().unwrap_or_else(|| "*".to_string());
    instrumented("resync", &target, async {
        let api = api(&params.api)?;
        match &params.cluster_id {
            Some(id) => {
                api.resync_cluster(params.kind, id).await?;
                Ok(IndexSynchronizationResults {
                    synced_ids: vec![id.clone()],
                    failed_ids: Vec::new(),
                    total: 1,
                })
            }
            None => {
                let results = api
                    .resync_clusters(params.kind, params.skip_matching_version)
                    .await?;
                info!(
                    total = results.total,
                    failed = results.failed_ids.len(),
                    "resync finished"
                );
                Ok(results)
            }
        }
    })
    .await
}
