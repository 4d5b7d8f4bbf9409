//! Cluster keystore secrets.

use crate::cluster::ClusterParams;
use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::api;
use esfleet_api::cluster::KeystoreContents;

/// Lists the secret names held by the keystore. Values are never returned.
pub async fn show(params: ClusterParams) -> Result<KeystoreContents> {
    let mut merr = MultiError::new("keystore show");
    merr.merge_result(params.validate());
    merr.into_result()?;
    instrumented("keystore show", &params.cluster_id, async {
        Ok(api(&params.api)?.get_keystore(&params.cluster_id).await?)
    })
    .await
}

#[derive(Debug, Default)]
pub struct SetParams {
    pub cluster: ClusterParams,
    /// Secrets to add or replace. A secret without a value is removed.
    pub contents: KeystoreContents,
}

impl SetParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("keystore set");
        merr.merge_result(self.cluster.validate());
        if self.contents.secrets.is_empty() {
            merr.push("at least one secret must be specified");
        }
        if self.contents.secrets.keys().any(|k| k.trim().is_empty()) {
            merr.push("secret names cannot be empty");
        }
        merr.into_result()
    }
}

pub async fn set(params: SetParams) -> Result<KeystoreContents> {
    params.validate()?;
    instrumented("keystore set", &params.cluster.cluster_id, async {
        Ok(api(&params.cluster.api)?
            .set_keystore(&params.cluster.cluster_id, &params.contents)
            .await?)
    })
    .await
}
