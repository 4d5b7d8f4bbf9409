//! Requests proxied through the control plane to the cluster itself.

use crate::cluster::ClusterParams;
use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::api;
use esfleet_api::cluster::ProxyResponse;
use reqwest::Method;

#[derive(Debug)]
pub struct QueryParams {
    pub cluster: ClusterParams,
    pub method: Method,
    /// Cluster path, e.g. `_cat/indices`. A leading `/` is added when missing.
    pub path: String,
    pub body: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            cluster: ClusterParams::default(),
            method: Method::GET,
            path: String::new(),
            body: None,
        }
    }
}

impl QueryParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch query");
        merr.merge_result(self.cluster.validate());
        if self.path.trim().is_empty() {
            merr.push("path cannot be empty");
        }
        merr.into_result()
    }

    fn normalized_path(&self) -> String {
        let path = self.path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }
}

/// Sends the request and returns the cluster's answer, whatever its status.
pub async fn query(params: QueryParams) -> Result<ProxyResponse> {
    params.validate()?;
    let id = params.cluster.cluster_id.clone();
    instrumented("elasticsearch query", &id, async {
        Ok(api(&params.cluster.api)?
            .proxy_request(
                &id,
                params.method.clone(),
                &params.normalized_path(),
                params.body.clone(),
            )
            .await?)
    })
    .await
}
