//! Diagnostics bundle download.

use crate::cluster::ClusterParams;
use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::api;
use std::io::Write;

pub struct DiagnoseParams {
    pub cluster: ClusterParams,
    /// Receives the zip archive.
    pub writer: Option<Box<dyn Write + Send>>,
}

impl DiagnoseParams {
    pub fn new(cluster: ClusterParams, writer: impl Write + Send + 'static) -> Self {
        Self {
            cluster,
            writer: Some(Box::new(writer)),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("elasticsearch diagnose");
        merr.merge_result(self.cluster.validate());
        if self.writer.is_none() {
            merr.push("output device cannot be empty");
        }
        merr.into_result()
    }
}

/// Copies the cluster's diagnostics bundle to the writer and returns the
/// number of bytes written.
pub async fn diagnose(mut params: DiagnoseParams) -> Result<u64> {
    params.validate()?;
    let id = params.cluster.cluster_id.clone();
    instrumented("elasticsearch diagnose", &id, async {
        let bundle = api(&params.cluster.api)?.cluster_diagnostics(&id).await?;
        if let Some(w) = params.writer.as_mut() {
            w.write_all(&bundle)?;
            w.flush()?;
        }
        Ok(bundle.len() as u64)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scripted, SharedBuf, CLUSTER_ID};
    use serde_json::json;

    #[tokio::test]
    async fn test_bundle_reaches_writer() {
        let (mock, handle) = scripted();
        mock.push_ok("cluster_diagnostics", json!("PK\u{3}\u{4}bundle"));
        let out = SharedBuf::default();

        let n = diagnose(DiagnoseParams::new(
            ClusterParams::new(handle, CLUSTER_ID),
            out.clone(),
        ))
        .await
        .unwrap();
        assert_eq!(n, 10);
        assert_eq!(out.contents(), b"PK\x03\x04bundle".to_vec());
    }

    #[tokio::test]
    async fn test_writer_required() {
        let (_, handle) = scripted();
        let err = diagnose(DiagnoseParams {
            cluster: ClusterParams::new(handle, CLUSTER_ID),
            writer: None,
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "elasticsearch diagnose: output device cannot be empty"
        );
    }
}
