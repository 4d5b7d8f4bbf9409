//! Cluster documents, mutation responses and command options.

use crate::plan::{ElasticsearchClusterPlan, ElasticsearchClusterPlansInfo, KibanaClusterPlansInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a managed cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterKind {
    Elasticsearch,
    Kibana,
    Apm,
}

impl ClusterKind {
    /// Path segment used by the control-plane URLs.
    pub fn as_path(&self) -> &'static str {
        match self {
            ClusterKind::Elasticsearch => "elasticsearch",
            ClusterKind::Kibana => "kibana",
            ClusterKind::Apm => "apm",
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKind::Elasticsearch => write!(f, "Elasticsearch"),
            ClusterKind::Kibana => write!(f, "Kibana"),
            ClusterKind::Apm => write!(f, "APM"),
        }
    }
}

/// A cluster identified by kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ClusterKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ClusterKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn elasticsearch(id: impl Into<String>) -> Self {
        Self::new(ClusterKind::Elasticsearch, id)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.id, self.kind)
    }
}

/// Lifecycle state reported by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterState {
    Initializing,
    Started,
    Stopping,
    Stopped,
    Rebooting,
    Restarting,
    Reconfiguring,
    #[serde(other)]
    Unknown,
}

impl ClusterState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, ClusterState::Stopped)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterInstanceMemoryInfo {
    /// Memory capacity in MB.
    pub instance_capacity: i64,
    /// JVM memory pressure percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_pressure: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterInstanceDiskInfo {
    /// Used disk in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_available: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterInstanceInfo {
    pub instance_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub healthy: bool,
    pub container_started: bool,
    pub service_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<ClusterInstanceMemoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<ClusterInstanceDiskInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTopologyInfo {
    pub healthy: bool,
    pub instances: Vec<ClusterInstanceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterMetadataInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Reference from a cluster to one of its dependent clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatedCluster {
    pub enabled: bool,
    #[serde(alias = "kibana_id", alias = "apm_id")]
    pub cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchClusterInfo {
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterState>,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_info: Option<ElasticsearchClusterPlansInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<ClusterTopologyInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ClusterMetadataInfo>,
    pub associated_kibana_clusters: Vec<AssociatedCluster>,
    pub associated_apm_clusters: Vec<AssociatedCluster>,
}

impl ElasticsearchClusterInfo {
    /// Current plan, when the remote attached plan information.
    pub fn current_plan(&self) -> Option<&ElasticsearchClusterPlan> {
        self.plan_info
            .as_ref()
            .and_then(|p| p.current.as_ref())
            .and_then(|c| c.plan.as_ref())
    }

    /// Version of the current plan.
    pub fn current_version(&self) -> Option<&str> {
        self.current_plan()
            .map(|p| p.elasticsearch.version.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn instances(&self) -> &[ClusterInstanceInfo] {
        self.topology
            .as_ref()
            .map(|t| t.instances.as_slice())
            .unwrap_or(&[])
    }

    /// Dependent clusters that follow this cluster's lifecycle.
    pub fn downstream(&self) -> Vec<ResourceRef> {
        let kibana = self
            .associated_kibana_clusters
            .iter()
            .filter(|c| c.enabled && !c.cluster_id.is_empty())
            .map(|c| ResourceRef::new(ClusterKind::Kibana, c.cluster_id.clone()));
        let apm = self
            .associated_apm_clusters
            .iter()
            .filter(|c| c.enabled && !c.cluster_id.is_empty())
            .map(|c| ResourceRef::new(ClusterKind::Apm, c.cluster_id.clone()));
        kibana.chain(apm).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchClustersInfo {
    pub elasticsearch_clusters: Vec<ElasticsearchClusterInfo>,
    pub return_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaClusterInfo {
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster: Option<AssociatedCluster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterState>,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_info: Option<KibanaClusterPlansInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<ClusterTopologyInfo>,
}

impl KibanaClusterInfo {
    pub fn current_version(&self) -> Option<&str> {
        self.plan_info
            .as_ref()
            .and_then(|p| p.current.as_ref())
            .and_then(|c| c.plan.as_ref())
            .map(|p| p.kibana.version.as_str())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaClustersInfo {
    pub kibana_clusters: Vec<KibanaClusterInfo>,
    pub return_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateElasticsearchClusterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub plan: ElasticsearchClusterPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kibana: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCredentials {
    pub username: String,
    pub password: String,
}

/// Identifier-bearing payload of a mutation.
///
/// Exactly one of the identifiers is expected to be populated; that cluster is
/// the subject of subsequent plan tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeTicket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kibana_cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ClusterCredentials>,
}

impl ChangeTicket {
    /// The cluster whose plan should be tracked.
    pub fn resource(&self) -> Option<ResourceRef> {
        self.elasticsearch_cluster_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ResourceRef::elasticsearch)
            .or_else(|| {
                self.kibana_cluster_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(|id| ResourceRef::new(ClusterKind::Kibana, id))
            })
    }
}

/// Outcome of a mutating call: the remote either created the resource
/// synchronously or accepted a change that completes asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationResponse {
    Created(ChangeTicket),
    Accepted(ChangeTicket),
}

impl MutationResponse {
    pub fn ticket(&self) -> &ChangeTicket {
        match self {
            MutationResponse::Created(t) | MutationResponse::Accepted(t) => t,
        }
    }

    pub fn into_ticket(self) -> ChangeTicket {
        match self {
            MutationResponse::Created(t) | MutationResponse::Accepted(t) => t,
        }
    }
}

/// Empty acknowledgement returned by command endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterCommandResponse {
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowOptions {
    pub show_metadata: bool,
    pub show_plans: bool,
    pub show_plan_logs: bool,
    pub show_settings: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub size: Option<u64>,
    pub query: Option<String>,
    pub show_metadata: bool,
    pub show_plans: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartOptions {
    pub cancel_pending: bool,
    pub restore_snapshot: bool,
    pub skip_snapshot: bool,
    pub group_attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownOptions {
    pub hide: bool,
    pub skip_snapshot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOptions {
    pub force_update: bool,
    pub ignore_missing: bool,
    pub instances_down: bool,
    pub validate_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopInstancesOptions {
    pub ignore_missing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSynchronizationResults {
    pub synced_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub total: u64,
}

/// Response of a request proxied to the cluster itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: String,
}

/// Human readable note attached to a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeystoreSecret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_file: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreContents {
    pub secrets: std::collections::BTreeMap<String, KeystoreSecret>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterMetadataSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_status_document_decodes() {
        let info: ElasticsearchClusterInfo =
            serde_json::from_str(r#"{"status":"stopped"}"#).unwrap();
        assert_eq!(info.status, Some(ClusterState::Stopped));
        assert!(info.cluster_id.is_empty());
        assert!(info.instances().is_empty());
    }

    #[test]
    fn unknown_state_is_tolerated() {
        let info: ElasticsearchClusterInfo =
            serde_json::from_str(r#"{"status":"hibernating"}"#).unwrap();
        assert_eq!(info.status, Some(ClusterState::Unknown));
    }

    #[test]
    fn ticket_prefers_elasticsearch_identifier() {
        let ticket = ChangeTicket {
            elasticsearch_cluster_id: Some("a933b600b2174bb79eecb977f02a9460".to_string()),
            kibana_cluster_id: Some("k".repeat(32)),
            credentials: None,
        };
        assert_eq!(
            ticket.resource(),
            Some(ResourceRef::elasticsearch("a933b600b2174bb79eecb977f02a9460"))
        );
    }

    #[test]
    fn ticket_falls_back_to_kibana() {
        let ticket = ChangeTicket {
            kibana_cluster_id: Some("k".repeat(32)),
            ..ChangeTicket::default()
        };
        assert_eq!(
            ticket.resource().map(|r| r.kind),
            Some(ClusterKind::Kibana)
        );
        assert_eq!(ChangeTicket::default().resource(), None);
    }

    #[test]
    fn downstream_skips_disabled_associations() {
        let info: ElasticsearchClusterInfo = serde_json::from_str(
            r#"{
                "cluster_id": "320b7b540dfc967a7a649c18e2fce4ed",
                "associated_kibana_clusters": [
                    {"enabled": true, "kibana_id": "1111"},
                    {"enabled": false, "kibana_id": "2222"}
                ],
                "associated_apm_clusters": [{"enabled": true, "apm_id": "3333"}]
            }"#,
        )
        .unwrap();
        assert_eq!(
            info.downstream(),
            vec![
                ResourceRef::new(ClusterKind::Kibana, "1111"),
                ResourceRef::new(ClusterKind::Apm, "3333"),
            ]
        );
    }

    #[test]
    fn resource_display() {
        let r = ResourceRef::elasticsearch("abc");
        assert_eq!(r.to_string(), "[abc][Elasticsearch]");
    }
}
