//! The remote control-plane façade.
//!
//! [`RemoteApi`] is the seam between operations and the wire. The production
//! implementation is [`crate::HttpApi`]; tests substitute a scripted one. An
//! implementation must be safe to share across tasks and must not change after
//! construction.

use crate::cluster::{
    ClusterCommandResponse, ClusterKind, ClusterMetadataSettings,
    CreateElasticsearchClusterRequest, ElasticsearchClusterInfo, ElasticsearchClustersInfo,
    IndexSynchronizationResults, KeystoreContents, KibanaClustersInfo, ListOptions, MoveOptions,
    MutationResponse, Note, ProxyResponse, RestartOptions, ShowOptions, ShutdownOptions,
    StopInstancesOptions,
};
use crate::error::Result;
use crate::plan::{ElasticsearchClusterPlan, PlanActivity, TransientPlanConfiguration};
use crate::platform::{
    ProxiesFilteredGroup, ProxiesFilteredGroupHealth, ProxyInfo, ProxyOverview, RepositoryConfig,
    RepositoryConfigs, SnapshotRepositoryConfiguration,
};
use crate::users::{ApiKey, ApiKeyList, CreateApiKeyRequest, User, UserList};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    // Elasticsearch clusters

    async fn create_cluster(
        &self,
        request: &CreateElasticsearchClusterRequest,
        validate_only: bool,
    ) -> Result<MutationResponse>;

    async fn get_cluster(&self, id: &str, opts: &ShowOptions) -> Result<ElasticsearchClusterInfo>;

    async fn list_clusters(&self, opts: &ListOptions) -> Result<ElasticsearchClustersInfo>;

    async fn list_kibana_clusters(&self, opts: &ListOptions) -> Result<KibanaClustersInfo>;

    async fn delete_cluster(&self, id: &str) -> Result<()>;

    async fn update_cluster_plan(
        &self,
        id: &str,
        plan: &ElasticsearchClusterPlan,
        validate_only: bool,
    ) -> Result<MutationResponse>;

    async fn restart_cluster(&self, id: &str, opts: &RestartOptions)
        -> Result<ClusterCommandResponse>;

    async fn shutdown_cluster(
        &self,
        id: &str,
        opts: &ShutdownOptions,
    ) -> Result<ClusterCommandResponse>;

    /// Stops the named instances, or every instance when `instance_ids` is empty.
    async fn stop_instances(
        &self,
        id: &str,
        instance_ids: &[String],
        opts: &StopInstancesOptions,
    ) -> Result<ClusterCommandResponse>;

    async fn move_instances(
        &self,
        kind: ClusterKind,
        id: &str,
        instance_ids: &[String],
        body: Option<&TransientPlanConfiguration>,
        opts: &MoveOptions,
    ) -> Result<ClusterCommandResponse>;

    async fn resync_cluster(&self, kind: ClusterKind, id: &str) -> Result<()>;

    async fn resync_clusters(
        &self,
        kind: ClusterKind,
        skip_matching_version: bool,
    ) -> Result<IndexSynchronizationResults>;

    /// Downloads the diagnostics bundle (a zip archive).
    async fn cluster_diagnostics(&self, id: &str) -> Result<Vec<u8>>;

    async fn proxy_request(
        &self,
        id: &str,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ProxyResponse>;

    async fn add_note(&self, kind: ClusterKind, id: &str, note: &Note) -> Result<()>;

    // Plans

    /// Plan activity of a cluster. A 404 means no plan attempt exists yet.
    async fn plan_activity(&self, kind: ClusterKind, id: &str) -> Result<PlanActivity>;

    // Keystore and metadata

    async fn get_keystore(&self, id: &str) -> Result<KeystoreContents>;

    async fn set_keystore(&self, id: &str, contents: &KeystoreContents)
        -> Result<KeystoreContents>;

    async fn get_cluster_metadata(&self, id: &str) -> Result<Value>;

    async fn set_cluster_metadata(
        &self,
        id: &str,
        metadata: &Value,
        version: Option<u64>,
    ) -> Result<Value>;

    async fn update_cluster_metadata_settings(
        &self,
        id: &str,
        settings: &ClusterMetadataSettings,
    ) -> Result<ClusterMetadataSettings>;

    // Snapshot repositories

    async fn list_repositories(&self) -> Result<RepositoryConfigs>;

    async fn get_repository(&self, name: &str) -> Result<RepositoryConfig>;

    async fn set_repository(
        &self,
        name: &str,
        config: &SnapshotRepositoryConfiguration,
    ) -> Result<RepositoryConfig>;

    async fn delete_repository(&self, name: &str) -> Result<()>;

    // Users

    async fn create_user(&self, user: &User) -> Result<User>;

    async fn get_user(&self, name: &str) -> Result<User>;

    async fn list_users(&self) -> Result<UserList>;

    async fn update_user(&self, name: &str, user: &User) -> Result<User>;

    async fn delete_user(&self, name: &str) -> Result<()>;

    async fn get_current_user(&self) -> Result<User>;

    async fn update_current_user(&self, user: &User) -> Result<User>;

    // API keys

    async fn create_api_key(&self, request: &CreateApiKeyRequest) -> Result<ApiKey>;

    async fn list_api_keys(&self) -> Result<ApiKeyList>;

    async fn list_user_api_keys(&self, user_id: &str) -> Result<ApiKeyList>;

    async fn list_all_api_keys(&self) -> Result<ApiKeyList>;

    async fn get_api_key(&self, key_id: &str) -> Result<ApiKey>;

    async fn get_user_api_key(&self, user_id: &str, key_id: &str) -> Result<ApiKey>;

    async fn delete_api_keys(&self, key_ids: &[String]) -> Result<()>;

    async fn delete_user_api_key(&self, user_id: &str, key_id: &str) -> Result<()>;

    // Proxies

    async fn list_proxies(&self) -> Result<ProxyOverview>;

    async fn get_proxy(&self, proxy_id: &str) -> Result<ProxyInfo>;

    async fn list_proxy_filtered_groups(&self) -> Result<Vec<ProxiesFilteredGroupHealth>>;

    async fn get_proxy_filtered_group(&self, id: &str) -> Result<ProxiesFilteredGroupHealth>;

    async fn create_proxy_filtered_group(
        &self,
        group: &ProxiesFilteredGroup,
    ) -> Result<ProxiesFilteredGroup>;

    async fn update_proxy_filtered_group(
        &self,
        id: &str,
        group: &ProxiesFilteredGroup,
        version: Option<u64>,
    ) -> Result<ProxiesFilteredGroup>;

    async fn delete_proxy_filtered_group(&self, id: &str) -> Result<()>;
}
