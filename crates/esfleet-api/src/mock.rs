//! Scripted in-memory [`RemoteApi`] for tests.
//!
//! Each endpoint owns a FIFO queue of canned outcomes. Every call is recorded
//! with its arguments so tests can assert on call counts and order. An
//! endpoint with an empty queue answers with a 501 remote error naming itself.

use crate::cluster::{
    ChangeTicket, ClusterCommandResponse, ClusterKind, ClusterMetadataSettings,
    CreateElasticsearchClusterRequest, ElasticsearchClusterInfo, ElasticsearchClustersInfo,
    IndexSynchronizationResults, KeystoreContents, KibanaClustersInfo, ListOptions, MoveOptions,
    MutationResponse, Note, ProxyResponse, RestartOptions, ShowOptions, ShutdownOptions,
    StopInstancesOptions,
};
use crate::error::{ApiError, Result};
use crate::plan::{ElasticsearchClusterPlan, PlanActivity, TransientPlanConfiguration};
use crate::platform::{
    ProxiesFilteredGroup, ProxiesFilteredGroupHealth, ProxyInfo, ProxyOverview, RepositoryConfig,
    RepositoryConfigs, SnapshotRepositoryConfiguration,
};
use crate::remote::RemoteApi;
use crate::users::{ApiKey, ApiKeyList, CreateApiKeyRequest, User, UserList};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

enum Scripted {
    Json(Value),
    Created(Value),
    Accepted(Value),
    Err(ApiError),
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: &'static str,
    pub args: Value,
}

#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<HashMap<&'static str, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, endpoint: &'static str, outcome: Scripted) -> &Self {
        lock(&self.script)
            .entry(endpoint)
            .or_default()
            .push_back(outcome);
        self
    }

    /// Queues a successful JSON payload for `endpoint`.
    pub fn push_ok(&self, endpoint: &'static str, body: Value) -> &Self {
        self.push(endpoint, Scripted::Json(body))
    }

    pub fn push_err(&self, endpoint: &'static str, err: ApiError) -> &Self {
        self.push(endpoint, Scripted::Err(err))
    }

    /// Queues a non-2xx answer, rendered the way the HTTP client renders it.
    pub fn push_status(&self, endpoint: &'static str, status: u16, body: &str) -> &Self {
        self.push_err(endpoint, ApiError::from_response(status, body))
    }

    pub fn push_not_found(&self, endpoint: &'static str) -> &Self {
        self.push_status(endpoint, 404, "")
    }

    /// Queues a 201 mutation answer carrying `ticket`.
    pub fn push_created(&self, endpoint: &'static str, ticket: Value) -> &Self {
        self.push(endpoint, Scripted::Created(ticket))
    }

    /// Queues a 202 mutation answer carrying `ticket`.
    pub fn push_accepted(&self, endpoint: &'static str, ticket: Value) -> &Self {
        self.push(endpoint, Scripted::Accepted(ticket))
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Endpoint names in call order.
    pub fn endpoints(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(|c| c.endpoint).collect()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Outcomes still queued for `endpoint`.
    pub fn remaining(&self, endpoint: &str) -> usize {
        lock(&self.script).get(endpoint).map_or(0, VecDeque::len)
    }

    fn take(&self, endpoint: &'static str, args: Value) -> Result<Scripted> {
        lock(&self.calls).push(Call { endpoint, args });
        lock(&self.script)
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| ApiError::Remote {
                status: 501,
                message: format!("no scripted response for {}", endpoint),
            })
    }

    fn respond<T: DeserializeOwned>(&self, endpoint: &'static str, args: Value) -> Result<T> {
        let body = match self.take(endpoint, args)? {
            Scripted::Json(v) | Scripted::Created(v) | Scripted::Accepted(v) => v,
            Scripted::Err(e) => return Err(e),
        };
        decode(endpoint, body)
    }

    fn respond_unit(&self, endpoint: &'static str, args: Value) -> Result<()> {
        match self.take(endpoint, args)? {
            Scripted::Err(e) => Err(e),
            _ => Ok(()),
        }
    }

    fn respond_mutation(&self, endpoint: &'static str, args: Value) -> Result<MutationResponse> {
        match self.take(endpoint, args)? {
            Scripted::Created(v) => Ok(MutationResponse::Created(decode::<ChangeTicket>(
                endpoint, v,
            )?)),
            Scripted::Json(v) | Scripted::Accepted(v) => Ok(MutationResponse::Accepted(
                decode::<ChangeTicket>(endpoint, v)?,
            )),
            Scripted::Err(e) => Err(e),
        }
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|source| ApiError::Decode {
        url: format!("scripted://{}", endpoint),
        source,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn create_cluster(
        &self,
        request: &CreateElasticsearchClusterRequest,
        validate_only: bool,
    ) -> Result<MutationResponse> {
        self.respond_mutation(
            "create_cluster",
            json!({"request": to_json(request), "validate_only": validate_only}),
        )
    }

    async fn get_cluster(&self, id: &str, opts: &ShowOptions) -> Result<ElasticsearchClusterInfo> {
        self.respond(
            "get_cluster",
            json!({
                "id": id,
                "show_metadata": opts.show_metadata,
                "show_plans": opts.show_plans,
                "show_plan_logs": opts.show_plan_logs,
                "show_settings": opts.show_settings,
            }),
        )
    }

    async fn list_clusters(&self, opts: &ListOptions) -> Result<ElasticsearchClustersInfo> {
        self.respond(
            "list_clusters",
            json!({"size": opts.size, "query": opts.query}),
        )
    }

    async fn list_kibana_clusters(&self, opts: &ListOptions) -> Result<KibanaClustersInfo> {
        self.respond(
            "list_kibana_clusters",
            json!({"size": opts.size, "query": opts.query}),
        )
    }

    async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.respond_unit("delete_cluster", json!({ "id": id }))
    }

    async fn update_cluster_plan(
        &self,
        id: &str,
        plan: &ElasticsearchClusterPlan,
        validate_only: bool,
    ) -> Result<MutationResponse> {
        self.respond_mutation(
            "update_cluster_plan",
            json!({"id": id, "plan": to_json(plan), "validate_only": validate_only}),
        )
    }

    async fn restart_cluster(
        &self,
        id: &str,
        opts: &RestartOptions,
    ) -> Result<ClusterCommandResponse> {
        self.respond(
            "restart_cluster",
            json!({
                "id": id,
                "cancel_pending": opts.cancel_pending,
                "restore_snapshot": opts.restore_snapshot,
                "skip_snapshot": opts.skip_snapshot,
                "group_attribute": opts.group_attribute,
            }),
        )
    }

    async fn shutdown_cluster(
        &self,
        id: &str,
        opts: &ShutdownOptions,
    ) -> Result<ClusterCommandResponse> {
        self.respond(
            "shutdown_cluster",
            json!({"id": id, "hide": opts.hide, "skip_snapshot": opts.skip_snapshot}),
        )
    }

    async fn stop_instances(
        &self,
        id: &str,
        instance_ids: &[String],
        opts: &StopInstancesOptions,
    ) -> Result<ClusterCommandResponse> {
        self.respond(
            "stop_instances",
            json!({"id": id, "instances": instance_ids, "ignore_missing": opts.ignore_missing}),
        )
    }

    async fn move_instances(
        &self,
        kind: ClusterKind,
        id: &str,
        instance_ids: &[String],
        body: Option<&TransientPlanConfiguration>,
        opts: &MoveOptions,
    ) -> Result<ClusterCommandResponse> {
        self.respond(
            "move_instances",
            json!({
                "kind": kind,
                "id": id,
                "instances": instance_ids,
                "body": body.map(to_json),
                "force_update": opts.force_update,
                "ignore_missing": opts.ignore_missing,
            }),
        )
    }

    async fn resync_cluster(&self, kind: ClusterKind, id: &str) -> Result<()> {
        self.respond_unit("resync_cluster", json!({"kind": kind, "id": id}))
    }

    async fn resync_clusters(
        &self,
        kind: ClusterKind,
        skip_matching_version: bool,
    ) -> Result<IndexSynchronizationResults> {
        self.respond(
            "resync_clusters",
            json!({"kind": kind, "skip_matching_version": skip_matching_version}),
        )
    }

    async fn cluster_diagnostics(&self, id: &str) -> Result<Vec<u8>> {
        match self.take("cluster_diagnostics", json!({ "id": id }))? {
            Scripted::Err(e) => Err(e),
            Scripted::Json(Value::String(s)) => Ok(s.into_bytes()),
            Scripted::Json(v) | Scripted::Created(v) | Scripted::Accepted(v) => {
                decode("cluster_diagnostics", v)
            }
        }
    }

    async fn proxy_request(
        &self,
        id: &str,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ProxyResponse> {
        let args = json!({"id": id, "method": method.as_str(), "path": path, "body": body});
        match self.take("proxy_request", args)? {
            Scripted::Err(e) => Err(e),
            Scripted::Json(v) | Scripted::Created(v) | Scripted::Accepted(v) => {
                let status = v
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(200);
                let body = match v.get("body") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(ProxyResponse { status, body })
            }
        }
    }

    async fn add_note(&self, kind: ClusterKind, id: &str, note: &Note) -> Result<()> {
        self.respond_unit(
            "add_note",
            json!({"kind": kind, "id": id, "note": to_json(note)}),
        )
    }

    async fn plan_activity(&self, kind: ClusterKind, id: &str) -> Result<PlanActivity> {
        self.respond("plan_activity", json!({"kind": kind, "id": id}))
    }

    async fn get_keystore(&self, id: &str) -> Result<KeystoreContents> {
        self.respond("get_keystore", json!({ "id": id }))
    }

    async fn set_keystore(
        &self,
        id: &str,
        contents: &KeystoreContents,
    ) -> Result<KeystoreContents> {
        self.respond(
            "set_keystore",
            json!({"id": id, "contents": to_json(contents)}),
        )
    }

    async fn get_cluster_metadata(&self, id: &str) -> Result<Value> {
        self.respond("get_cluster_metadata", json!({ "id": id }))
    }

    async fn set_cluster_metadata(
        &self,
        id: &str,
        metadata: &Value,
        version: Option<u64>,
    ) -> Result<Value> {
        self.respond(
            "set_cluster_metadata",
            json!({"id": id, "metadata": metadata, "version": version}),
        )
    }

    async fn update_cluster_metadata_settings(
        &self,
        id: &str,
        settings: &ClusterMetadataSettings,
    ) -> Result<ClusterMetadataSettings> {
        self.respond(
            "update_cluster_metadata_settings",
            json!({"id": id, "settings": to_json(settings)}),
        )
    }

    async fn list_repositories(&self) -> Result<RepositoryConfigs> {
        self.respond("list_repositories", Value::Null)
    }

    async fn get_repository(&self, name: &str) -> Result<RepositoryConfig> {
        self.respond("get_repository", json!({ "name": name }))
    }

    async fn set_repository(
        &self,
        name: &str,
        config: &SnapshotRepositoryConfiguration,
    ) -> Result<RepositoryConfig> {
        self.respond(
            "set_repository",
            json!({"name": name, "config": to_json(config)}),
        )
    }

    async fn delete_repository(&self, name: &str) -> Result<()> {
        self.respond_unit("delete_repository", json!({ "name": name }))
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        self.respond("create_user", to_json(user))
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        self.respond("get_user", json!({ "name": name }))
    }

    async fn list_users(&self) -> Result<UserList> {
        self.respond("list_users", Value::Null)
    }

    async fn update_user(&self, name: &str, user: &User) -> Result<User> {
        self.respond("update_user", json!({"name": name, "user": to_json(user)}))
    }

    async fn delete_user(&self, name: &str) -> Result<()> {
        self.respond_unit("delete_user", json!({ "name": name }))
    }

    async fn get_current_user(&self) -> Result<User> {
        self.respond("get_current_user", Value::Null)
    }

    async fn update_current_user(&self, user: &User) -> Result<User> {
        self.respond("update_current_user", to_json(user))
    }

    async fn create_api_key(&self, request: &CreateApiKeyRequest) -> Result<ApiKey> {
        self.respond("create_api_key", to_json(request))
    }

    async fn list_api_keys(&self) -> Result<ApiKeyList> {
        self.respond("list_api_keys", Value::Null)
    }

    async fn list_user_api_keys(&self, user_id: &str) -> Result<ApiKeyList> {
        self.respond("list_user_api_keys", json!({ "user_id": user_id }))
    }

    async fn list_all_api_keys(&self) -> Result<ApiKeyList> {
        self.respond("list_all_api_keys", Value::Null)
    }

    async fn get_api_key(&self, key_id: &str) -> Result<ApiKey> {
        self.respond("get_api_key", json!({ "key_id": key_id }))
    }

    async fn get_user_api_key(&self, user_id: &str, key_id: &str) -> Result<ApiKey> {
        self.respond(
            "get_user_api_key",
            json!({"user_id": user_id, "key_id": key_id}),
        )
    }

    async fn delete_api_keys(&self, key_ids: &[String]) -> Result<()> {
        self.respond_unit("delete_api_keys", json!({ "keys": key_ids }))
    }

    async fn delete_user_api_key(&self, user_id: &str, key_id: &str) -> Result<()> {
        self.respond_unit(
            "delete_user_api_key",
            json!({"user_id": user_id, "key_id": key_id}),
        )
    }

    async fn list_proxies(&self) -> Result<ProxyOverview> {
        self.respond("list_proxies", Value::Null)
    }

    async fn get_proxy(&self, proxy_id: &str) -> Result<ProxyInfo> {
        self.respond("get_proxy", json!({ "proxy_id": proxy_id }))
    }

    async fn list_proxy_filtered_groups(&self) -> Result<Vec<ProxiesFilteredGroupHealth>> {
        self.respond("list_proxy_filtered_groups", Value::Null)
    }

    async fn get_proxy_filtered_group(&self, id: &str) -> Result<ProxiesFilteredGroupHealth> {
        self.respond("get_proxy_filtered_group", json!({ "id": id }))
    }

    async fn create_proxy_filtered_group(
        &self,
        group: &ProxiesFilteredGroup,
    ) -> Result<ProxiesFilteredGroup> {
        self.respond("create_proxy_filtered_group", to_json(group))
    }

    async fn update_proxy_filtered_group(
        &self,
        id: &str,
        group: &ProxiesFilteredGroup,
        version: Option<u64>,
    ) -> Result<ProxiesFilteredGroup> {
        self.respond(
            "update_proxy_filtered_group",
            json!({"id": id, "group": to_json(group), "version": version}),
        )
    }

    async fn delete_proxy_filtered_group(&self, id: &str) -> Result<()> {
        self.respond_unit("delete_proxy_filtered_group", json!({ "id": id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_is_fifo_per_endpoint() {
        let api = ScriptedApi::new();
        api.push_ok("get_cluster", json!({"status": "stopped"}))
            .push_ok("get_cluster", json!({"status": "started"}));

        let first = api
            .get_cluster("a", &ShowOptions::default())
            .await
            .unwrap();
        let second = api
            .get_cluster("a", &ShowOptions::default())
            .await
            .unwrap();
        assert!(first.status.unwrap().is_stopped());
        assert!(!second.status.unwrap().is_stopped());
        assert_eq!(api.call_count("get_cluster"), 2);
    }

    #[tokio::test]
    async fn test_unscripted_endpoint_errors() {
        let api = ScriptedApi::new();
        let err = api.delete_cluster("a").await.unwrap_err();
        assert_eq!(err.status(), Some(501));
        assert_eq!(api.endpoints(), vec!["delete_cluster"]);
    }

    #[tokio::test]
    async fn test_mutation_kinds() {
        let api = ScriptedApi::new();
        api.push_created("create_cluster", json!({"elasticsearch_cluster_id": "x"}));
        let resp = api
            .create_cluster(&CreateElasticsearchClusterRequest::default(), false)
            .await
            .unwrap();
        assert!(matches!(resp, MutationResponse::Created(_)));
        assert_eq!(api.remaining("create_cluster"), 0);
    }

    #[tokio::test]
    async fn test_unit_endpoints_ignore_body() {
        let api = ScriptedApi::new();
        api.push_ok("delete_cluster", json!({}));
        api.delete_cluster("a").await.unwrap();
        assert_eq!(api.calls()[0].args, json!({"id": "a"}));
    }
}
