//! reqwest implementation of [`RemoteApi`].

use crate::cluster::{
    ChangeTicket, ClusterCommandResponse, ClusterKind, ClusterMetadataSettings,
    CreateElasticsearchClusterRequest, ElasticsearchClusterInfo, ElasticsearchClustersInfo,
    IndexSynchronizationResults, KeystoreContents, KibanaClustersInfo, ListOptions, MoveOptions,
    MutationResponse, Note, ProxyResponse, RestartOptions, ShowOptions, ShutdownOptions,
    StopInstancesOptions,
};
use crate::config::{request_timeout, ApiConfig, Credentials};
use crate::error::{ApiError, Result};
use crate::plan::{ElasticsearchClusterPlan, PlanActivity, TransientPlanConfiguration};
use crate::platform::{
    ProxiesFilteredGroup, ProxiesFilteredGroupHealth, ProxyInfo, ProxyOverview, RepositoryConfig,
    RepositoryConfigs, SnapshotRepositoryConfiguration,
};
use crate::remote::RemoteApi;
use crate::users::{
    ApiKey, ApiKeyList, CreateApiKeyRequest, DeleteApiKeysRequest, User, UserList,
};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const API_PREFIX: &str = "/api/v1";

/// Query string pairs.
type Query<'a> = &'a [(&'a str, String)];

struct RawResponse {
    status: StatusCode,
    url: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|source| ApiError::Decode {
            url: self.url.clone(),
            source,
        })
    }

    fn into_mutation(self) -> Result<MutationResponse> {
        let ticket = if self.body.iter().all(u8::is_ascii_whitespace) {
            ChangeTicket::default()
        } else {
            self.decode::<ChangeTicket>()?
        };
        if self.status == StatusCode::CREATED {
            Ok(MutationResponse::Created(ticket))
        } else {
            Ok(MutationResponse::Accepted(ticket))
        }
    }
}

/// Authenticated control-plane client.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: String,
    credentials: Credentials,
    timeout_floor: Duration,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base: format!("{}{}", config.host.trim_end_matches('/'), API_PREFIX),
            credentials: config.credentials.clone(),
            timeout_floor: config.timeout_floor(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match &self.credentials {
            Credentials::None => request,
            Credentials::ApiKey { key } => {
                let value = HeaderValue::from_str(&format!("ApiKey {}", key))
                    .map_err(|e| ApiError::Config(format!("api key: {}", e)))?;
                request.header(AUTHORIZATION, value)
            }
            Credentials::Bearer { token } => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<Value>,
        size_hint: u64,
    ) -> Result<RawResponse> {
        let url = self.url(path);
        let timeout = request_timeout(self.timeout_floor, size_hint);
        debug!(%method, %url, timeout_secs = timeout.as_secs(), "remote request");

        let mut request = self
            .authorize(self.client.request(method.clone(), &url))?
            .timeout(timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(method.as_str(), url.as_str(), e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(method.as_str(), url.as_str(), e))?;

        if !status.is_success() {
            debug!(%method, %url, status = status.as_u16(), "remote error");
            return Err(ApiError::from_response(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }

        Ok(RawResponse {
            status,
            url,
            body: bytes.to_vec(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T> {
        self.send(Method::GET, path, query, None, 0).await?.decode()
    }

    async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: &B,
    ) -> Result<T> {
        let body = encode(&self.url(path), body)?;
        self.send(Method::PUT, path, query, Some(body), 0)
            .await?
            .decode()
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<T> {
        let body = body.map(|b| encode(&self.url(path), b)).transpose()?;
        self.send(Method::POST, path, query, body, 0)
            .await?
            .decode()
    }

    async fn patch<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = encode(&self.url(path), body)?;
        self.send(Method::PATCH, path, &[], Some(body), 0)
            .await?
            .decode()
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<()> {
        self.send(Method::DELETE, path, &[], body, 0).await?;
        Ok(())
    }
}

fn encode<B: Serialize>(url: &str, body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

fn flag(name: &'static str, value: bool) -> Option<(&'static str, String)> {
    value.then(|| (name, "true".to_string()))
}

fn cluster_path(kind: ClusterKind, id: &str) -> String {
    format!("/clusters/{}/{}", kind.as_path(), id)
}

fn es_path(id: &str) -> String {
    cluster_path(ClusterKind::Elasticsearch, id)
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn create_cluster(
        &self,
        request: &CreateElasticsearchClusterRequest,
        validate_only: bool,
    ) -> Result<MutationResponse> {
        let path = "/clusters/elasticsearch";
        let query: Vec<_> = flag("validate_only", validate_only).into_iter().collect();
        let body = encode(&self.url(path), request)?;
        self.send(Method::POST, path, &query, Some(body), 0)
            .await?
            .into_mutation()
    }

    async fn get_cluster(&self, id: &str, opts: &ShowOptions) -> Result<ElasticsearchClusterInfo> {
        let query: Vec<_> = [
            flag("show_metadata", opts.show_metadata),
            flag("show_plans", opts.show_plans),
            flag("show_plan_logs", opts.show_plan_logs),
            flag("show_settings", opts.show_settings),
        ]
        .into_iter()
        .flatten()
        .collect();
        self.get(&es_path(id), &query).await
    }

    async fn list_clusters(&self, opts: &ListOptions) -> Result<ElasticsearchClustersInfo> {
        let query = list_query(opts);
        self.send(
            Method::GET,
            "/clusters/elasticsearch",
            &query,
            None,
            opts.size.unwrap_or(0),
        )
        .await?
        .decode()
    }

    async fn list_kibana_clusters(&self, opts: &ListOptions) -> Result<KibanaClustersInfo> {
        let query = list_query(opts);
        self.send(
            Method::GET,
            "/clusters/kibana",
            &query,
            None,
            opts.size.unwrap_or(0),
        )
        .await?
        .decode()
    }

    async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.delete(&es_path(id), None).await
    }

    async fn update_cluster_plan(
        &self,
        id: &str,
        plan: &ElasticsearchClusterPlan,
        validate_only: bool,
    ) -> Result<MutationResponse> {
        let path = format!("{}/plan", es_path(id));
        let query: Vec<_> = flag("validate_only", validate_only).into_iter().collect();
        let body = encode(&self.url(&path), plan)?;
        self.send(Method::POST, &path, &query, Some(body), 0)
            .await?
            .into_mutation()
    }

    async fn restart_cluster(
        &self,
        id: &str,
        opts: &RestartOptions,
    ) -> Result<ClusterCommandResponse> {
        let mut query: Vec<_> = [
            flag("cancel_pending", opts.cancel_pending),
            flag("restore_snapshot", opts.restore_snapshot),
            flag("skip_snapshot", opts.skip_snapshot),
        ]
        .into_iter()
        .flatten()
        .collect();
        if let Some(group) = &opts.group_attribute {
            query.push(("group_attribute", group.clone()));
        }
        self.post::<(), _>(&format!("{}/_restart", es_path(id)), &query, None)
            .await
    }

    async fn shutdown_cluster(
        &self,
        id: &str,
        opts: &ShutdownOptions,
    ) -> Result<ClusterCommandResponse> {
        let query: Vec<_> = [
            flag("hide", opts.hide),
            flag("skip_snapshot", opts.skip_snapshot),
        ]
        .into_iter()
        .flatten()
        .collect();
        self.post::<(), _>(&format!("{}/_shutdown", es_path(id)), &query, None)
            .await
    }

    async fn stop_instances(
        &self,
        id: &str,
        instance_ids: &[String],
        opts: &StopInstancesOptions,
    ) -> Result<ClusterCommandResponse> {
        let path = if instance_ids.is_empty() {
            format!("{}/instances/_stop", es_path(id))
        } else {
            format!("{}/instances/{}/_stop", es_path(id), instance_ids.join(","))
        };
        let query: Vec<_> = flag("ignore_missing", opts.ignore_missing)
            .into_iter()
            .collect();
        self.post::<(), _>(&path, &query, None).await
    }

    async fn move_instances(
        &self,
        kind: ClusterKind,
        id: &str,
        instance_ids: &[String],
        body: Option<&TransientPlanConfiguration>,
        opts: &MoveOptions,
    ) -> Result<ClusterCommandResponse> {
        let path = format!(
            "{}/instances/{}/_move",
            cluster_path(kind, id),
            instance_ids.join(",")
        );
        let query: Vec<_> = [
            flag("force_update", opts.force_update),
            flag("ignore_missing", opts.ignore_missing),
            flag("instances_down", opts.instances_down),
            flag("validate_only", opts.validate_only),
        ]
        .into_iter()
        .flatten()
        .collect();
        let body = body.map(|b| serde_json::json!({ "transient": b }));
        self.post(&path, &query, body.as_ref()).await
    }

    async fn resync_cluster(&self, kind: ClusterKind, id: &str) -> Result<()> {
        let path = format!("{}/_resync", cluster_path(kind, id));
        self.send(Method::POST, &path, &[], None, 0).await?;
        Ok(())
    }

    async fn resync_clusters(
        &self,
        kind: ClusterKind,
        skip_matching_version: bool,
    ) -> Result<IndexSynchronizationResults> {
        let path = format!("/clusters/{}/_resync", kind.as_path());
        let query: Vec<_> = flag("skip_matching_version", skip_matching_version)
            .into_iter()
            .collect();
        self.post::<(), _>(&path, &query, None).await
    }

    async fn cluster_diagnostics(&self, id: &str) -> Result<Vec<u8>> {
        let path = format!("{}/support/_diagnostics", es_path(id));
        let raw = self.send(Method::GET, &path, &[], None, 0).await?;
        Ok(raw.body)
    }

    async fn proxy_request(
        &self,
        id: &str,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ProxyResponse> {
        let url = self.url(&format!("{}/proxy/{}", es_path(id), path.trim_start_matches('/')));
        debug!(%method, %url, "proxied request");

        let mut request = self
            .authorize(self.client.request(method.clone(), &url))?
            .timeout(self.timeout_floor)
            .header("X-Management-Request", "true");
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(method.as_str(), url.as_str(), e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(method.as_str(), url.as_str(), e))?;
        Ok(ProxyResponse { status, body })
    }

    async fn add_note(&self, kind: ClusterKind, id: &str, note: &Note) -> Result<()> {
        let path = format!("{}/notes", cluster_path(kind, id));
        let body = encode(&self.url(&path), note)?;
        self.send(Method::POST, &path, &[], Some(body), 0).await?;
        Ok(())
    }

    async fn plan_activity(&self, kind: ClusterKind, id: &str) -> Result<PlanActivity> {
        let path = format!("{}/plan/activity", cluster_path(kind, id));
        self.get(&path, &[("show_plan_logs", "true".to_string())])
            .await
    }

    async fn get_keystore(&self, id: &str) -> Result<KeystoreContents> {
        self.get(&format!("{}/keystore", es_path(id)), &[]).await
    }

    async fn set_keystore(
        &self,
        id: &str,
        contents: &KeystoreContents,
    ) -> Result<KeystoreContents> {
        self.patch(&format!("{}/keystore", es_path(id)), contents)
            .await
    }

    async fn get_cluster_metadata(&self, id: &str) -> Result<Value> {
        self.get(&format!("{}/metadata/raw", es_path(id)), &[])
            .await
    }

    async fn set_cluster_metadata(
        &self,
        id: &str,
        metadata: &Value,
        version: Option<u64>,
    ) -> Result<Value> {
        let query: Vec<_> = version
            .map(|v| ("version", v.to_string()))
            .into_iter()
            .collect();
        self.post(&format!("{}/metadata/raw", es_path(id)), &query, Some(metadata))
            .await
    }

    async fn update_cluster_metadata_settings(
        &self,
        id: &str,
        settings: &ClusterMetadataSettings,
    ) -> Result<ClusterMetadataSettings> {
        self.patch(&format!("{}/metadata/settings", es_path(id)), settings)
            .await
    }

    async fn list_repositories(&self) -> Result<RepositoryConfigs> {
        self.get("/platform/configuration/snapshots/repositories", &[])
            .await
    }

    async fn get_repository(&self, name: &str) -> Result<RepositoryConfig> {
        self.get(&repository_path(name), &[]).await
    }

    async fn set_repository(
        &self,
        name: &str,
        config: &SnapshotRepositoryConfiguration,
    ) -> Result<RepositoryConfig> {
        self.put(&repository_path(name), &[], config).await
    }

    async fn delete_repository(&self, name: &str) -> Result<()> {
        self.delete(&repository_path(name), None).await
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        self.post("/users", &[], Some(user)).await
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        self.get(&user_path(name), &[]).await
    }

    async fn list_users(&self) -> Result<UserList> {
        self.get("/users", &[]).await
    }

    async fn update_user(&self, name: &str, user: &User) -> Result<User> {
        self.patch(&user_path(name), user).await
    }

    async fn delete_user(&self, name: &str) -> Result<()> {
        self.delete(&user_path(name), None).await
    }

    async fn get_current_user(&self) -> Result<User> {
        self.get("/user", &[]).await
    }

    async fn update_current_user(&self, user: &User) -> Result<User> {
        self.patch("/user", user).await
    }

    async fn create_api_key(&self, request: &CreateApiKeyRequest) -> Result<ApiKey> {
        self.post("/users/auth/keys", &[], Some(request)).await
    }

    async fn list_api_keys(&self) -> Result<ApiKeyList> {
        self.get("/users/auth/keys", &[]).await
    }

    async fn list_user_api_keys(&self, user_id: &str) -> Result<ApiKeyList> {
        self.get(&format!("{}/auth/keys", user_path(user_id)), &[])
            .await
    }

    async fn list_all_api_keys(&self) -> Result<ApiKeyList> {
        self.get("/users/auth/keys/_all", &[]).await
    }

    async fn get_api_key(&self, key_id: &str) -> Result<ApiKey> {
        self.get(&api_key_path(key_id), &[])
            .await
    }

    async fn get_user_api_key(&self, user_id: &str, key_id: &str) -> Result<ApiKey> {
        self.get(&user_api_key_path(user_id, key_id), &[])
            .await
    }

    async fn delete_api_keys(&self, key_ids: &[String]) -> Result<()> {
        let path = "/users/auth/keys";
        let body = encode(
            &self.url(path),
            &DeleteApiKeysRequest {
                keys: key_ids.to_vec(),
            },
        )?;
        self.delete(path, Some(body)).await
    }

    async fn delete_user_api_key(&self, user_id: &str, key_id: &str) -> Result<()> {
        self.delete(&user_api_key_path(user_id, key_id), None)
            .await
    }

    async fn list_proxies(&self) -> Result<ProxyOverview> {
        self.get("/platform/infrastructure/proxies", &[]).await
    }

    async fn get_proxy(&self, proxy_id: &str) -> Result<ProxyInfo> {
        self.get(
            &format!("/platform/infrastructure/proxies/{}", proxy_id),
            &[],
        )
        .await
    }

    async fn list_proxy_filtered_groups(&self) -> Result<Vec<ProxiesFilteredGroupHealth>> {
        self.get("/platform/infrastructure/proxies/filtered-groups", &[])
            .await
    }

    async fn get_proxy_filtered_group(&self, id: &str) -> Result<ProxiesFilteredGroupHealth> {
        self.get(&filtered_group_path(id), &[]).await
    }

    async fn create_proxy_filtered_group(
        &self,
        group: &ProxiesFilteredGroup,
    ) -> Result<ProxiesFilteredGroup> {
        self.post(
            "/platform/infrastructure/proxies/filtered-groups",
            &[],
            Some(group),
        )
        .await
    }

    async fn update_proxy_filtered_group(
        &self,
        id: &str,
        group: &ProxiesFilteredGroup,
        version: Option<u64>,
    ) -> Result<ProxiesFilteredGroup> {
        let query: Vec<_> = version
            .map(|v| ("version", v.to_string()))
            .into_iter()
            .collect();
        self.put(&filtered_group_path(id), &query, group).await
    }

    async fn delete_proxy_filtered_group(&self, id: &str) -> Result<()> {
        self.delete(&filtered_group_path(id), None).await
    }
}

fn list_query(opts: &ListOptions) -> Vec<(&'static str, String)> {
    let mut query: Vec<_> = [
        flag("show_metadata", opts.show_metadata),
        flag("show_plans", opts.show_plans),
    ]
    .into_iter()
    .flatten()
    .collect();
    if let Some(size) = opts.size {
        query.push(("size", size.to_string()));
    }
    if let Some(q) = &opts.query {
        query.push(("q", q.clone()));
    }
    query
}

fn repository_path(name: &str) -> String {
    format!(
        "/platform/configuration/snapshots/repositories/{}",
        urlencoding::encode(name)
    )
}

fn user_path(name: &str) -> String {
    format!("/users/{}", urlencoding::encode(name))
}

fn api_key_path(key_id: &str) -> String {
    format!("/users/auth/keys/{}", urlencoding::encode(key_id))
}

fn user_api_key_path(user_id: &str, key_id: &str) -> String {
    format!("{}/auth/keys/{}", user_path(user_id), urlencoding::encode(key_id))
}

fn filtered_group_path(id: &str) -> String {
    format!(
        "/platform/infrastructure/proxies/filtered-groups/{}",
        urlencoding::encode(id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query as QueryParams};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn api(host: String, credentials: Credentials) -> HttpApi {
        HttpApi::new(ApiConfig {
            host,
            credentials,
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_cluster_passes_flags_and_api_key() {
        let router = Router::new().route(
            "/api/v1/clusters/elasticsearch/:id",
            get(
                |Path(id): Path<String>,
                 QueryParams(q): QueryParams<HashMap<String, String>>,
                 headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({
                        "cluster_id": id,
                        "status": "started",
                        "cluster_name": format!("{}|{}", auth, q.get("show_plans").cloned().unwrap_or_default()),
                    }))
                },
            ),
        );
        let host = serve(router).await;
        let api = api(
            host,
            Credentials::ApiKey {
                key: "s3cr3t".to_string(),
            },
        );

        let opts = ShowOptions {
            show_plans: true,
            ..ShowOptions::default()
        };
        let info = api
            .get_cluster("320b7b540dfc967a7a649c18e2fce4ed", &opts)
            .await
            .unwrap();
        assert_eq!(info.cluster_id, "320b7b540dfc967a7a649c18e2fce4ed");
        assert_eq!(info.cluster_name.as_deref(), Some("ApiKey s3cr3t|true"));
    }

    #[tokio::test]
    async fn test_remote_envelope_becomes_error_message() {
        let router = Router::new().route(
            "/api/v1/clusters/elasticsearch/:id",
            get(|| async {
                (
                    AxumStatus::NOT_FOUND,
                    Json(serde_json::json!({"errors": [{
                        "code": "clusters.cluster_not_found",
                        "message": "No Elasticsearch cluster found"
                    }]})),
                )
            }),
        );
        let host = serve(router).await;
        let err = api(host, Credentials::None)
            .get_cluster("x", &ShowOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "clusters.cluster_not_found: No Elasticsearch cluster found"
        );
    }

    #[tokio::test]
    async fn test_created_and_accepted_are_distinguished() {
        let router = Router::new()
            .route(
                "/api/v1/clusters/elasticsearch",
                post(|| async {
                    (
                        AxumStatus::CREATED,
                        Json(serde_json::json!({"elasticsearch_cluster_id": "new"})),
                    )
                }),
            )
            .route(
                "/api/v1/clusters/elasticsearch/:id/plan",
                post(|Path(id): Path<String>| async move {
                    (
                        AxumStatus::ACCEPTED,
                        Json(serde_json::json!({"elasticsearch_cluster_id": id})),
                    )
                }),
            );
        let host = serve(router).await;
        let api = api(host, Credentials::None);

        let created = api
            .create_cluster(&CreateElasticsearchClusterRequest::default(), false)
            .await
            .unwrap();
        assert!(matches!(created, MutationResponse::Created(_)));

        let accepted = api
            .update_cluster_plan("abc", &ElasticsearchClusterPlan::default(), false)
            .await
            .unwrap();
        assert_eq!(
            accepted,
            MutationResponse::Accepted(ChangeTicket {
                elasticsearch_cluster_id: Some("abc".to_string()),
                ..ChangeTicket::default()
            })
        );
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let router = Router::new().route(
            "/api/v1/clusters/elasticsearch/:id",
            delete(|| async { Json(serde_json::json!({})) }),
        );
        let host = serve(router).await;
        api(host, Credentials::None)
            .delete_cluster("abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let router = Router::new().route(
            "/api/v1/user",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(serde_json::json!({"user_name": auth}))
            }),
        );
        let host = serve(router).await;
        let user = api(
            host,
            Credentials::Bearer {
                token: "tok".to_string(),
            },
        )
        .get_current_user()
        .await
        .unwrap();
        assert_eq!(user.user_name, "Bearer tok");
    }

    #[tokio::test]
    async fn test_proxy_keeps_non_success_status() {
        let router = Router::new().route(
            "/api/v1/clusters/elasticsearch/:id/proxy/*rest",
            get(|Path((_, rest)): Path<(String, String)>| async move {
                (AxumStatus::BAD_REQUEST, format!("bad path {}", rest))
            }),
        );
        let host = serve(router).await;
        let resp = api(host, Credentials::None)
            .proxy_request("abc", Method::GET, "/_cat/indices", None)
            .await
            .unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body, "bad path _cat/indices");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api(format!("http://{}", addr), Credentials::None)
            .list_users()
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().starts_with("GET http://"));
    }

    #[test]
    fn test_new_rejects_header_unsafe_api_key() {
        let err = HttpApi::new(ApiConfig {
            host: "http://127.0.0.1:1".to_string(),
            credentials: Credentials::ApiKey {
                key: "abc\r\ndef".to_string(),
            },
            ..ApiConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[tokio::test]
    async fn test_unencodable_api_key_is_config_error_not_anonymous_request() {
        let api = HttpApi {
            client: Client::new(),
            base: format!("http://127.0.0.1:1{}", API_PREFIX),
            credentials: Credentials::ApiKey {
                key: "abc\ndef".to_string(),
            },
            timeout_floor: Duration::from_secs(1),
        };
        let err = api.list_users().await.unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_path_identifiers_are_encoded() {
        let router = Router::new()
            .route(
                "/api/v1/platform/infrastructure/proxies/filtered-groups/:id",
                get(|Path(id): Path<String>| async move {
                    Json(serde_json::json!({"filtered_group": {"id": id}, "status": "healthy"}))
                }),
            )
            .route(
                "/api/v1/users/auth/keys/:id",
                get(|Path(id): Path<String>| async move { Json(serde_json::json!({"id": id})) }),
            );
        let host = serve(router).await;
        let api = api(host, Credentials::None);

        let health = api.get_proxy_filtered_group("zone a/b").await.unwrap();
        assert_eq!(health.filtered_group.id, "zone a/b");
        let key = api.get_api_key("k/1").await.unwrap();
        assert_eq!(key.id, "k/1");
    }

    #[test]
    fn test_list_query_includes_size() {
        let query = list_query(&ListOptions {
            size: Some(250),
            query: Some("cluster_name:prod".to_string()),
            show_metadata: true,
            show_plans: false,
        });
        assert_eq!(
            query,
            vec![
                ("show_metadata", "true".to_string()),
                ("size", "250".to_string()),
                ("q", "cluster_name:prod".to_string()),
            ]
        );
    }
}
