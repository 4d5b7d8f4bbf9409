//! Platform-level documents: snapshot repositories and proxies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body sent when creating or replacing a snapshot repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRepositoryConfiguration {
    #[serde(rename = "type")]
    pub repository_type: String,
    pub settings: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub repository_name: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfigs {
    pub configs: Vec<RepositoryConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyInfo {
    pub proxy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOverview {
    pub proxies: Vec<ProxyInfo>,
    pub proxies_count: usize,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxiesFilter {
    pub key: String,
    pub value: String,
}

/// Group of proxies selected by metadata filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxiesFilteredGroup {
    pub id: String,
    pub filters: Vec<ProxiesFilter>,
    pub expected_proxies_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxiesFilteredGroupHealth {
    pub filtered_group: ProxiesFilteredGroup,
    pub observed_proxies_count: i32,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_configuration_uses_type_key() {
        let cfg = SnapshotRepositoryConfiguration {
            repository_type: "s3".to_string(),
            settings: serde_json::json!({"bucket": "b"}),
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["type"], "s3");
        assert_eq!(json["settings"]["bucket"], "b");
    }

    #[test]
    fn filtered_group_health_decodes() {
        let health: ProxiesFilteredGroupHealth = serde_json::from_str(
            r#"{"filtered_group":{"id":"eu","filters":[{"key":"zone","value":"eu-1"}],"expected_proxies_count":3},
                "observed_proxies_count":2,"status":"Warning"}"#,
        )
        .unwrap();
        assert_eq!(health.filtered_group.filters.len(), 1);
        assert_eq!(health.observed_proxies_count, 2);
    }
}
