//! Plan documents and plan-attempt observations.
//!
//! Only the fields this library reads or rewrites are typed. Everything else is
//! carried through `extra` maps so a plan survives a read-modify-write cycle
//! without losing remote fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attribute the remote uses to group instances by name.
pub const GROUP_BY_NAME: &str = "__name__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchClusterPlan {
    pub elasticsearch: ElasticsearchConfiguration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cluster_topology: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient: Option<TransientPlanConfiguration>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfiguration {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_settings: Option<SystemSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_shards_per_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripting: Option<ScriptingSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<ScriptTypeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<ScriptTypeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<ScriptTypeSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expressions_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mustache_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub painless_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptTypeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_mode: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientPlanConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<PlanStrategy>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// How a plan change is rolled out across instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireStrategy", into = "WireStrategy")]
pub enum PlanStrategy {
    /// The remote picks.
    Default,
    /// One instance at a time, grouped by instance name.
    RollingByName,
    /// Rolling grouped by an arbitrary attribute.
    Rolling { group_by: String },
    /// All instances at once; downtime accepted.
    MajorUpgrade,
    GrowAndShrink,
}

impl fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStrategy::Default => write!(f, "Default"),
            PlanStrategy::RollingByName => write!(f, "RollingByName"),
            PlanStrategy::Rolling { group_by } => write!(f, "Rolling({})", group_by),
            PlanStrategy::MajorUpgrade => write!(f, "MajorUpgrade"),
            PlanStrategy::GrowAndShrink => write!(f, "GrowAndShrink"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EmptyConfig {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RollingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<EmptyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rolling: Option<RollingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_upgrade: Option<EmptyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grow_and_shrink: Option<EmptyConfig>,
}

impl From<WireStrategy> for PlanStrategy {
    fn from(w: WireStrategy) -> Self {
        if w.major_upgrade.is_some() {
            return PlanStrategy::MajorUpgrade;
        }
        if w.grow_and_shrink.is_some() {
            return PlanStrategy::GrowAndShrink;
        }
        if let Some(rolling) = w.rolling {
            return match rolling.group_by {
                Some(g) if g == GROUP_BY_NAME => PlanStrategy::RollingByName,
                Some(g) => PlanStrategy::Rolling { group_by: g },
                None => PlanStrategy::RollingByName,
            };
        }
        PlanStrategy::Default
    }
}

impl From<PlanStrategy> for WireStrategy {
    fn from(s: PlanStrategy) -> Self {
        let mut w = WireStrategy::default();
        match s {
            PlanStrategy::Default => w.default = Some(EmptyConfig {}),
            PlanStrategy::RollingByName => {
                w.rolling = Some(RollingConfig {
                    group_by: Some(GROUP_BY_NAME.to_string()),
                })
            }
            PlanStrategy::Rolling { group_by } => {
                w.rolling = Some(RollingConfig {
                    group_by: Some(group_by),
                })
            }
            PlanStrategy::MajorUpgrade => w.major_upgrade = Some(EmptyConfig {}),
            PlanStrategy::GrowAndShrink => w.grow_and_shrink = Some(EmptyConfig {}),
        }
        w
    }
}

/// Status of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Success,
    Warning,
    Error,
}

impl StepStatus {
    /// A finished step never changes status again.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            StepStatus::Success | StepStatus::Warning | StepStatus::Error
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Success => "success",
            StepStatus::Warning => "warning",
            StepStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLogMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info_log: Vec<StepLogMessage>,
}

impl PlanStep {
    pub fn new(step_id: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step_id: step_id.into(),
            status,
            started: None,
            completed: None,
            duration_in_millis: None,
            info_log: Vec::new(),
        }
    }

    /// Reported duration, or the difference between start and completion.
    pub fn duration_millis(&self) -> Option<u64> {
        self.duration_in_millis.or_else(|| match (self.started, self.completed) {
            (Some(s), Some(c)) => u64::try_from((c - s).num_milliseconds()).ok(),
            _ => None,
        })
    }

    /// Last message logged by the step, used as a failure detail.
    pub fn last_message(&self) -> Option<&str> {
        self.info_log.last().map(|m| m.message.as_str())
    }
}

/// One observed attempt at applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanAttempt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_attempt_id: Option<String>,
    pub plan_attempt_log: Vec<PlanStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
}

impl PlanAttempt {
    /// The remote marked the attempt complete; no step is appended afterwards.
    pub fn is_complete(&self) -> bool {
        self.attempt_end_time.is_some()
    }

    /// First step that ended in error.
    pub fn failed_step(&self) -> Option<&PlanStep> {
        self.plan_attempt_log
            .iter()
            .find(|s| s.status == StepStatus::Error)
    }
}

/// Plan activity for a cluster as returned by the plan-activity endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanActivity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<PlanAttempt>,
    pub history: Vec<PlanAttempt>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchClusterPlanInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ElasticsearchClusterPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_attempt_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan_attempt_log: Vec<PlanStep>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchClusterPlansInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ElasticsearchClusterPlanInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<ElasticsearchClusterPlanInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ElasticsearchClusterPlanInfo>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaConfiguration {
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaClusterPlan {
    pub kibana: KibanaConfiguration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaClusterPlanInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<KibanaClusterPlan>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KibanaClusterPlansInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<KibanaClusterPlanInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<KibanaClusterPlanInfo>,
    pub healthy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strategy_wire_shapes() {
        assert_eq!(
            serde_json::to_value(PlanStrategy::MajorUpgrade).unwrap(),
            json!({"major_upgrade": {}})
        );
        assert_eq!(
            serde_json::to_value(PlanStrategy::RollingByName).unwrap(),
            json!({"rolling": {"group_by": "__name__"}})
        );
        assert_eq!(
            serde_json::to_value(PlanStrategy::Default).unwrap(),
            json!({"default": {}})
        );
    }

    #[test]
    fn strategy_decodes_from_wire() {
        let s: PlanStrategy = serde_json::from_value(json!({"rolling": {"group_by": "zone"}})).unwrap();
        assert_eq!(
            s,
            PlanStrategy::Rolling {
                group_by: "zone".to_string()
            }
        );
        let s: PlanStrategy = serde_json::from_value(json!({"rolling": {}})).unwrap();
        assert_eq!(s, PlanStrategy::RollingByName);
        let s: PlanStrategy = serde_json::from_value(json!({})).unwrap();
        assert_eq!(s, PlanStrategy::Default);
    }

    #[test]
    fn plan_keeps_unknown_fields() {
        let raw = json!({
            "elasticsearch": {"version": "5.4.1", "user_settings_yaml": "a: b"},
            "zone_count": 2,
            "transient": {"plan_configuration": {"timeout": 4096}}
        });
        let plan: ElasticsearchClusterPlan = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(plan.elasticsearch.version, "5.4.1");
        assert_eq!(plan.extra.get("zone_count"), Some(&json!(2)));
        assert_eq!(serde_json::to_value(&plan).unwrap(), raw);
    }

    #[test]
    fn attempt_completion_and_failure() {
        let attempt: PlanAttempt = serde_json::from_value(json!({
            "plan_attempt_log": [
                {"step_id": "plan-validator", "status": "success"},
                {"step_id": "allocate-instances", "status": "error",
                 "info_log": [{"message": "no capacity"}]}
            ],
            "attempt_end_time": "2024-01-02T03:04:05Z"
        }))
        .unwrap();
        assert!(attempt.is_complete());
        let failed = attempt.failed_step().unwrap();
        assert_eq!(failed.step_id, "allocate-instances");
        assert_eq!(failed.last_message(), Some("no capacity"));
    }

    #[test]
    fn step_duration_from_timestamps() {
        let step: PlanStep = serde_json::from_value(json!({
            "step_id": "s",
            "status": "success",
            "started": "2024-01-02T03:04:05Z",
            "completed": "2024-01-02T03:04:07.500Z"
        }))
        .unwrap();
        assert_eq!(step.duration_millis(), Some(2500));
    }

    #[test]
    fn finished_statuses() {
        assert!(StepStatus::Success.is_finished());
        assert!(StepStatus::Error.is_finished());
        assert!(StepStatus::Warning.is_finished());
        assert!(!StepStatus::Pending.is_finished());
        assert!(!StepStatus::InProgress.is_finished());
    }
}
