//! Upgrade planning.
//!
//! [`plan_upgrade`] derives the plan to submit for a version change. It is a
//! pure function over the current plan, both versions and per-instance
//! topology signals.
//!
//! Strategy selection:
//! - the major version changes (either direction): [`PlanStrategy::MajorUpgrade`];
//! - otherwise, any instance under pressure: [`PlanStrategy::RollingByName`];
//! - otherwise [`PlanStrategy::Default`].

use crate::version::Version;
use esfleet_api::cluster::ClusterInstanceInfo;
use esfleet_api::plan::{ElasticsearchClusterPlan, PlanStrategy, TransientPlanConfiguration};

/// Memory pressure (percent) at or above which an instance upgrades in place.
pub const MEMORY_PRESSURE_THRESHOLD: i64 = 65;
/// Absolute disk usage (MB) at or above which an instance upgrades in place.
pub const DISK_CEILING_MB: i64 = 100 * 1024;
/// Storage provisioned per MB of memory.
pub const STORAGE_MULTIPLIER: f64 = 24.0;
/// Fraction of provisioned storage that triggers an in-place upgrade.
pub const DISK_TRIGGER_RATIO: f64 = 0.25;

/// Topology signals of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceSignals {
    /// Memory capacity in MB.
    pub capacity_mb: i64,
    /// JVM memory pressure percentage.
    pub memory_pressure: i64,
    /// Disk used in MB.
    pub disk_used_mb: i64,
}

impl InstanceSignals {
    /// Signals of a reported instance. Instances without memory information
    /// carry no capacity to reason about and yield `None`.
    pub fn from_instance(instance: &ClusterInstanceInfo) -> Option<Self> {
        let memory = instance.memory.as_ref()?;
        Some(Self {
            capacity_mb: memory.instance_capacity,
            memory_pressure: memory.memory_pressure.unwrap_or(0),
            disk_used_mb: instance
                .disk
                .as_ref()
                .and_then(|d| d.disk_space_used)
                .unwrap_or(0),
        })
    }
}

/// Disk threshold proportional to capacity, truncated toward zero.
pub fn proportional_disk_threshold(capacity_mb: i64) -> i64 {
    ((capacity_mb as f64) * STORAGE_MULTIPLIER * DISK_TRIGGER_RATIO) as i64
}

pub fn needs_rolling(signals: &InstanceSignals) -> bool {
    signals.memory_pressure >= MEMORY_PRESSURE_THRESHOLD
        || signals.disk_used_mb >= DISK_CEILING_MB
        || signals.disk_used_mb >= proportional_disk_threshold(signals.capacity_mb)
}

pub fn choose_strategy(
    current: &Version,
    target: &Version,
    topology: &[InstanceSignals],
) -> PlanStrategy {
    if current.major != target.major {
        PlanStrategy::MajorUpgrade
    } else if topology.iter().any(needs_rolling) {
        PlanStrategy::RollingByName
    } else {
        PlanStrategy::Default
    }
}

/// Settings the target major rejects are cleared on a major change.
fn adjust_for_major(plan: &mut ElasticsearchClusterPlan, target: &Version) {
    let Some(settings) = plan.elasticsearch.system_settings.as_mut() else {
        return;
    };

    if settings.default_shards_per_index.is_some_and(|n| n > 0) {
        settings.default_shards_per_index = Some(0);
    }

    if target.major == 6 {
        if let Some(scripting) = settings.scripting.as_mut() {
            scripting.file = None;
            scripting.expressions_enabled = None;
            scripting.mustache_enabled = None;
            scripting.painless_enabled = None;
            for script_type in [scripting.inline.as_mut(), scripting.stored.as_mut()]
                .into_iter()
                .flatten()
            {
                script_type.sandbox_mode = None;
            }
        }
    }
}

/// Builds the plan that moves `current_plan` to `target`.
///
/// `target_raw` is written verbatim as the new version so build suffixes
/// survive.
pub fn plan_upgrade(
    current_plan: &ElasticsearchClusterPlan,
    current: &Version,
    target: &Version,
    target_raw: &str,
    topology: &[InstanceSignals],
) -> ElasticsearchClusterPlan {
    let strategy = choose_strategy(current, target, topology);
    let mut plan = current_plan.clone();
    plan.elasticsearch.version = target_raw.to_string();

    if strategy == PlanStrategy::MajorUpgrade {
        adjust_for_major(&mut plan, target);
    }

    let transient = plan
        .transient
        .get_or_insert_with(TransientPlanConfiguration::default);
    transient.strategy = Some(strategy);
    plan
}
