//! Operation scenarios against the scripted control plane.
//!
//! Each test drives a public operation end to end: validation, the remote
//! calls it issues, response dispatch and, where requested, plan tracking.

use serde_json::{json, Value};

/// Cluster targeted by the single-cluster scenarios.
pub const CLUSTER_ID: &str = "320b7b540dfc967a7a649c18e2fce4ed";
/// Cluster returned by the create scenarios.
pub const CREATED_ID: &str = "a933b600b2174bb79eecb977f02a9460";

/// Cluster document with a current plan at `version` and the given instances.
pub fn cluster_with_plan(version: &str, instances: Value) -> Value {
    json!({
        "cluster_id": CLUSTER_ID,
        "status": "started",
        "plan_info": {"current": {"plan": {
            "elasticsearch": {
                "version": version,
                "system_settings": {"default_shards_per_index": 1}
            },
            "cluster_topology": [{"memory_per_node": 1024, "node_count_per_zone": 1}]
        }}},
        "topology": {"instances": instances}
    })
}

/// One running instance with the given memory pressure, capacity and disk use.
pub fn instance(pressure: i64, capacity_mb: i64, disk_used_mb: i64) -> Value {
    json!({
        "instance_name": "instance-0000000000",
        "memory": {"instance_capacity": capacity_mb, "memory_pressure": pressure},
        "disk": {"disk_space_used": disk_used_mb}
    })
}

/// Plan activity with a single attempt holding `steps`.
pub fn activity(steps: Value, complete: bool) -> Value {
    let mut current = json!({"plan_attempt_id": "attempt-0", "plan_attempt_log": steps});
    if complete {
        current["attempt_end_time"] = json!("2024-05-01T10:00:00Z");
    }
    json!({ "current": current })
}
