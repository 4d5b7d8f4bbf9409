//! Plan tracking.
//!
//! A tracking session polls the plan activity of one cluster until the current
//! attempt completes. Finished steps are written to the caller's writer, one
//! line each, in the remote's step order and never twice. Not-found answers
//! mean the plan has not materialized yet; they share one retry budget with
//! transport failures. Any other remote error ends the session.
//!
//! Cancellation is cooperative: the token is checked after every poll and the
//! sleep between polls races against it. Cancelling never touches the remote
//! plan.

use crate::error::{OpError, Result};
use crate::multierror::MultiError;
use esfleet_api::cluster::ShowOptions;
use esfleet_api::plan::{PlanAttempt, PlanStep};
use esfleet_api::{ApiError, ClusterKind, RemoteApi, ResourceRef};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Poll cadence and retry budget of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackFrequency {
    /// Delay between polls; must be non-zero.
    pub poll_interval: Duration,
    /// Consecutive not-found or transport failures tolerated.
    pub max_retries: u32,
}

impl Default for TrackFrequency {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Tracking configuration supplied by the caller of a mutating operation.
pub struct TrackParams {
    /// Sink for step events.
    pub writer: Option<Box<dyn Write + Send>>,
    pub frequency: TrackFrequency,
    /// Overrides the operation's default downstream policy when set.
    pub ignore_downstream: Option<bool>,
    pub cancel: CancellationToken,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            writer: None,
            frequency: TrackFrequency::default(),
            ignore_downstream: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for TrackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackParams")
            .field("writer", &self.writer.is_some())
            .field("frequency", &self.frequency)
            .field("ignore_downstream", &self.ignore_downstream)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl TrackParams {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
            ..Self::default()
        }
    }

    pub fn with_frequency(mut self, poll_interval: Duration, max_retries: u32) -> Self {
        self.frequency = TrackFrequency {
            poll_interval,
            max_retries,
        };
        self
    }

    pub fn with_ignore_downstream(mut self, ignore: bool) -> Self {
        self.ignore_downstream = Some(ignore);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("track params");
        if self.writer.is_none() {
            merr.push("output device cannot be empty");
        }
        if self.frequency.poll_interval.is_zero() {
            merr.push("poll frequency must be greater than zero");
        }
        merr.into_result()
    }
}

/// Merges the validation of optional tracking parameters into `merr`.
pub fn check_track(track: &Option<TrackParams>, merr: &mut MultiError) {
    if let Some(track) = track {
        merr.merge_result(track.validate());
    }
}

/// Summary of a finished tracking session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackReport {
    /// Clusters whose plans completed, in tracking order.
    pub resources: Vec<ResourceRef>,
    /// Step lines written to the writer.
    pub steps_written: usize,
}

struct StepEvent<'a> {
    resource: &'a ResourceRef,
    step: &'a PlanStep,
}

impl fmt::Display for StepEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cluster {}: step \"{}\" finished with status {}",
            self.resource, self.step.step_id, self.step.status
        )?;
        if let Some(ms) = self.step.duration_millis() {
            write!(f, " (took {}s)", ms / 1000)?;
        }
        Ok(())
    }
}

/// Position in the step log of the attempt being streamed.
#[derive(Debug, Default)]
struct StepCursor {
    attempt_id: Option<String>,
    next: usize,
}

impl StepCursor {
    /// Writes the finished steps that follow the cursor, stopping at the first
    /// unfinished one so output order matches the remote's step order.
    fn advance<W: Write + ?Sized>(
        &mut self,
        resource: &ResourceRef,
        attempt: &PlanAttempt,
        out: Option<&mut W>,
    ) -> std::io::Result<usize> {
        if let Some(id) = &attempt.plan_attempt_id {
            if self.attempt_id.as_ref().is_some_and(|prev| prev != id) {
                self.next = 0;
            }
            self.attempt_id = Some(id.clone());
        }

        let mut out = out;
        let mut written = 0;
        while let Some(step) = attempt.plan_attempt_log.get(self.next) {
            if !step.status.is_finished() {
                break;
            }
            if let Some(w) = out.as_deref_mut() {
                writeln!(w, "{}", StepEvent { resource, step })?;
                written += 1;
            }
            self.next += 1;
        }
        Ok(written)
    }
}

enum Miss {
    NotMaterialized,
    Transport(ApiError),
}

async fn track_resource(
    api: &dyn RemoteApi,
    resource: &ResourceRef,
    params: &mut TrackParams,
) -> Result<usize> {
    let frequency = params.frequency;
    let mut cursor = StepCursor::default();
    let mut retries = 0u32;
    let mut observed = false;
    let mut written = 0usize;

    loop {
        let miss = match api.plan_activity(resource.kind, &resource.id).await {
            Ok(mut activity) => {
                let attempt = activity
                    .current
                    .take()
                    .or_else(|| if observed { activity.history.pop() } else { None });
                match attempt {
                    Some(attempt) => {
                        observed = true;
                        retries = 0;
                        written += cursor.advance(resource, &attempt, params.writer.as_deref_mut())?;
                        if attempt.is_complete() {
                            return match attempt.failed_step() {
                                Some(step) => Err(OpError::PlanFailed {
                                    resource: resource.clone(),
                                    step_id: step.step_id.clone(),
                                    detail: step
                                        .last_message()
                                        .unwrap_or("step finished with status error")
                                        .to_string(),
                                }),
                                None => Ok(written),
                            };
                        }
                        None
                    }
                    None => Some(Miss::NotMaterialized),
                }
            }
            Err(e) if e.is_not_found() => Some(Miss::NotMaterialized),
            Err(e) if e.is_transport() => Some(Miss::Transport(e)),
            Err(e) => return Err(e.into()),
        };

        if let Some(miss) = miss {
            retries += 1;
            if retries > frequency.max_retries {
                return Err(match miss {
                    Miss::Transport(e) if observed => OpError::Api(e),
                    _ => OpError::TrackingExhausted {
                        resource: resource.clone(),
                        retries: frequency.max_retries,
                    },
                });
            }
            match &miss {
                Miss::NotMaterialized => {
                    debug!(%resource, retries, "plan not materialized yet")
                }
                Miss::Transport(e) => warn!(%resource, retries, error = %e, "plan poll failed"),
            }
        }

        if params.cancel.is_cancelled() {
            return Err(OpError::TrackingCancelled {
                resource: resource.clone(),
            });
        }
        tokio::select! {
            _ = params.cancel.cancelled() => {
                return Err(OpError::TrackingCancelled { resource: resource.clone() });
            }
            _ = tokio::time::sleep(frequency.poll_interval) => {}
        }
    }
}

async fn downstream_of(api: &dyn RemoteApi, resource: &ResourceRef) -> Vec<ResourceRef> {
    if resource.kind != ClusterKind::Elasticsearch {
        return Vec::new();
    }
    match api.get_cluster(&resource.id, &ShowOptions::default()).await {
        Ok(info) => info.downstream(),
        Err(e) => {
            warn!(%resource, error = %e, "could not list downstream clusters");
            Vec::new()
        }
    }
}

/// Tracks the plan of `resource` and, unless downstream clusters are ignored,
/// the plans of every cluster associated with it.
///
/// `ignore_downstream` is the operation's default; the caller's
/// [`TrackParams::ignore_downstream`] takes precedence.
pub async fn track(
    api: &dyn RemoteApi,
    resource: ResourceRef,
    params: &mut TrackParams,
    ignore_downstream: bool,
) -> Result<TrackReport> {
    let ignore = params.ignore_downstream.unwrap_or(ignore_downstream);
    let span = info_span!("track", %resource, ignore_downstream = ignore);

    async move {
        info!("tracking plan");
        let mut report = TrackReport {
            steps_written: track_resource(api, &resource, params).await?,
            resources: vec![resource.clone()],
        };
        if ignore {
            info!(steps = report.steps_written, "plan finished");
            return Ok(report);
        }

        let mut seen = HashSet::from([resource.clone()]);
        let mut queue: VecDeque<ResourceRef> = downstream_of(api, &resource).await.into();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            match track_resource(api, &next, params).await {
                Ok(written) => {
                    report.steps_written += written;
                    report.resources.push(next.clone());
                }
                Err(OpError::TrackingExhausted { .. }) => {
                    debug!(resource = %next, "downstream plan never materialized");
                    continue;
                }
                Err(e) => return Err(e),
            }
            queue.extend(downstream_of(api, &next).await);
        }

        info!(
            steps = report.steps_written,
            clusters = report.resources.len(),
            "plans finished"
        );
        Ok(report)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SharedBuf;
    use esfleet_api::mock::ScriptedApi;
    use serde_json::json;

    const ID: &str = "a933b600b2174bb79eecb977f02a9460";

    fn params(buf: &SharedBuf, max_retries: u32) -> TrackParams {
        TrackParams::new(buf.clone()).with_frequency(Duration::from_secs(1), max_retries)
    }

    fn attempt(steps: serde_json::Value, complete: bool) -> serde_json::Value {
        let mut current = json!({"plan_attempt_id": "attempt-1", "plan_attempt_log": steps});
        if complete {
            current["attempt_end_time"] = json!("2024-05-01T10:00:00Z");
        }
        json!({ "current": current })
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_only_in_history_never_counts_as_observed() {
        // finished before the first poll: visible only in history
        let finished = json!({
            "history": [{
                "plan_attempt_id": "attempt-0",
                "attempt_end_time": "2024-05-01T10:00:00Z",
                "plan_attempt_log": [{"step_id": "plan-completed", "status": "success"}]
            }]
        });
        let api = ScriptedApi::new();
        for _ in 0..3 {
            api.push_ok("plan_activity", finished.clone());
        }
        let buf = SharedBuf::default();

        let err = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 2), true)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::TrackingExhausted { retries: 2, .. }));
        assert!(buf.contents().is_empty());
        assert_eq!(api.call_count("plan_activity"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_not_found_then_empty_terminal() {
        let api = ScriptedApi::new();
        api.push_not_found("plan_activity")
            .push_not_found("plan_activity")
            .push_ok("plan_activity", attempt(json!([]), true));
        let buf = SharedBuf::default();

        let report = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 2), true)
            .await
            .unwrap();
        assert_eq!(report.steps_written, 0);
        assert!(buf.contents().is_empty());
        assert_eq!(api.call_count("plan_activity"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_stream_once_in_order() {
        let api = ScriptedApi::new();
        api.push_ok(
            "plan_activity",
            attempt(
                json!([
                    {"step_id": "plan-validator", "status": "success", "duration_in_millis": 2500},
                    {"step_id": "allocate", "status": "in_progress"},
                ]),
                false,
            ),
        )
        .push_ok(
            "plan_activity",
            attempt(
                json!([
                    {"step_id": "plan-validator", "status": "success", "duration_in_millis": 2500},
                    {"step_id": "allocate", "status": "success"},
                    {"step_id": "plan-completed", "status": "success"},
                ]),
                true,
            ),
        );
        let buf = SharedBuf::default();

        let report = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 2), true)
            .await
            .unwrap();
        assert_eq!(report.steps_written, 3);
        assert_eq!(
            buf.lines(),
            vec![
                format!("Cluster [{}][Elasticsearch]: step \"plan-validator\" finished with status success (took 2s)", ID),
                format!("Cluster [{}][Elasticsearch]: step \"allocate\" finished with status success", ID),
                format!("Cluster [{}][Elasticsearch]: step \"plan-completed\" finished with status success", ID),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_step_is_reported() {
        let api = ScriptedApi::new();
        api.push_ok(
            "plan_activity",
            attempt(
                json!([
                    {"step_id": "plan-validator", "status": "success"},
                    {"step_id": "allocate", "status": "error", "info_log": [{"message": "no capacity"}]},
                ]),
                true,
            ),
        );
        let buf = SharedBuf::default();

        let err = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 2), true)
            .await
            .unwrap_err();
        match err {
            OpError::PlanFailed {
                step_id, detail, ..
            } => {
                assert_eq!(step_id, "allocate");
                assert_eq!(detail, "no capacity");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(buf.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_before_materialization() {
        let api = ScriptedApi::new();
        for _ in 0..3 {
            api.push_not_found("plan_activity");
        }
        let err = track(
            &api,
            ResourceRef::elasticsearch(ID),
            &mut params(&SharedBuf::default(), 2),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OpError::TrackingExhausted { retries: 2, .. }));
        assert_eq!(api.call_count("plan_activity"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_after_observation_surfaces_last_error() {
        let api = ScriptedApi::new();
        api.push_ok(
            "plan_activity",
            attempt(json!([{"step_id": "a", "status": "in_progress"}]), false),
        );
        for _ in 0..2 {
            api.push_err(
                "plan_activity",
                ApiError::transport("GET", "https://ece/plan", "connection reset"),
            );
        }
        let err = track(
            &api,
            ResourceRef::elasticsearch(ID),
            &mut params(&SharedBuf::default(), 1),
            true,
        )
        .await
        .unwrap_err();
        match err {
            OpError::Api(e) => assert!(e.is_transport()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_resets_on_observation() {
        let api = ScriptedApi::new();
        api.push_not_found("plan_activity")
            .push_ok(
                "plan_activity",
                attempt(json!([{"step_id": "a", "status": "in_progress"}]), false),
            )
            .push_err(
                "plan_activity",
                ApiError::transport("GET", "https://ece/plan", "timeout"),
            )
            .push_ok(
                "plan_activity",
                attempt(json!([{"step_id": "a", "status": "success"}]), true),
            );
        let report = track(
            &api,
            ResourceRef::elasticsearch(ID),
            &mut params(&SharedBuf::default(), 1),
            true,
        )
        .await
        .unwrap();
        assert_eq!(report.steps_written, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_remote_errors_are_fatal() {
        let api = ScriptedApi::new();
        api.push_status("plan_activity", 500, "boom");
        let err = track(
            &api,
            ResourceRef::elasticsearch(ID),
            &mut params(&SharedBuf::default(), 5),
            true,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(api.call_count("plan_activity"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_between_polls() {
        let api = ScriptedApi::new();
        api.push_not_found("plan_activity");
        let token = CancellationToken::new();
        token.cancel();
        let mut params = params(&SharedBuf::default(), 5).with_cancellation(token);

        let err = track(&api, ResourceRef::elasticsearch(ID), &mut params, true)
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::TrackingCancelled { .. }));
        assert_eq!(api.call_count("plan_activity"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_attempt_restarts_cursor() {
        let api = ScriptedApi::new();
        api.push_ok(
            "plan_activity",
            attempt(json!([{"step_id": "a", "status": "success"}, {"step_id": "b", "status": "pending"}]), false),
        )
        .push_ok(
            "plan_activity",
            json!({"current": {
                "plan_attempt_id": "attempt-2",
                "plan_attempt_log": [{"step_id": "a", "status": "success"}],
                "attempt_end_time": "2024-05-01T10:00:00Z"
            }}),
        );
        let buf = SharedBuf::default();
        let report = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 1), true)
            .await
            .unwrap();
        assert_eq!(report.steps_written, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_downstream_clusters_are_tracked() {
        let api = ScriptedApi::new();
        api.push_ok("plan_activity", attempt(json!([{"step_id": "es", "status": "success"}]), true))
            .push_ok(
                "get_cluster",
                json!({"cluster_id": ID, "associated_kibana_clusters": [{"enabled": true, "kibana_id": "kb1"}]}),
            )
            .push_ok("plan_activity", attempt(json!([{"step_id": "kb", "status": "success"}]), true));
        let buf = SharedBuf::default();

        let report = track(&api, ResourceRef::elasticsearch(ID), &mut params(&buf, 1), false)
            .await
            .unwrap();
        assert_eq!(
            report.resources,
            vec![
                ResourceRef::elasticsearch(ID),
                ResourceRef::new(ClusterKind::Kibana, "kb1")
            ]
        );
        assert_eq!(
            buf.lines()[1],
            "Cluster [kb1][Kibana]: step \"kb\" finished with status success"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_override_ignores_downstream() {
        let api = ScriptedApi::new();
        api.push_ok("plan_activity", attempt(json!([]), true));
        let mut params = params(&SharedBuf::default(), 1).with_ignore_downstream(true);
        track(&api, ResourceRef::elasticsearch(ID), &mut params, false)
            .await
            .unwrap();
        assert_eq!(api.call_count("get_cluster"), 0);
    }

    #[test]
    fn test_validate_params() {
        let params = TrackParams {
            frequency: TrackFrequency {
                poll_interval: Duration::ZERO,
                max_retries: 1,
            },
            ..TrackParams::default()
        };
        let merr = params.validate().unwrap_err();
        assert_eq!(
            merr.errors(),
            &[
                "output device cannot be empty".to_string(),
                "poll frequency must be greater than zero".to_string(),
            ]
        );
        assert!(TrackParams::new(SharedBuf::default()).validate().is_ok());
    }
}
