//! Analysis orchestration
//!
//! One submission walks the stages
//! `VALIDATING -> DETECTING_BUILTUP -> DETECTING_ENCROACHMENT -> SCORING -> COMPLETE`,
//! stopping at `FAILED` on the first error. Remote calls run strictly one
//! after another: scoring consumes the output of both detectors.
//!
//! Every submission takes a new generation. State writes only land while the
//! writer's generation is still the current one, so a superseded analysis can
//! finish or fail late without touching what presenters see.

mod state;

pub use state::{AnalysisOutcome, AnalysisState, Stage, Submission};

use crate::backend::{AnalysisBackend, ServiceResult};
use crate::boundary;
use crate::config::ServiceConfig;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, ComplianceRequest};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for each remote call
    pub call_timeout: Duration,
    /// Transitions buffered per event subscriber before it starts lagging
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            event_capacity: 64,
        }
    }
}

impl From<&ServiceConfig> for OrchestratorConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            call_timeout: config.timeout(),
            ..Default::default()
        }
    }
}

struct Inner {
    backend: Arc<dyn AnalysisBackend>,
    config: OrchestratorConfig,
    next_generation: AtomicU64,
    state: watch::Sender<AnalysisState>,
    events: broadcast::Sender<AnalysisState>,
}

/// Drives boundary analyses and publishes their state.
///
/// Cheap to clone; clones share the same current analysis.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: OrchestratorConfig) -> Self {
        let (state, _) = watch::channel(AnalysisState::Idle);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                next_generation: AtomicU64::new(0),
                state,
                events,
            }),
        }
    }

    /// Snapshot of the published state
    pub fn state(&self) -> AnalysisState {
        self.inner.state.borrow().clone()
    }

    /// Latest-value subscription to the published state
    pub fn watch(&self) -> watch::Receiver<AnalysisState> {
        self.inner.state.subscribe()
    }

    /// Every applied transition, in order
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisState> {
        self.inner.events.subscribe()
    }

    /// Start an analysis in the background, superseding any analysis in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, raw: Value) -> Submission {
        let generation = self.begin();
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.drive(generation, &raw).await });

        Submission { generation, handle }
    }

    /// Run an analysis to its end in the calling task.
    pub async fn analyze(&self, raw: &Value) -> AnalysisOutcome {
        let generation = self.begin();
        self.drive(generation, raw).await
    }

    fn begin(&self) -> u64 {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let events = &self.inner.events;

        self.inner.state.send_if_modified(|current| {
            if current.generation() >= generation {
                return false;
            }
            if current.is_in_flight() {
                info!(
                    superseded = current.generation(),
                    generation, "superseding analysis in flight"
                );
            }
            let started = AnalysisState::Validating { generation };
            let _ = events.send(started.clone());
            *current = started;
            true
        });

        generation
    }

    /// Publish `next` if `generation` is still current. Returns whether it landed.
    fn apply(&self, generation: u64, next: AnalysisState) -> bool {
        let events = &self.inner.events;

        self.inner.state.send_if_modified(|current| {
            if current.generation() != generation {
                return false;
            }
            debug!(generation, state = next.label(), "state transition");
            let _ = events.send(next.clone());
            *current = next;
            true
        })
    }

    async fn drive(&self, generation: u64, raw: &Value) -> AnalysisOutcome {
        let boundary = match boundary::validate(raw) {
            Ok(boundary) => boundary,
            Err(reason) => {
                warn!(generation, %reason, "boundary rejected");
                return self.fail(generation, Stage::Validating, reason.into());
            }
        };

        let next = AnalysisState::DetectingBuiltUp {
            generation,
            boundary: boundary.clone(),
        };
        if !self.apply(generation, next) {
            return self.superseded(generation);
        }

        let backend = &self.inner.backend;

        let built_up = match self
            .call(Stage::DetectingBuiltUp, backend.detect_built_up(&boundary))
            .await
        {
            Ok(built_up) => built_up,
            Err(error) => return self.fail(generation, Stage::DetectingBuiltUp, error),
        };

        let next = AnalysisState::DetectingEncroachment {
            generation,
            boundary: boundary.clone(),
            built_up: built_up.clone(),
        };
        if !self.apply(generation, next) {
            return self.superseded(generation);
        }

        let encroachment = match self
            .call(Stage::DetectingEncroachment, backend.detect_encroachment(&boundary))
            .await
        {
            Ok(encroachment) => encroachment,
            Err(error) => return self.fail(generation, Stage::DetectingEncroachment, error),
        };

        let next = AnalysisState::Scoring {
            generation,
            boundary: boundary.clone(),
            built_up: built_up.clone(),
            encroachment: encroachment.clone(),
        };
        if !self.apply(generation, next) {
            return self.superseded(generation);
        }

        let request = ComplianceRequest::from_stages(&built_up, &encroachment);
        let compliance = match self
            .call(Stage::Scoring, backend.compute_compliance_score(&request))
            .await
        {
            Ok(compliance) => compliance,
            Err(error) => return self.fail(generation, Stage::Scoring, error),
        };

        let result = AnalysisResult::new(boundary, built_up, encroachment, compliance);
        let next = AnalysisState::Complete {
            generation,
            result: result.clone(),
        };
        if !self.apply(generation, next) {
            return self.superseded(generation);
        }

        info!(
            generation,
            score = result.compliance.compliance_score,
            severity = %result.compliance.severity,
            encroachment = result.encroachment.encroachment_detected,
            "analysis complete"
        );

        AnalysisOutcome::Complete(result)
    }

    async fn call<T>(
        &self,
        stage: Stage,
        request: impl Future<Output = ServiceResult<T>>,
    ) -> ServiceResult<T> {
        debug!(%stage, "calling analysis service");

        match tokio::time::timeout(self.inner.config.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%stage, timeout = ?self.inner.config.call_timeout, "analysis service timed out");
                Err(AnalysisError::timeout())
            }
        }
    }

    fn fail(&self, generation: u64, stage: Stage, error: AnalysisError) -> AnalysisOutcome {
        let next = AnalysisState::Failed {
            generation,
            stage,
            error: error.clone(),
        };
        if !self.apply(generation, next) {
            return self.superseded(generation);
        }

        warn!(generation, %stage, %error, "analysis failed");
        AnalysisOutcome::Failed { stage, error }
    }

    fn superseded(&self, generation: u64) -> AnalysisOutcome {
        debug!(generation, "discarding outcome of superseded analysis");
        AnalysisOutcome::Superseded { generation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportCause;
    use crate::models::{BuiltUpResult, ComplianceResult, EncroachmentResult};
    use crate::Boundary;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// In-memory backend answering from queued responses, defaulting to a
    /// clean 1000 m² plot that is 90% built.
    #[derive(Default)]
    struct ScriptedBackend {
        built_up: Mutex<VecDeque<ServiceResult<BuiltUpResult>>>,
        encroachment: Mutex<VecDeque<ServiceResult<EncroachmentResult>>>,
        compliance: Mutex<VecDeque<ServiceResult<ComplianceResult>>>,
        gated: Mutex<VecDeque<(Arc<Notify>, Option<ServiceResult<BuiltUpResult>>)>>,
        encroachment_delay: Option<Duration>,
        calls: Mutex<Vec<&'static str>>,
        requests: Mutex<Vec<ComplianceRequest>>,
    }

    impl ScriptedBackend {
        fn with_built_up(self, result: ServiceResult<BuiltUpResult>) -> Self {
            self.built_up.lock().unwrap().push_back(result);
            self
        }

        fn with_encroachment(self, result: ServiceResult<EncroachmentResult>) -> Self {
            self.encroachment.lock().unwrap().push_back(result);
            self
        }

        fn with_compliance(self, result: ServiceResult<ComplianceResult>) -> Self {
            self.compliance.lock().unwrap().push_back(result);
            self
        }

        /// Hold the next built-up call until the gate is notified
        fn with_gate(self, gate: Arc<Notify>) -> Self {
            self.gated.lock().unwrap().push_back((gate, None));
            self
        }

        /// Like `with_gate`, answering with `result` once released
        fn with_gated_built_up(self, gate: Arc<Notify>, result: ServiceResult<BuiltUpResult>) -> Self {
            self.gated.lock().unwrap().push_back((gate, Some(result)));
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn built_up_1000() -> BuiltUpResult {
        BuiltUpResult {
            total_area_m2: 1000.0,
            built_up_area_m2: 900.0,
        }
    }

    fn low_risk() -> ComplianceResult {
        ComplianceResult {
            compliance_score: 85.0,
            severity: "LOW".to_string(),
            risk_score: 0.0,
            recommended_action: "None".to_string(),
            urgency: "None".to_string(),
            built_percentage: 90.0,
            unused_percentage: None,
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn detect_built_up(&self, _boundary: &Boundary) -> ServiceResult<BuiltUpResult> {
            self.calls.lock().unwrap().push("built_up");
            let gated = self.gated.lock().unwrap().pop_front();
            if let Some((gate, result)) = gated {
                gate.notified().await;
                if let Some(result) = result {
                    return result;
                }
            }
            let scripted = self.built_up.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(built_up_1000()))
        }

        async fn detect_encroachment(&self, _boundary: &Boundary) -> ServiceResult<EncroachmentResult> {
            self.calls.lock().unwrap().push("encroachment");
            if let Some(delay) = self.encroachment_delay {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.encroachment.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(EncroachmentResult::none()))
        }

        async fn compute_compliance_score(
            &self,
            request: &ComplianceRequest,
        ) -> ServiceResult<ComplianceResult> {
            self.calls.lock().unwrap().push("scoring");
            self.requests.lock().unwrap().push(request.clone());
            let scripted = self.compliance.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(low_risk()))
        }
    }

    fn square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [81.62, 21.25], [81.63, 21.25], [81.63, 21.26], [81.62, 21.26], [81.62, 21.25]
            ]]
        })
    }

    fn orchestrator(backend: &Arc<ScriptedBackend>) -> Orchestrator {
        let backend: Arc<dyn AnalysisBackend> = backend.clone();
        Orchestrator::new(backend, OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_successful_analysis_merges_responses_verbatim() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(&backend);

        let outcome = orchestrator.analyze(&square()).await;

        let AnalysisOutcome::Complete(result) = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        assert_eq!(result.built_up, built_up_1000());
        assert_eq!(result.encroachment, EncroachmentResult::none());
        assert!(!result.encroachment.has_overlay());
        assert_eq!(result.compliance, low_risk());
        assert_eq!(backend.calls(), vec!["built_up", "encroachment", "scoring"]);

        let requests = backend.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![ComplianceRequest {
                total_area_m2: 1000.0,
                built_up_area_m2: 900.0,
                encroachment: false,
            }]
        );

        match orchestrator.state() {
            AnalysisState::Complete { generation, result: published } => {
                assert_eq!(generation, 1);
                assert_eq!(published, result);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transitions_are_published_in_order() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(&backend);
        let mut events = orchestrator.subscribe();

        orchestrator.analyze(&square()).await;

        let mut labels = Vec::new();
        while let Ok(state) = events.try_recv() {
            labels.push(state.label());
        }
        assert_eq!(
            labels,
            vec![
                "VALIDATING",
                "DETECTING_BUILTUP",
                "DETECTING_ENCROACHMENT",
                "SCORING",
                "COMPLETE"
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_boundary_issues_no_calls() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(&backend);
        let open_ring = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]
        });

        let outcome = orchestrator.analyze(&open_ring).await;

        assert!(matches!(
            outcome,
            AnalysisOutcome::Failed {
                stage: Stage::Validating,
                error: AnalysisError::Validation { .. }
            }
        ));
        assert!(backend.calls().is_empty());
        assert_eq!(orchestrator.state().stage(), Some(Stage::Validating));
    }

    #[tokio::test]
    async fn test_built_up_failure_stops_pipeline() {
        let backend = Arc::new(ScriptedBackend::default().with_built_up(Err(
            AnalysisError::Protocol {
                status: 500,
                body: "internal error".to_string(),
            },
        )));
        let orchestrator = orchestrator(&backend);

        let outcome = orchestrator.analyze(&square()).await;

        match outcome {
            AnalysisOutcome::Failed { stage, error } => {
                assert_eq!(stage, Stage::DetectingBuiltUp);
                assert!(matches!(error, AnalysisError::Protocol { status: 500, .. }));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(backend.calls(), vec!["built_up"]);
        assert!(matches!(
            orchestrator.state(),
            AnalysisState::Failed {
                stage: Stage::DetectingBuiltUp,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_encroachment_failure_skips_scoring() {
        let backend = Arc::new(ScriptedBackend::default().with_encroachment(Err(
            AnalysisError::schema("encroachment_detected"),
        )));
        let orchestrator = orchestrator(&backend);

        let outcome = orchestrator.analyze(&square()).await;

        assert_eq!(
            outcome,
            AnalysisOutcome::Failed {
                stage: Stage::DetectingEncroachment,
                error: AnalysisError::schema("encroachment_detected"),
            }
        );
        assert_eq!(backend.calls(), vec!["built_up", "encroachment"]);
    }

    #[tokio::test]
    async fn test_scoring_failure_discards_earlier_stages() {
        let backend = Arc::new(ScriptedBackend::default().with_compliance(Err(
            AnalysisError::Transport {
                cause: TransportCause::Connect("refused".to_string()),
            },
        )));
        let orchestrator = orchestrator(&backend);

        orchestrator.analyze(&square()).await;

        let state = orchestrator.state();
        assert_eq!(state.stage(), Some(Stage::Scoring));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("built_up").is_none());
        assert!(json.get("result").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_encroachment_timeout() {
        let backend = Arc::new(ScriptedBackend {
            encroachment_delay: Some(Duration::from_secs(120)),
            ..Default::default()
        });
        let backend_dyn: Arc<dyn AnalysisBackend> = backend.clone();
        let orchestrator = Orchestrator::new(
            backend_dyn,
            OrchestratorConfig {
                call_timeout: Duration::from_secs(5),
                ..Default::default()
            },
        );

        let outcome = orchestrator.analyze(&square()).await;

        match outcome {
            AnalysisOutcome::Failed { stage, error } => {
                assert_eq!(stage, Stage::DetectingEncroachment);
                assert!(error.is_timeout());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(backend.calls(), vec!["built_up", "encroachment"]);
    }

    #[tokio::test]
    async fn test_newer_submission_supersedes_in_flight_analysis() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::default().with_gate(gate.clone()));
        let orchestrator = orchestrator(&backend);
        let mut watch = orchestrator.watch();

        let first = orchestrator.submit(square());
        watch
            .wait_for(|state| {
                matches!(state, AnalysisState::DetectingBuiltUp { generation: 1, .. })
            })
            .await
            .unwrap();

        let second = orchestrator.submit(square());
        assert_eq!(second.generation, 2);
        let second_outcome = second.handle.await.unwrap();
        assert!(second_outcome.is_complete());

        gate.notify_one();
        let first_outcome = first.handle.await.unwrap();
        assert_eq!(first_outcome, AnalysisOutcome::Superseded { generation: 1 });

        assert!(matches!(
            orchestrator.state(),
            AnalysisState::Complete { generation: 2, .. }
        ));
        // The stale analysis never went past its first call.
        assert_eq!(
            backend.calls(),
            vec!["built_up", "built_up", "encroachment", "scoring"]
        );
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_overwrite_newer_result() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend::default().with_gated_built_up(
            gate.clone(),
            Err(AnalysisError::Protocol {
                status: 503,
                body: String::new(),
            }),
        ));
        let orchestrator = orchestrator(&backend);
        let mut watch = orchestrator.watch();

        let first = orchestrator.submit(square());
        watch
            .wait_for(|state| state.generation() == 1 && state.is_in_flight() && state.stage() == Some(Stage::DetectingBuiltUp))
            .await
            .unwrap();

        let second = orchestrator.submit(square());
        let second_outcome = second.handle.await.unwrap();
        assert!(second_outcome.is_complete());

        gate.notify_one();
        let first_outcome = first.handle.await.unwrap();

        assert_eq!(first_outcome, AnalysisOutcome::Superseded { generation: 1 });
        assert!(matches!(
            orchestrator.state(),
            AnalysisState::Complete { generation: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_submission_after_completion_starts_fresh() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(&backend);

        assert!(orchestrator.analyze(&square()).await.is_complete());
        assert!(orchestrator.analyze(&square()).await.is_complete());

        assert_eq!(orchestrator.state().generation(), 2);
        assert_eq!(backend.calls().len(), 6);
    }
}
