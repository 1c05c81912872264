//! Full-session behaviour against a scripted in-process gateway: submission,
//! poll classification, progress monotonicity, timeout, and reset isolation.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use riskscan_client_core::analysis::{AnalysisResult, ContractMetadata, RemoteStatus};
use riskscan_client_core::document::{DocumentFile, DocumentKind};
use riskscan_client_engine::gateway::{
    AnalysisGateway, AnalysisStatus, GatewayError, StatusProbe, UploadAccepted,
};
use riskscan_client_engine::{
    SessionConfig, SessionError, SessionEvent, SessionPhase, SessionSnapshot, start_session,
};

#[derive(Default)]
struct QueryGate {
    started: Notify,
    release: Notify,
}

/// Gateway whose responses are scripted up front.
struct ScriptedGateway {
    submit: Mutex<Option<Result<UploadAccepted, GatewayError>>>,
    probes: Mutex<VecDeque<Result<StatusProbe, GatewayError>>>,
    /// Served once `probes` runs dry.
    repeat_probe: Option<StatusProbe>,
    result: Mutex<Option<Result<AnalysisResult, GatewayError>>>,
    queries_issued: AtomicU32,
    gate: Option<QueryGate>,
}

impl ScriptedGateway {
    fn new(probes: Vec<Result<StatusProbe, GatewayError>>) -> Self {
        Self {
            submit: Mutex::new(Some(Ok(accepted("abc")))),
            probes: Mutex::new(probes.into()),
            repeat_probe: None,
            result: Mutex::new(Some(Ok(sample_result(62)))),
            queries_issued: AtomicU32::new(0),
            gate: None,
        }
    }

    fn queries_issued(&self) -> u32 {
        self.queries_issued.load(Ordering::SeqCst)
    }
}

impl AnalysisGateway for ScriptedGateway {
    async fn submit(&self, _document: &DocumentFile) -> Result<UploadAccepted, GatewayError> {
        self.submit
            .lock()
            .unwrap()
            .take()
            .expect("submit scripted exactly once")
    }

    async fn query_status(&self, _analysis_id: &str) -> Result<StatusProbe, GatewayError> {
        self.queries_issued.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if let Some(probe) = self.probes.lock().unwrap().pop_front() {
            return probe;
        }
        Ok(self
            .repeat_probe
            .clone()
            .expect("status query past the end of the script"))
    }

    async fn fetch_result(&self, _analysis_id: &str) -> Result<AnalysisResult, GatewayError> {
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("result fetched at most once")
    }

    async fn health_check(&self) -> Result<serde_json::Value, GatewayError> {
        Ok(serde_json::json!({"status": "healthy"}))
    }
}

fn accepted(handle: &str) -> UploadAccepted {
    UploadAccepted {
        analysis_id: handle.to_string(),
        status: RemoteStatus::Pending,
        created_at: None,
        message: None,
    }
}

fn processing(progress: Option<f64>) -> StatusProbe {
    StatusProbe::Status(AnalysisStatus {
        analysis_id: "abc".to_string(),
        status: RemoteStatus::Processing,
        progress_percentage: progress,
        created_at: None,
        completed_at: None,
        error_message: None,
    })
}

fn completed_status() -> StatusProbe {
    StatusProbe::Status(AnalysisStatus {
        analysis_id: "abc".to_string(),
        status: RemoteStatus::Completed,
        progress_percentage: Some(100.0),
        created_at: None,
        completed_at: Some("2026-08-24T10:00:02".to_string()),
        error_message: None,
    })
}

fn failed_status(message: &str) -> StatusProbe {
    StatusProbe::Status(AnalysisStatus {
        analysis_id: "abc".to_string(),
        status: RemoteStatus::Failed,
        progress_percentage: None,
        created_at: None,
        completed_at: None,
        error_message: Some(message.to_string()),
    })
}

fn sample_result(score: u8) -> AnalysisResult {
    AnalysisResult {
        analysis_id: "abc".to_string(),
        status: "completed".to_string(),
        contract_metadata: ContractMetadata {
            filename: "contract.pdf".to_string(),
            file_type: "pdf".to_string(),
            page_count: 3,
            word_count: 1200,
        },
        risks: Vec::new(),
        overall_risk_score: score,
        summary: "No material risks.".to_string(),
        analyzed_at: "2026-08-24T10:00:02".to_string(),
    }
}

fn sample_document() -> DocumentFile {
    DocumentFile {
        filename: "contract.pdf".to_string(),
        kind: DocumentKind::Pdf,
        bytes: b"%PDF-1.4 fake".to_vec(),
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::from_millis(1),
        max_attempts: SessionConfig::DEFAULT_MAX_ATTEMPTS,
    }
}

async fn wait_for_terminal(
    watch: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snap = watch.borrow().clone();
                if snap.phase.is_terminal() {
                    return snap;
                }
            }
            watch
                .changed()
                .await
                .expect("engine dropped the snapshot channel");
        }
    })
    .await
    .expect("session never reached a terminal phase")
}

fn drain_progress(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<f64> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Progress { percent } = event {
            out.push(percent);
        }
    }
    out
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test]
async fn completes_with_monotone_progress_and_attached_result() {
    let gateway = ScriptedGateway::new(vec![
        Ok(processing(Some(0.0))),
        Ok(processing(Some(40.0))),
        Ok(processing(Some(80.0))),
        Ok(completed_status()),
    ]);
    let handle = start_session(gateway, fast_config());
    let mut events = handle.subscribe();
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Completed);
    assert_close(snap.progress, 100.0);
    assert_eq!(snap.result.unwrap().overall_risk_score, 62);
    assert!(snap.error.is_none());

    let percents = drain_progress(&mut events);
    assert!(!percents.is_empty());
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0], "progress decreased: {percents:?}");
    }
    assert!(percents.iter().any(|p| (p - 46.0).abs() < 1e-9));
    assert!(percents.iter().any(|p| (p - 82.0).abs() < 1e-9));
    assert_close(*percents.last().unwrap(), 100.0);
}

#[tokio::test]
async fn not_ready_indicator_still_advances_progress() {
    let gateway = ScriptedGateway::new(vec![
        Ok(StatusProbe::NotReady),
        Ok(StatusProbe::NotReady),
        Ok(completed_status()),
    ]);
    let handle = start_session(gateway, fast_config());
    let mut events = handle.subscribe();
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;
    assert_eq!(snap.phase, SessionPhase::Completed);

    // Two not-ready ticks above the 10% upload floor: +2 each.
    let percents = drain_progress(&mut events);
    assert!(percents.iter().any(|p| (p - 12.0).abs() < 1e-9));
    assert!(percents.iter().any(|p| (p - 14.0).abs() < 1e-9));
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0], "progress decreased: {percents:?}");
    }
}

#[tokio::test]
async fn gateway_failure_passes_the_message_through_and_stops_polling() {
    let gateway = ScriptedGateway::new(vec![Ok(failed_status("Unsupported language"))]);
    let handle = start_session(gateway, fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Failed);
    assert_eq!(
        snap.error,
        Some(SessionError::Gateway("Unsupported language".to_string()))
    );
    assert!(snap.result.is_none());
}

#[tokio::test]
async fn missing_failure_message_falls_back_to_a_generic_one() {
    let mut probe = failed_status("");
    if let StatusProbe::Status(status) = &mut probe {
        status.error_message = None;
    }
    let gateway = ScriptedGateway::new(vec![Ok(probe)]);
    let handle = start_session(gateway, fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;
    assert_eq!(
        snap.error,
        Some(SessionError::Gateway("Analysis failed".to_string()))
    );
}

#[tokio::test]
async fn times_out_after_exactly_the_attempt_ceiling() {
    let mut gateway = ScriptedGateway::new(Vec::new());
    gateway.repeat_probe = Some(processing(None));
    let handle = start_session(
        gateway,
        SessionConfig {
            poll_interval: Duration::ZERO,
            max_attempts: 120,
        },
    );
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Failed);
    assert_eq!(snap.error, Some(SessionError::Timeout));
    assert_eq!(
        snap.error.unwrap().to_string(),
        "Analysis timeout - please try again"
    );
}

#[tokio::test]
async fn the_timeout_never_issues_an_extra_query() {
    let gateway = std::sync::Arc::new({
        let mut g = ScriptedGateway::new(Vec::new());
        g.repeat_probe = Some(processing(None));
        g
    });
    let handle = start_session(
        gateway.clone(),
        SessionConfig {
            poll_interval: Duration::ZERO,
            max_attempts: 120,
        },
    );
    let mut watch = handle.watch();

    handle.submit(sample_document());
    wait_for_terminal(&mut watch).await;

    assert_eq!(gateway.queries_issued(), 120);
}

#[tokio::test]
async fn result_fetch_failure_after_completion_is_terminal_not_retried() {
    let gateway = std::sync::Arc::new({
        let g = ScriptedGateway::new(vec![Ok(completed_status())]);
        *g.result.lock().unwrap() = Some(Err(GatewayError::Transport {
            message: "connection reset".to_string(),
        }));
        g
    });
    let handle = start_session(gateway.clone(), fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Failed);
    assert_eq!(
        snap.error,
        Some(SessionError::Transport(
            "Failed to get analysis results".to_string()
        ))
    );
    // The completed job was not polled again after the failed fetch.
    assert_eq!(gateway.queries_issued(), 1);
}

#[tokio::test]
async fn transport_error_while_polling_is_terminal() {
    let gateway = std::sync::Arc::new(ScriptedGateway::new(vec![
        Ok(processing(Some(20.0))),
        Err(GatewayError::Transport {
            message: "connection refused".to_string(),
        }),
    ]));
    let handle = start_session(gateway.clone(), fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Failed);
    assert!(matches!(snap.error, Some(SessionError::Transport(_))));
    // The hard error was not treated as still-processing.
    assert_eq!(gateway.queries_issued(), 2);
}

#[tokio::test]
async fn submission_rejection_fails_without_any_polling() {
    let gateway = std::sync::Arc::new({
        let g = ScriptedGateway::new(Vec::new());
        *g.submit.lock().unwrap() = Some(Err(GatewayError::Rejected {
            message: "Invalid file type. Allowed types: pdf, txt".to_string(),
        }));
        g
    });
    let handle = start_session(gateway.clone(), fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    let snap = wait_for_terminal(&mut watch).await;

    assert_eq!(snap.phase, SessionPhase::Failed);
    assert_eq!(
        snap.error,
        Some(SessionError::Submission(
            "Invalid file type. Allowed types: pdf, txt".to_string()
        ))
    );
    assert_eq!(gateway.queries_issued(), 0);
}

#[tokio::test]
async fn reset_during_an_inflight_query_leaves_the_new_session_untouched() {
    let gateway = std::sync::Arc::new({
        let mut g = ScriptedGateway::new(vec![Ok(completed_status())]);
        g.gate = Some(QueryGate::default());
        g
    });
    let handle = start_session(gateway.clone(), fast_config());
    let mut events = handle.subscribe();
    let mut watch = handle.watch();

    handle.submit(sample_document());

    // Wait until the status query is actually in flight, then abandon.
    let gate = gateway.gate.as_ref().unwrap();
    tokio::time::timeout(Duration::from_secs(5), gate.started.notified())
        .await
        .expect("status query never started");
    handle.reset();

    // Let the abandoned query resolve (if its task is still alive at all).
    gate.release.notify_one();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let snap = watch.borrow_and_update().clone();
    assert_eq!(snap.phase, SessionPhase::Idle);
    assert_close(snap.progress, 0.0);
    assert!(snap.result.is_none());
    assert!(snap.error.is_none());

    let mut saw_reset = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::WasReset => saw_reset = true,
            SessionEvent::Completed { .. } => {
                panic!("stale completion leaked into the new session")
            }
            _ => {}
        }
    }
    assert!(saw_reset);

    // The handle stays usable for a fresh submission.
    assert_eq!(gateway.queries_issued(), 1);
}

#[tokio::test]
async fn reset_from_a_terminal_state_returns_to_idle() {
    let gateway = ScriptedGateway::new(vec![Ok(failed_status("Unsupported language"))]);
    let handle = start_session(gateway, fast_config());
    let mut watch = handle.watch();

    handle.submit(sample_document());
    wait_for_terminal(&mut watch).await;

    handle.reset();
    let snap = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snap = watch.borrow().clone();
                if snap.phase == SessionPhase::Idle {
                    return snap;
                }
            }
            watch.changed().await.unwrap();
        }
    })
    .await
    .expect("reset never returned to idle");

    assert!(snap.error.is_none());
    assert_close(snap.progress, 0.0);
}
