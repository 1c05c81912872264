//! Owned session state: lifecycle phase, monotonic displayed progress, the
//! client-side job record, and the generation counter that fences off stale
//! asynchronous updates after a reset.

use chrono::{DateTime, Utc};

use riskscan_client_core::analysis::{AnalysisResult, RemoteStatus};

use crate::api::{SessionError, SessionPhase, SessionSnapshot};
use crate::progress::{self, ProgressSignal, UPLOAD_FLOOR, UPLOAD_START};

/// Client-side record of the job in flight.
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub(crate) handle: String,
    pub(crate) remote_status: RemoteStatus,
    pub(crate) raw_progress: Option<f64>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

pub(crate) struct SessionState {
    phase: SessionPhase,
    progress: f64,
    error: Option<SessionError>,
    result: Option<AnalysisResult>,
    job: Option<JobRecord>,
    generation: u64,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            progress: 0.0,
            error: None,
            result: None,
            job: None,
            generation: 0,
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn progress(&self) -> f64 {
        self.progress
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn job(&self) -> Option<&JobRecord> {
        self.job.as_ref()
    }

    /// Whether an update tagged with `generation` may still mutate state.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Enter `Submitting`. The driving frontend must gate submission so this
    /// can only happen from idle; anything else is a bug, not an input.
    pub(crate) fn begin_submit(&mut self) {
        assert!(
            self.phase == SessionPhase::Idle,
            "submit while session is {:?}",
            self.phase
        );
        self.phase = SessionPhase::Submitting;
        self.progress = UPLOAD_START;
        self.error = None;
        self.result = None;
    }

    /// The gateway accepted the upload: start polling under `handle`.
    pub(crate) fn submission_accepted(&mut self, handle: String) {
        self.phase = SessionPhase::Polling;
        self.job = Some(JobRecord {
            handle,
            remote_status: RemoteStatus::Pending,
            raw_progress: None,
            created_at: Utc::now(),
            completed_at: None,
        });
        self.raise_progress(UPLOAD_FLOOR);
    }

    /// Apply one still-processing poll tick; returns the displayed progress.
    pub(crate) fn poll_tick(&mut self, signal: ProgressSignal, remote_status: RemoteStatus) -> f64 {
        if let Some(job) = &mut self.job {
            job.remote_status = remote_status;
            if let ProgressSignal::Reported(raw) = signal {
                job.raw_progress = Some(raw);
            }
        }
        let mapped = progress::poll_progress(signal, self.progress);
        self.raise_progress(mapped);
        self.progress
    }

    /// Terminal success: attach the result and snap progress to 100.
    pub(crate) fn complete(&mut self, result: AnalysisResult) {
        self.phase = SessionPhase::Completed;
        self.progress = 100.0;
        if let Some(job) = &mut self.job {
            job.remote_status = RemoteStatus::Completed;
            job.completed_at = Some(Utc::now());
        }
        self.result = Some(result);
    }

    /// Terminal failure of any kind.
    pub(crate) fn fail(&mut self, error: SessionError) {
        self.phase = SessionPhase::Failed;
        if let (Some(job), SessionError::Gateway(_)) = (&mut self.job, &error) {
            job.remote_status = RemoteStatus::Failed;
        }
        self.error = Some(error);
    }

    /// Return to idle, discarding the job, and bump the generation so any
    /// in-flight update from the abandoned job is fenced off.
    pub(crate) fn reset(&mut self) {
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        self.progress = 0.0;
        self.error = None;
        self.result = None;
        self.job = None;
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            progress: self.progress,
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }

    fn raise_progress(&mut self, candidate: f64) {
        let clamped = candidate.clamp(0.0, 100.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
    }
}
