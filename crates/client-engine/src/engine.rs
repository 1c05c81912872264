use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use riskscan_client_core::analysis::{AnalysisResult, RemoteStatus};
use riskscan_client_core::document::DocumentFile;

use crate::api::{SessionConfig, SessionError, SessionEvent, SessionHandle, SessionPhase};
use crate::gateway::{AnalysisGateway, GatewayError, StatusProbe};
use crate::progress::ProgressSignal;
use crate::session::SessionState;

const SUBMIT_FALLBACK: &str = "Failed to upload contract";
const RESULTS_FALLBACK: &str = "Failed to get analysis results";
const GATEWAY_FALLBACK: &str = "Analysis failed";

pub(crate) enum Command {
    Submit(Box<DocumentFile>),
    Reset,
    Shutdown,
}

/// Update from the job driver, tagged with the generation it was spawned
/// under. The engine drops updates whose generation is no longer current.
struct JobMsg {
    generation: u64,
    update: JobUpdate,
}

enum JobUpdate {
    Accepted { handle: String },
    Tick {
        signal: ProgressSignal,
        remote_status: RemoteStatus,
    },
    Finished(JobOutcome),
}

enum JobOutcome {
    Completed(Box<AnalysisResult>),
    Failed(SessionError),
}

struct SessionRuntime<G> {
    gateway: Arc<G>,
    cfg: SessionConfig,
    state: SessionState,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    job_tx: mpsc::UnboundedSender<JobMsg>,
    job_rx: mpsc::UnboundedReceiver<JobMsg>,
    job_task: Option<tokio::task::JoinHandle<()>>,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<crate::api::SessionSnapshot>,
}

pub(crate) fn start_session<G>(gateway: G, mut cfg: SessionConfig) -> SessionHandle
where
    G: AnalysisGateway + Send + Sync + 'static,
{
    if cfg.max_attempts == 0 {
        cfg.max_attempts = SessionConfig::DEFAULT_MAX_ATTEMPTS;
    }

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (event_tx, _) = broadcast::channel::<SessionEvent>(256);
    let (job_tx, job_rx) = mpsc::unbounded_channel::<JobMsg>();

    let state = SessionState::new();
    let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());

    let runtime = SessionRuntime {
        gateway: Arc::new(gateway),
        cfg,
        state,
        cmd_rx,
        job_tx,
        job_rx,
        job_task: None,
        event_tx: event_tx.clone(),
        snapshot_tx,
    };
    let join = tokio::spawn(runtime.run());

    SessionHandle {
        cmd_tx,
        event_tx,
        snapshot_rx,
        join,
    }
}

impl<G> SessionRuntime<G>
where
    G: AnalysisGateway + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Shutdown) => break,
                    Some(Command::Submit(document)) => self.handle_submit(*document),
                    Some(Command::Reset) => self.handle_reset(),
                },
                Some(msg) = self.job_rx.recv() => self.handle_job_msg(msg),
            }
        }
        self.abort_job();
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn push_snapshot(&self) {
        let _ = self.snapshot_tx.send(self.state.snapshot());
    }

    fn abort_job(&mut self) {
        if let Some(task) = self.job_task.take() {
            task.abort();
        }
    }

    fn handle_submit(&mut self, document: DocumentFile) {
        self.state.begin_submit();
        info!(filename = %document.filename, "submitting document");
        self.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Submitting,
        });
        self.emit(SessionEvent::Progress {
            percent: self.state.progress(),
        });
        self.push_snapshot();

        let generation = self.state.generation();
        self.job_task = Some(tokio::spawn(drive_job(
            self.gateway.clone(),
            self.cfg.clone(),
            generation,
            document,
            self.job_tx.clone(),
        )));
    }

    fn handle_reset(&mut self) {
        self.abort_job();
        let prior = self.state.phase();
        self.state.reset();
        debug!(?prior, generation = self.state.generation(), "session reset");
        self.emit(SessionEvent::WasReset);
        self.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Idle,
        });
        self.push_snapshot();
    }

    fn handle_job_msg(&mut self, msg: JobMsg) {
        if !self.state.is_current(msg.generation) {
            debug!(
                stale = msg.generation,
                current = self.state.generation(),
                "discarding update from an abandoned job"
            );
            return;
        }

        match msg.update {
            JobUpdate::Accepted { handle } => {
                self.state.submission_accepted(handle);
                self.emit(SessionEvent::PhaseChanged {
                    phase: SessionPhase::Polling,
                });
                self.emit(SessionEvent::Progress {
                    percent: self.state.progress(),
                });
            }
            JobUpdate::Tick {
                signal,
                remote_status,
            } => {
                let percent = self.state.poll_tick(signal, remote_status);
                self.emit(SessionEvent::Progress { percent });
            }
            JobUpdate::Finished(outcome) => {
                self.job_task = None;
                match outcome {
                    JobOutcome::Completed(result) => {
                        let event_result = result.clone();
                        self.state.complete(*result);
                        self.emit(SessionEvent::Progress { percent: 100.0 });
                        self.emit(SessionEvent::PhaseChanged {
                            phase: SessionPhase::Completed,
                        });
                        self.emit(SessionEvent::Completed {
                            result: event_result,
                        });
                    }
                    JobOutcome::Failed(error) => {
                        warn!(%error, "session failed");
                        self.state.fail(error.clone());
                        self.emit(SessionEvent::PhaseChanged {
                            phase: SessionPhase::Failed,
                        });
                        self.emit(SessionEvent::Failed { error });
                    }
                }
                self.log_job_record();
            }
        }
        self.push_snapshot();
    }

    fn log_job_record(&self) {
        if let Some(job) = self.state.job() {
            let elapsed_ms = job
                .completed_at
                .unwrap_or_else(chrono::Utc::now)
                .signed_duration_since(job.created_at)
                .num_milliseconds();
            info!(
                handle = %job.handle,
                remote_status = ?job.remote_status,
                raw_progress = ?job.raw_progress,
                elapsed_ms,
                "job finished"
            );
        }
    }
}

async fn drive_job<G>(
    gateway: Arc<G>,
    cfg: SessionConfig,
    generation: u64,
    document: DocumentFile,
    tx: mpsc::UnboundedSender<JobMsg>,
) where
    G: AnalysisGateway + Send + Sync + 'static,
{
    let send = |update: JobUpdate| {
        let _ = tx.send(JobMsg { generation, update });
    };

    let accepted = match gateway.submit(&document).await {
        Ok(accepted) => accepted,
        Err(err) => {
            let message = match err {
                GatewayError::Rejected { message } if !message.is_empty() => message,
                other => {
                    warn!(error = %other, "submission failed");
                    SUBMIT_FALLBACK.to_string()
                }
            };
            send(JobUpdate::Finished(JobOutcome::Failed(
                SessionError::Submission(message),
            )));
            return;
        }
    };

    info!(handle = %accepted.analysis_id, "submission accepted");
    let handle = accepted.analysis_id;
    send(JobUpdate::Accepted {
        handle: handle.clone(),
    });

    for attempt in 1..=cfg.max_attempts {
        match gateway.query_status(&handle).await {
            Ok(StatusProbe::Status(status)) => match status.status {
                RemoteStatus::Completed => {
                    // A completed job is never re-polled, even when the
                    // result fetch fails.
                    let outcome = match gateway.fetch_result(&handle).await {
                        Ok(result) => JobOutcome::Completed(Box::new(result)),
                        Err(err) => {
                            warn!(%handle, error = %err, "result fetch failed");
                            JobOutcome::Failed(SessionError::Transport(
                                RESULTS_FALLBACK.to_string(),
                            ))
                        }
                    };
                    send(JobUpdate::Finished(outcome));
                    return;
                }
                RemoteStatus::Failed => {
                    let message = status
                        .error_message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| GATEWAY_FALLBACK.to_string());
                    send(JobUpdate::Finished(JobOutcome::Failed(
                        SessionError::Gateway(message),
                    )));
                    return;
                }
                RemoteStatus::Pending | RemoteStatus::Processing => {
                    let signal =
                        ProgressSignal::Reported(status.progress_percentage.unwrap_or(0.0));
                    debug!(attempt, ?signal, "still processing");
                    send(JobUpdate::Tick {
                        signal,
                        remote_status: status.status,
                    });
                }
            },
            Ok(StatusProbe::NotReady) => {
                debug!(attempt, "still processing (not-ready indicator)");
                send(JobUpdate::Tick {
                    signal: ProgressSignal::Unreported,
                    remote_status: RemoteStatus::Processing,
                });
            }
            Err(err) => {
                warn!(attempt, error = %err, "status query failed");
                send(JobUpdate::Finished(JobOutcome::Failed(transport_failure(
                    err,
                ))));
                return;
            }
        }
        tokio::time::sleep(cfg.poll_interval).await;
    }

    send(JobUpdate::Finished(JobOutcome::Failed(
        SessionError::Timeout,
    )));
}

fn transport_failure(err: GatewayError) -> SessionError {
    match err {
        GatewayError::Rejected { message } if !message.is_empty() => {
            SessionError::Transport(message)
        }
        _ => SessionError::Transport(RESULTS_FALLBACK.to_string()),
    }
}
