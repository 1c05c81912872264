//! Public API types for the `riskscan` session engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use riskscan_client_core::analysis::AnalysisResult;
use riskscan_client_core::document::DocumentFile;

use crate::engine::Command;
use crate::gateway::AnalysisGateway;

/// Configuration for a client session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between consecutive status queries.
    pub poll_interval: Duration,

    /// Number of still-processing status queries tolerated before the
    /// session fails with [`SessionError::Timeout`]. Exactly this many
    /// queries are issued; the engine never issues one more.
    pub max_attempts: u32,
}

impl SessionConfig {
    /// Default delay between status queries.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

    /// Default attempt ceiling (roughly two minutes at the default interval).
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    /// No job; a document may be submitted.
    Idle,
    /// Upload request in flight.
    Submitting,
    /// Job accepted; the poll loop is active.
    Polling,
    /// Terminal: result fetched and attached.
    Completed,
    /// Terminal: submission, analysis, transport, or timeout failure.
    Failed,
}

impl SessionPhase {
    /// Whether this phase is only left via an explicit reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

/// Terminal session errors, each carrying its user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Local validation failure or gateway rejection during submit.
    #[error("{0}")]
    Submission(String),
    /// The gateway reported the analysis as failed.
    #[error("{0}")]
    Gateway(String),
    /// Network, decode, or unexpected-status failure while polling or
    /// fetching the result.
    #[error("{0}")]
    Transport(String),
    /// The attempt ceiling was exhausted without a terminal status.
    #[error("Analysis timeout - please try again")]
    Timeout,
}

/// Session event stream payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The session moved to a new phase.
    PhaseChanged {
        /// New phase.
        phase: SessionPhase,
    },
    /// Displayed progress advanced.
    Progress {
        /// Displayed percentage in `[0, 100]`, non-decreasing per session.
        percent: f64,
    },
    /// The analysis completed and its result was fetched.
    Completed {
        /// The fetched result.
        result: Box<AnalysisResult>,
    },
    /// The session reached a terminal failure.
    Failed {
        /// Failure classification and message.
        error: SessionError,
    },
    /// The session was reset back to idle.
    WasReset,
}

/// The single slot a frontend reads: current phase, displayed progress, and
/// the terminal error or result when one exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Displayed progress percentage in `[0, 100]`.
    pub progress: f64,
    /// Terminal error, when `phase` is [`SessionPhase::Failed`].
    pub error: Option<SessionError>,
    /// Analysis result, when `phase` is [`SessionPhase::Completed`].
    pub result: Option<AnalysisResult>,
}

/// Handle to a running session engine task.
pub struct SessionHandle {
    pub(crate) cmd_tx: tokio::sync::mpsc::UnboundedSender<Command>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<SessionEvent>,
    pub(crate) snapshot_rx: tokio::sync::watch::Receiver<SessionSnapshot>,
    pub(crate) join: tokio::task::JoinHandle<()>,
}

/// Start a new session engine task over the given gateway.
pub fn start_session<G>(gateway: G, config: SessionConfig) -> SessionHandle
where
    G: AnalysisGateway + Send + Sync + 'static,
{
    crate::engine::start_session(gateway, config)
}

impl SessionHandle {
    /// Submit a validated document.
    ///
    /// The driving frontend must only call this while the session is idle;
    /// submitting over an active session is a programming error and aborts
    /// the engine.
    pub fn submit(&self, document: DocumentFile) {
        let _ = self.cmd_tx.send(Command::Submit(Box::new(document)));
    }

    /// Abandon the current job (whatever its phase) and return to idle.
    ///
    /// Supersedes any in-flight poll: responses issued under the previous
    /// generation can no longer mutate session state.
    pub fn reset(&self) {
        let _ = self.cmd_tx.send(Command::Reset);
    }

    /// Subscribe to the session event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get the latest session snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch snapshot updates (for awaiting state changes).
    pub fn watch(&self) -> tokio::sync::watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop the engine task.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    /// Wait for the engine task to stop.
    pub async fn wait(self) -> anyhow::Result<()> {
        self.join
            .await
            .map_err(|err| anyhow::anyhow!("session task join error: {err}"))
    }
}
