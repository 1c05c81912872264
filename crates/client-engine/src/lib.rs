#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Session engine for the `riskscan` client (document submission, status
//! polling, progress mapping, cancellation).

/// Public API for the session engine.
pub mod api;
/// Gateway adapter for the remote analysis service.
pub mod gateway;
/// Pure progress mapping.
pub mod progress;

mod engine;
mod session;

pub use api::{
    SessionConfig, SessionError, SessionEvent, SessionHandle, SessionPhase, SessionSnapshot,
    start_session,
};
