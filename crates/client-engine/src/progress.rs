//! Pure mapping from raw gateway progress signals to displayed percentages.
//!
//! The display band is split into an upload phase (a fixed low-water mark,
//! since the gateway only signals accept/reject) and a poll phase that
//! rescales the service's own 0-100 estimate into the band above the
//! upload floor. 100 is reserved for the completion transition; the caller
//! enforces monotonicity.

/// Displayed progress while the upload request is in flight.
pub const UPLOAD_START: f64 = 5.0;

/// Low-water mark once the gateway has accepted the submission.
pub const UPLOAD_FLOOR: f64 = 10.0;

/// Ceiling for any estimate-derived value; 100 means completed.
const POLL_CEILING: f64 = 99.0;

/// Step applied when a poll tick carries no numeric estimate.
const UNREPORTED_STEP: f64 = 2.0;

/// Ceiling for the no-estimate heuristic, kept below reported estimates.
const UNREPORTED_CEILING: f64 = 95.0;

/// Raw progress signal carried by one still-processing poll tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressSignal {
    /// The gateway reported a 0-100 estimate.
    Reported(f64),
    /// The gateway only signaled "not ready"; no estimate available.
    Unreported,
}

/// Map one poll-phase signal into the display band above the upload floor.
///
/// Stateless: `previous` is consulted only by the unreported-signal
/// heuristic, which advances a small fixed step per tick instead of
/// stalling. The caller still clamps the result against the previous
/// displayed value, so a shrinking estimate never moves the display
/// backwards.
pub fn poll_progress(signal: ProgressSignal, previous: f64) -> f64 {
    match signal {
        ProgressSignal::Reported(raw) => {
            let raw = raw.clamp(0.0, 100.0);
            (UPLOAD_FLOOR + raw * (100.0 - UPLOAD_FLOOR) / 100.0).min(POLL_CEILING)
        }
        ProgressSignal::Unreported => (previous + UNREPORTED_STEP).min(UNREPORTED_CEILING),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_estimates_rescale_into_the_poll_band() {
        assert_eq!(poll_progress(ProgressSignal::Reported(0.0), 0.0), 10.0);
        assert_eq!(poll_progress(ProgressSignal::Reported(40.0), 0.0), 46.0);
        assert_eq!(poll_progress(ProgressSignal::Reported(80.0), 0.0), 82.0);
    }

    #[test]
    fn reported_estimates_never_claim_completion() {
        // 100 is reserved for the completed transition.
        assert_eq!(poll_progress(ProgressSignal::Reported(100.0), 0.0), 99.0);
        assert_eq!(poll_progress(ProgressSignal::Reported(250.0), 0.0), 99.0);
    }

    #[test]
    fn out_of_range_estimates_are_clamped() {
        assert_eq!(poll_progress(ProgressSignal::Reported(-20.0), 0.0), 10.0);
    }

    #[test]
    fn unreported_ticks_advance_by_a_bounded_step() {
        let mut displayed = UPLOAD_FLOOR;
        for _ in 0..100 {
            let next = poll_progress(ProgressSignal::Unreported, displayed);
            assert!(next >= displayed);
            assert!(next <= UNREPORTED_CEILING);
            displayed = next;
        }
        assert_eq!(displayed, UNREPORTED_CEILING);
    }
}
