// ABOUTME: Error taxonomy for fleet API operations.
// ABOUTME: Distinguishes transport failures, remote rejections, and wait timeouts.

use thiserror::Error;

use crate::types::MachineId;

/// Errors from individual fleet operations.
///
/// There is no retry policy at this layer; callers decide whether a failure
/// is worth retrying.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The fleet rejected the request (4xx) or failed internally (5xx).
    #[error("fleet returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never completed: connection refused, reset, DNS, etc.
    #[error("fleet request failed: {0}")]
    Transport(String),

    /// The fleet's response could not be decoded.
    #[error("unexpected fleet response: {0}")]
    InvalidResponse(String),

    /// A state wait ran out of time before the machine arrived.
    #[error("timed out waiting for machine {id} to reach {state}")]
    WaitTimeout { id: MachineId, state: String },
}

impl FleetError {
    /// True when the remote said "no such machine".
    pub fn is_not_found(&self) -> bool {
        matches!(self, FleetError::Api { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FleetError::WaitTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_404_only() {
        let err = FleetError::Api {
            status: 404,
            message: "machine not found".to_string(),
        };
        assert!(err.is_not_found());

        let err = FleetError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }
}
