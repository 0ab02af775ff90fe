use thiserror::Error;

/// Failure modes of a single southbound operation.
///
/// Every variant is scoped to the one probe/get/push call that produced it.
/// The coordinator core absorbs these into controller state (a failed probe
/// feeds the DOWN debounce, a failed push aborts the current audit pass) --
/// they never terminate the process.
#[derive(Debug, Error)]
pub enum SouthboundError {
    /// No controller answered at the given address.
    #[error("controller unreachable at {address}")]
    Unreachable { address: String },

    /// The operation did not complete within its bounded timeout.
    #[error("southbound operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The controller answered but refused the write.
    #[error("controller rejected the operation: {reason}")]
    Rejected { reason: String },
}

impl SouthboundError {
    /// Returns `true` if the failure indicates the controller itself is
    /// unreachable (as opposed to refusing a specific write).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}
