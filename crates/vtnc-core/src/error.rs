// ── Core error types ──
//
// Errors that reach a caller of the coordinator API. Southbound failures
// are deliberately NOT here in raw form: a failed probe or push is
// absorbed into controller state (DOWN / PENDING / PARTIAL) and retried
// on the next recovery edge. Only contract violations -- duplicate names,
// malformed positions, unknown controllers -- propagate synchronously.

use thiserror::Error;

/// Unified error type for the coordinator core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A create collided with an existing name under the same parent.
    /// Nothing was changed.
    #[error("already exists: {entity}")]
    Conflict { entity: String },

    /// A read or create referenced an entity that does not exist.
    /// (Deletes of absent entities are idempotent no-ops, not errors.)
    #[error("not found: {entity}")]
    NotFound { entity: String },

    /// A flow filter entry insertion named a position outside the dense
    /// range. Rejected before any sibling was shifted.
    #[error("invalid position {position}: filter holds {len} entries")]
    OrderingViolation { position: usize, len: usize },

    /// No controller is registered under this name.
    #[error("no such controller: {name}")]
    NoSuchController { name: String },

    /// `wait_until_state` expired before the controller reached the
    /// requested state. Distinct from southbound unreachability.
    #[error("controller {controller} did not reach {target} within {waited_ms}ms")]
    WaitTimeout {
        controller: String,
        target: String,
        waited_ms: u64,
    },

    /// A delivered-side validation could not reach the controller.
    /// Intent-side validation never fails this way.
    #[error("cannot validate at controller {controller}: {reason}")]
    ValidationUnavailable { controller: String, reason: String },

    /// Invalid configuration handed to the coordinator.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Invariant breach inside the coordinator itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn conflict(entity: impl std::fmt::Display) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
        }
    }

    pub(crate) fn not_found(entity: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
        }
    }
}
