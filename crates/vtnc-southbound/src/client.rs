// ── Southbound client contract ──
//
// The coordinator core only ever talks to a controller through this
// trait. The wire protocol behind it is not vtnc's business: any
// implementation that can answer a liveness probe and apply
// get/create/update/delete on hierarchical paths qualifies.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::SouthboundError;
use crate::path::EntityPath;

/// Write operations a controller accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOp {
    Create,
    Update,
    Delete,
}

/// Access to one or more physical controllers, addressed by URL.
///
/// All calls are bounded: an implementation must fail with
/// [`SouthboundError::Timeout`] rather than block indefinitely. A failed
/// call is a statement about that single operation only -- the caller
/// decides what it means for controller state.
#[async_trait]
pub trait SouthboundClient: Send + Sync {
    /// Liveness probe. `Ok(false)` means the address answered nothing
    /// useful; transport-level failures surface as errors.
    async fn probe(&self, address: &Url) -> Result<bool, SouthboundError>;

    /// Fetch the attribute document for an object, or `None` if the
    /// controller has no object at that path.
    async fn get(&self, address: &Url, path: &EntityPath)
    -> Result<Option<Value>, SouthboundError>;

    /// Apply a single mutation. `payload` carries the full attribute
    /// document for create/update (writes are whole-object overwrites)
    /// and is ignored for delete.
    async fn push(
        &self,
        address: &Url,
        op: PushOp,
        path: &EntityPath,
        payload: Option<&Value>,
    ) -> Result<(), SouthboundError>;
}
