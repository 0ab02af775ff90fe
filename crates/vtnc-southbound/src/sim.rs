// ── Simulated controller fabric ──
//
// An in-memory implementation of `SouthboundClient` backing a set of
// controllers keyed by address. Integration tests drive outages by
// pointing the coordinator at an address with no controller attached,
// exactly how the real system's functional tests flip a controller's
// IP to an invalid one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::client::{PushOp, SouthboundClient};
use crate::error::SouthboundError;
use crate::path::EntityPath;

// ── SimController ───────────────────────────────────────────────────

/// One simulated controller: a flat object table keyed by path.
///
/// The table deliberately does not cascade deletes -- removing a parent
/// leaves children orphaned, so a coordinator that skips per-descendant
/// deletes is caught by tests rather than papered over.
#[derive(Default)]
pub struct SimController {
    objects: Mutex<BTreeMap<String, Value>>,
    push_count: AtomicU64,
    reject_writes: AtomicBool,
}

impl SimController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the controller currently holds an object at `path`.
    pub async fn contains(&self, path: &EntityPath) -> bool {
        self.objects.lock().await.contains_key(&path.to_string())
    }

    /// The attribute document at `path`, if any.
    pub async fn attributes(&self, path: &EntityPath) -> Option<Value> {
        self.objects.lock().await.get(&path.to_string()).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Number of successfully applied writes since creation.
    pub fn push_count(&self) -> u64 {
        self.push_count.load(Ordering::Relaxed)
    }

    /// Replace the stored document at `path` directly, bypassing the
    /// client contract. Lets tests fabricate attribute drift.
    pub async fn overwrite(&self, path: &EntityPath, doc: Value) {
        self.objects.lock().await.insert(path.to_string(), doc);
    }

    /// Fault injection: make every subsequent write fail with
    /// [`SouthboundError::Rejected`] until switched off again.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Relaxed);
    }

    async fn apply(
        &self,
        op: PushOp,
        path: &EntityPath,
        payload: Option<&Value>,
    ) -> Result<(), SouthboundError> {
        if self.reject_writes.load(Ordering::Relaxed) {
            return Err(SouthboundError::Rejected {
                reason: "write rejected (fault injection)".into(),
            });
        }

        let key = path.to_string();
        let mut objects = self.objects.lock().await;

        match op {
            PushOp::Create => {
                if let Some(parent) = path.parent() {
                    if !objects.contains_key(&parent.to_string()) {
                        return Err(SouthboundError::Rejected {
                            reason: format!("parent missing for {key}"),
                        });
                    }
                }
                if objects.contains_key(&key) {
                    return Err(SouthboundError::Rejected {
                        reason: format!("object already exists at {key}"),
                    });
                }
                let doc = payload.ok_or_else(|| SouthboundError::Rejected {
                    reason: "create requires a payload".into(),
                })?;
                objects.insert(key, doc.clone());
            }
            PushOp::Update => {
                if !objects.contains_key(&key) {
                    return Err(SouthboundError::Rejected {
                        reason: format!("no object to update at {key}"),
                    });
                }
                let doc = payload.ok_or_else(|| SouthboundError::Rejected {
                    reason: "update requires a payload".into(),
                })?;
                objects.insert(key, doc.clone());
            }
            // Delete is idempotent at the controller.
            PushOp::Delete => {
                objects.remove(&key);
            }
        }

        self.push_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ── SimFabric ───────────────────────────────────────────────────────

/// The simulated network: controllers attached at addresses.
///
/// Probing or pushing to an address with nothing attached behaves like
/// a dead host, which is how tests take a controller "down" without
/// touching its object table.
#[derive(Default)]
pub struct SimFabric {
    controllers: DashMap<Url, Arc<SimController>>,
}

impl SimFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh controller at `address`, returning a handle for
    /// test inspection. Replaces any controller already there.
    pub fn attach(&self, address: Url) -> Arc<SimController> {
        let controller = Arc::new(SimController::new());
        self.controllers.insert(address, Arc::clone(&controller));
        controller
    }

    /// Re-attach an existing controller (with its object table intact)
    /// at `address`. Used to restore connectivity after an outage.
    pub fn attach_existing(&self, address: Url, controller: Arc<SimController>) {
        self.controllers.insert(address, controller);
    }

    /// Detach whatever is at `address`. Subsequent probes fail.
    pub fn detach(&self, address: &Url) -> Option<Arc<SimController>> {
        self.controllers.remove(address).map(|(_, c)| c)
    }

    pub fn controller(&self, address: &Url) -> Option<Arc<SimController>> {
        self.controllers.get(address).map(|c| Arc::clone(&c))
    }
}

#[async_trait]
impl SouthboundClient for SimFabric {
    async fn probe(&self, address: &Url) -> Result<bool, SouthboundError> {
        Ok(self.controllers.contains_key(address))
    }

    async fn get(
        &self,
        address: &Url,
        path: &EntityPath,
    ) -> Result<Option<Value>, SouthboundError> {
        let controller = self
            .controller(address)
            .ok_or_else(|| SouthboundError::Unreachable {
                address: address.to_string(),
            })?;
        Ok(controller.attributes(path).await)
    }

    async fn push(
        &self,
        address: &Url,
        op: PushOp,
        path: &EntityPath,
        payload: Option<&Value>,
    ) -> Result<(), SouthboundError> {
        let controller = self
            .controller(address)
            .ok_or_else(|| SouthboundError::Unreachable {
                address: address.to_string(),
            })?;
        debug!(%address, ?op, %path, "sim push");
        controller.apply(op, path, payload).await
    }
}
