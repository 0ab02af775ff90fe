// ── Controller audit ──
//
// Runs on the DOWN -> UP edge (and on demand) to converge a controller
// with stored intent. Two phases:
//
//   1. Replay queued deletes, deepest path first, so children leave the
//      controller before their parents.
//   2. Walk the store's plan for this controller in hierarchical +
//      creation order, verifying each entity on the controller and
//      creating or overwriting it when it is missing or drifted.
//
// The pass runs inside the controller's monitor task, so at most one
// audit per controller is in flight at any time. Any connectivity error
// aborts the pass; whatever was not reached stays pending and the next
// UP edge (or manual trigger) picks it up.

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::store::{ConfigStore, PendingOp, PendingQueue};
use vtnc_southbound::{EntityPath, PushOp, SouthboundClient, SouthboundError};

/// Result of one audit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Every queued delete and every planned entity was verified.
    Clean {
        /// Queued deletes replayed to the controller.
        deletes_replayed: usize,
        /// Entities created because the controller lacked them.
        creates_replayed: usize,
        /// Entities overwritten because their attributes drifted.
        drift_repaired: usize,
    },
    /// The pass stopped early on a southbound failure. Everything not
    /// yet verified remains pending for the next pass.
    Aborted {
        /// Steps (deletes + plan items) completed before the failure.
        completed: usize,
        reason: String,
    },
}

impl AuditOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }
}

/// Bound a single southbound read.
pub(crate) async fn timed_get(
    client: &dyn SouthboundClient,
    url: &Url,
    path: &EntityPath,
    bound: std::time::Duration,
) -> Result<Option<Value>, SouthboundError> {
    tokio::time::timeout(bound, client.get(url, path))
        .await
        .unwrap_or(Err(SouthboundError::Timeout {
            timeout_ms: bound.as_millis() as u64,
        }))
}

/// Bound a single southbound write.
pub(crate) async fn timed_push(
    client: &dyn SouthboundClient,
    url: &Url,
    op: PushOp,
    path: &EntityPath,
    payload: Option<&Value>,
    bound: std::time::Duration,
) -> Result<(), SouthboundError> {
    tokio::time::timeout(bound, client.push(url, op, path, payload))
        .await
        .unwrap_or(Err(SouthboundError::Timeout {
            timeout_ms: bound.as_millis() as u64,
        }))
}

/// What [`ensure`] had to do for one entity.
pub(crate) enum Ensured {
    AlreadyMatching,
    Created,
    Overwritten,
}

/// Make one entity on the controller match `payload`.
pub(crate) async fn ensure(
    client: &dyn SouthboundClient,
    url: &Url,
    path: &EntityPath,
    payload: &Value,
    bound: std::time::Duration,
) -> Result<Ensured, SouthboundError> {
    match timed_get(client, url, path, bound).await? {
        Some(actual) if actual == *payload => Ok(Ensured::AlreadyMatching),
        Some(_) => {
            timed_push(client, url, PushOp::Update, path, Some(payload), bound).await?;
            Ok(Ensured::Overwritten)
        }
        None => {
            timed_push(client, url, PushOp::Create, path, Some(payload), bound).await?;
            Ok(Ensured::Created)
        }
    }
}

/// One full audit pass against `controller`.
pub(crate) async fn run_audit(
    store: &ConfigStore,
    queue: &PendingQueue,
    client: &dyn SouthboundClient,
    url: &Url,
    controller: &str,
    bound: std::time::Duration,
) -> AuditOutcome {
    let mut completed = 0usize;
    let mut deletes_replayed = 0usize;
    let mut creates_replayed = 0usize;
    let mut drift_repaired = 0usize;

    // Phase 1: queued deletes, children before parents.
    for entry in queue.deletes_deepest_first().await {
        match timed_push(client, url, PushOp::Delete, &entry.path, None, bound).await {
            Ok(()) => {
                queue.remove(PendingOp::Delete, &entry.path).await;
                deletes_replayed += 1;
                completed += 1;
                debug!(controller, path = %entry.path, "audit: replayed delete");
            }
            Err(err) => {
                warn!(controller, path = %entry.path, %err, "audit aborted during delete replay");
                return AuditOutcome::Aborted {
                    completed,
                    reason: err.to_string(),
                };
            }
        }
    }

    // Phase 2: hierarchical walk of everything this controller should
    // hold. Parents precede children in the plan, so every create lands
    // on an already-verified parent. The document for each step is read
    // from the store at push time; a mutation racing the pass fails the
    // conditional confirm and stays pending for the next one.
    for path in store.audit_plan(controller) {
        let Some(payload) = store.current_payload(&path) else {
            // Deleted since the plan was drawn; its delete is queued.
            continue;
        };
        match ensure(client, url, &path, &payload, bound).await {
            Ok(done) => {
                match done {
                    Ensured::AlreadyMatching => {}
                    Ensured::Created => {
                        creates_replayed += 1;
                        debug!(controller, path = %path, "audit: created missing entity");
                    }
                    Ensured::Overwritten => {
                        drift_repaired += 1;
                        debug!(controller, path = %path, "audit: repaired drifted entity");
                    }
                }
                if store.confirm_if_current(controller, &path, &payload) {
                    queue.remove(PendingOp::Create, &path).await;
                }
                completed += 1;
            }
            Err(err) => {
                warn!(controller, path = %path, %err, "audit aborted during verification");
                return AuditOutcome::Aborted {
                    completed,
                    reason: err.to_string(),
                };
            }
        }
    }

    // A clean pass confirmed every live entity; any create still queued
    // refers to something that no longer needs delivery.
    queue
        .retain_creates(|path| store.is_pending_create(controller, path))
        .await;

    info!(
        controller,
        deletes_replayed, creates_replayed, drift_repaired, "audit complete"
    );
    AuditOutcome::Clean {
        deletes_replayed,
        creates_replayed,
        drift_repaired,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::VNodeKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use vtnc_southbound::SimFabric;

    const CTRL: &str = "c1";
    const BOUND: Duration = Duration::from_secs(2);

    fn url() -> Url {
        Url::parse("http://10.0.0.1:8080").unwrap()
    }

    fn tenant_path() -> EntityPath {
        EntityPath::Tenant {
            tenant: "t1".into(),
        }
    }

    fn node_path() -> EntityPath {
        EntityPath::VNode {
            tenant: "t1".into(),
            node: "br1".into(),
        }
    }

    /// Store with a tenant + bridge bound to CTRL, all still pending,
    /// with the matching backlog.
    async fn pending_setup() -> (ConfigStore, PendingQueue) {
        let store = ConfigStore::new();
        let queue = PendingQueue::new();
        store.create_tenant("t1").unwrap();
        let effects = store
            .create_node("t1", "br1", VNodeKind::Bridge, CTRL)
            .unwrap();
        for effect in effects {
            queue.enqueue(PendingOp::Create, effect.path).await;
        }
        (store, queue)
    }

    #[tokio::test]
    async fn replays_backlog_and_confirms() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        let sim = fabric.attach(url());

        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert_eq!(
            outcome,
            AuditOutcome::Clean {
                deletes_replayed: 0,
                creates_replayed: 2,
                drift_repaired: 0,
            }
        );

        assert!(sim.contains(&tenant_path()).await);
        assert!(sim.contains(&node_path()).await);
        assert!(queue.is_empty().await);
        assert!(
            store
                .delivered_status(&node_path(), CTRL)
                .unwrap()
                .is_confirmed()
        );
    }

    #[tokio::test]
    async fn second_pass_is_idempotent() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        let sim = fabric.attach(url());

        run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        let pushes_after_first = sim.push_count();

        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert_eq!(
            outcome,
            AuditOutcome::Clean {
                deletes_replayed: 0,
                creates_replayed: 0,
                drift_repaired: 0,
            }
        );
        assert_eq!(sim.push_count(), pushes_after_first);
    }

    #[tokio::test]
    async fn repairs_drifted_attributes() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        let sim = fabric.attach(url());

        run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;

        // Mutate the controller-side copy behind the coordinator's back.
        sim.overwrite(&node_path(), serde_json::json!({ "name": "rogue" }))
            .await;

        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert_eq!(
            outcome,
            AuditOutcome::Clean {
                deletes_replayed: 0,
                creates_replayed: 0,
                drift_repaired: 1,
            }
        );
        assert_eq!(
            sim.attributes(&node_path()).await.unwrap()["kind"],
            "bridge"
        );
    }

    #[tokio::test]
    async fn unreachable_controller_aborts() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        // Nothing attached at the URL.

        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert!(matches!(outcome, AuditOutcome::Aborted { completed: 0, .. }));
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn rejected_write_aborts_midpass_then_converges() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        let sim = fabric.attach(url());
        let iface = EntityPath::Interface {
            tenant: "t1".into(),
            node: "br1".into(),
            name: "if1".into(),
        };

        // First convergence, then a new pending interface.
        run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        for effect in store.create_interface("t1", "br1", "if1").unwrap() {
            queue.enqueue(effect.op, effect.path).await;
        }

        // The already-confirmed tenant and bridge verify as no-ops, so
        // the pass makes progress before the rejected interface write.
        sim.set_reject_writes(true);
        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        match outcome {
            AuditOutcome::Aborted { completed, .. } => assert_eq!(completed, 2),
            other => panic!("expected an aborted pass, got {other:?}"),
        }
        assert!(!sim.contains(&iface).await);
        assert_eq!(queue.len().await, 1);

        // Fault cleared: the rerun picks up exactly where it stopped.
        sim.set_reject_writes(false);
        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert_eq!(
            outcome,
            AuditOutcome::Clean {
                deletes_replayed: 0,
                creates_replayed: 1,
                drift_repaired: 0,
            }
        );
        assert!(sim.contains(&iface).await);
        assert!(queue.is_empty().await);
        assert!(
            store
                .delivered_status(&iface, CTRL)
                .unwrap()
                .is_confirmed()
        );
    }

    #[tokio::test]
    async fn queued_deletes_run_before_creates() {
        let (store, queue) = pending_setup().await;
        let fabric = SimFabric::new();
        let sim = fabric.attach(url());

        // First convergence.
        run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;

        // Delete the node while "down": effects go to the backlog only.
        for effect in store.delete_node("t1", "br1") {
            queue.enqueue(PendingOp::Delete, effect.path).await;
        }

        let outcome = run_audit(&store, &queue, &fabric, &url(), CTRL, BOUND).await;
        assert_eq!(
            outcome,
            AuditOutcome::Clean {
                deletes_replayed: 1,
                creates_replayed: 0,
                drift_repaired: 0,
            }
        );
        assert!(!sim.contains(&node_path()).await);
        assert!(sim.contains(&tenant_path()).await);
    }
}
