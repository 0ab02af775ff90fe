// ── Coordinator ──
//
// The public surface: controller lifecycle, logical mutations, and
// validation. One monitor task per controller owns that controller's
// probe loop and runs its audits inline, so audit passes against a
// controller never overlap.
//
// Every mutation commits to the store first and then tries to deliver
// the resulting effects. An effect whose controller is UP is pushed
// immediately; anything else (controller DOWN, push failed, parent not
// yet delivered) goes to that controller's backlog and is replayed by
// the next audit.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::audit::{AuditOutcome, ensure, run_audit, timed_push};
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{FilterEntrySpec, FlowMatch, PortMapSpec, VNodeKind};
use crate::monitor::{ControllerState, Debounce, StateTransition, wait_until_state};
use crate::store::{ConfigStore, Effect, PendingEntry, PendingOp, PendingQueue};
use crate::validate::{Query, Verdict, evaluate_delivered, evaluate_intent};
use dashmap::DashMap;
use vtnc_southbound::{PushOp, SouthboundClient};

// ── Controller handle ───────────────────────────────────────────────

/// Per-controller runtime state shared between the coordinator API and
/// the controller's monitor task.
struct ControllerHandle {
    name: String,
    /// Mutable: a controller's address may be repointed, which is also
    /// how operators take one "offline" without unregistering it.
    url: RwLock<Url>,
    state_tx: watch::Sender<ControllerState>,
    history: Mutex<Vec<StateTransition>>,
    queue: PendingQueue,
    audit_notify: Notify,
    last_audit: Mutex<Option<AuditOutcome>>,
    cancel: CancellationToken,
}

impl ControllerHandle {
    fn state(&self) -> ControllerState {
        *self.state_tx.borrow()
    }

    async fn url(&self) -> Url {
        self.url.read().await.clone()
    }

    async fn record(&self, state: ControllerState) {
        self.history.lock().await.push(StateTransition {
            state,
            at: chrono::Utc::now(),
        });
    }
}

struct ControllerEntry {
    handle: Arc<ControllerHandle>,
    task: Mutex<Option<JoinHandle<()>>>,
}

// ── Coordinator ─────────────────────────────────────────────────────

struct Inner {
    config: CoordinatorConfig,
    client: Arc<dyn SouthboundClient>,
    store: ConfigStore,
    controllers: DashMap<String, Arc<ControllerEntry>>,
    cancel: CancellationToken,
}

pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        client: Arc<dyn SouthboundClient>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                store: ConfigStore::new(),
                controllers: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
        })
    }

    // ── Controller lifecycle ────────────────────────────────────

    /// Register a controller and start probing it. The controller
    /// starts UNKNOWN and earns UP or DOWN through consecutive probe
    /// outcomes.
    pub async fn add_controller(&self, name: &str, url: Url) -> Result<(), CoreError> {
        use dashmap::mapref::entry::Entry;

        let (state_tx, _) = watch::channel(ControllerState::Unknown);
        let handle = Arc::new(ControllerHandle {
            name: name.to_owned(),
            url: RwLock::new(url),
            state_tx,
            history: Mutex::new(Vec::new()),
            queue: PendingQueue::new(),
            audit_notify: Notify::new(),
            last_audit: Mutex::new(None),
            cancel: self.inner.cancel.child_token(),
        });
        handle.record(ControllerState::Unknown).await;

        // Insert without awaiting under the map guard.
        match self.inner.controllers.entry(name.to_owned()) {
            Entry::Occupied(_) => return Err(CoreError::conflict(format!("controller {name}"))),
            Entry::Vacant(slot) => {
                let task =
                    tokio::spawn(monitor_loop(Arc::clone(&self.inner), Arc::clone(&handle)));
                slot.insert(Arc::new(ControllerEntry {
                    handle,
                    task: Mutex::new(Some(task)),
                }));
            }
        }
        info!(controller = name, "controller registered");
        Ok(())
    }

    /// Unregister a controller. Its monitor task stops and its backlog
    /// is discarded; stored entities bound to it stay in the store.
    pub async fn remove_controller(&self, name: &str) -> Result<(), CoreError> {
        let (_, entry) = self
            .inner
            .controllers
            .remove(name)
            .ok_or_else(|| no_such(name))?;

        entry.handle.cancel.cancel();
        if let Some(task) = entry.task.lock().await.take() {
            let _ = task.await;
        }
        entry.handle.queue.clear().await;
        info!(controller = name, "controller removed");
        Ok(())
    }

    pub fn controller_state(&self, name: &str) -> Result<ControllerState, CoreError> {
        Ok(self.entry(name)?.handle.state())
    }

    /// Repoint a registered controller at a new address. Takes effect
    /// on the next probe; liveness follows via the usual thresholds.
    pub async fn update_controller_address(&self, name: &str, url: Url) -> Result<(), CoreError> {
        let entry = self.entry(name)?;
        *entry.handle.url.write().await = url;
        info!(controller = name, "controller address updated");
        Ok(())
    }

    /// All recorded state transitions, oldest first, starting with the
    /// initial UNKNOWN.
    pub async fn state_history(&self, name: &str) -> Result<Vec<StateTransition>, CoreError> {
        Ok(self.entry(name)?.handle.history.lock().await.clone())
    }

    /// Block until the controller reaches `target` or `wait` expires.
    pub async fn wait_until_state(
        &self,
        name: &str,
        target: ControllerState,
        wait: std::time::Duration,
    ) -> Result<(), CoreError> {
        let rx = self.entry(name)?.handle.state_tx.subscribe();
        wait_until_state(name, rx, target, wait).await
    }

    /// Ask the controller's monitor task for an audit pass at the next
    /// opportunity. Ignored if the controller is not UP when it fires.
    pub fn trigger_audit(&self, name: &str) -> Result<(), CoreError> {
        self.entry(name)?.handle.audit_notify.notify_one();
        Ok(())
    }

    /// Outcome of the most recent audit pass, if any ran yet.
    pub async fn last_audit(&self, name: &str) -> Result<Option<AuditOutcome>, CoreError> {
        Ok(self.entry(name)?.handle.last_audit.lock().await.clone())
    }

    /// The controller's undelivered backlog, FIFO.
    pub async fn pending_backlog(&self, name: &str) -> Result<Vec<PendingEntry>, CoreError> {
        Ok(self.entry(name)?.handle.queue.snapshot().await)
    }

    /// Registered controller names and their current states.
    pub fn controllers(&self) -> Vec<(String, ControllerState)> {
        self.inner
            .controllers
            .iter()
            .map(|e| (e.key().clone(), e.value().handle.state()))
            .collect()
    }

    /// Stop all monitor tasks. The store survives; a restarted
    /// coordinator would re-register controllers and re-audit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        for entry in self.inner.controllers.iter().map(|e| Arc::clone(e.value())) {
            if let Some(task) = entry.task.lock().await.take() {
                let _ = task.await;
            }
        }
        info!("coordinator shut down");
    }

    // ── Logical mutations ───────────────────────────────────────

    pub fn create_tenant(&self, name: &str) -> Result<(), CoreError> {
        self.inner.store.create_tenant(name)
    }

    pub async fn delete_tenant(&self, name: &str) {
        let effects = self.inner.store.delete_tenant(name);
        self.apply_effects(effects).await;
    }

    pub async fn create_bridge(
        &self,
        tenant: &str,
        name: &str,
        controller: &str,
    ) -> Result<(), CoreError> {
        self.create_vnode(tenant, name, VNodeKind::Bridge, controller)
            .await
    }

    pub async fn create_terminal(
        &self,
        tenant: &str,
        name: &str,
        controller: &str,
    ) -> Result<(), CoreError> {
        self.create_vnode(tenant, name, VNodeKind::Terminal, controller)
            .await
    }

    async fn create_vnode(
        &self,
        tenant: &str,
        name: &str,
        kind: VNodeKind,
        controller: &str,
    ) -> Result<(), CoreError> {
        if !self.inner.controllers.contains_key(controller) {
            return Err(no_such(controller));
        }
        let effects = self.inner.store.create_node(tenant, name, kind, controller)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_vnode(&self, tenant: &str, name: &str) {
        let effects = self.inner.store.delete_node(tenant, name);
        self.apply_effects(effects).await;
    }

    pub async fn create_interface(
        &self,
        tenant: &str,
        node: &str,
        name: &str,
    ) -> Result<(), CoreError> {
        let effects = self.inner.store.create_interface(tenant, node, name)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_interface(&self, tenant: &str, node: &str, name: &str) {
        let effects = self.inner.store.delete_interface(tenant, node, name);
        self.apply_effects(effects).await;
    }

    pub async fn set_port_map(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        spec: PortMapSpec,
    ) -> Result<(), CoreError> {
        let effects = self.inner.store.set_port_map(tenant, node, interface, spec)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_port_map(&self, tenant: &str, node: &str, interface: &str) {
        let effects = self.inner.store.delete_port_map(tenant, node, interface);
        self.apply_effects(effects).await;
    }

    pub async fn create_flow_list(
        &self,
        tenant: &str,
        name: &str,
        controller: &str,
    ) -> Result<(), CoreError> {
        if !self.inner.controllers.contains_key(controller) {
            return Err(no_such(controller));
        }
        let effects = self.inner.store.create_flow_list(tenant, name, controller)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_flow_list(&self, tenant: &str, name: &str) {
        let effects = self.inner.store.delete_flow_list(tenant, name);
        self.apply_effects(effects).await;
    }

    pub async fn add_flow_list_entry(
        &self,
        tenant: &str,
        list: &str,
        seq: u32,
        matches: FlowMatch,
    ) -> Result<(), CoreError> {
        let effects = self
            .inner
            .store
            .create_flow_list_entry(tenant, list, seq, matches)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_flow_list_entry(&self, tenant: &str, list: &str, seq: u32) {
        let effects = self.inner.store.delete_flow_list_entry(tenant, list, seq);
        self.apply_effects(effects).await;
    }

    pub async fn create_flow_filter(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: vtnc_southbound::Direction,
    ) -> Result<(), CoreError> {
        let effects = self
            .inner
            .store
            .create_flow_filter(tenant, node, interface, direction)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn delete_flow_filter(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: vtnc_southbound::Direction,
    ) {
        let effects = self
            .inner
            .store
            .delete_flow_filter(tenant, node, interface, direction);
        self.apply_effects(effects).await;
    }

    pub async fn insert_filter_entry(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: vtnc_southbound::Direction,
        position: usize,
        name: &str,
        spec: FilterEntrySpec,
    ) -> Result<(), CoreError> {
        let effects = self
            .inner
            .store
            .insert_filter_entry(tenant, node, interface, direction, position, name, spec)?;
        self.apply_effects(effects).await;
        Ok(())
    }

    pub async fn remove_filter_entry(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: vtnc_southbound::Direction,
        name: &str,
    ) {
        let effects = self
            .inner
            .store
            .remove_filter_entry(tenant, node, interface, direction, name);
        self.apply_effects(effects).await;
    }

    // ── Validation ──────────────────────────────────────────────

    /// What the coordinator intends, regardless of delivery.
    pub fn validate_intent(&self, query: &Query) -> Verdict {
        evaluate_intent(&self.inner.store, query)
    }

    /// What the named controller actually holds right now.
    pub async fn validate_delivered(
        &self,
        controller: &str,
        query: &Query,
    ) -> Result<Verdict, CoreError> {
        let entry = self.entry(controller)?;
        let url = entry.handle.url().await;
        evaluate_delivered(
            self.inner.client.as_ref(),
            &url,
            query,
            self.inner.config.southbound_timeout,
        )
        .await
        .map_err(|err| CoreError::ValidationUnavailable {
            controller: controller.to_owned(),
            reason: err.to_string(),
        })
    }

    // ── Internals ───────────────────────────────────────────────

    fn entry(&self, name: &str) -> Result<Arc<ControllerEntry>, CoreError> {
        self.inner
            .controllers
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| no_such(name))
    }

    /// Deliver effects where possible, park the rest.
    async fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            let Ok(entry) = self.entry(&effect.controller) else {
                warn!(
                    controller = %effect.controller,
                    path = %effect.path,
                    "dropping effect for unregistered controller"
                );
                continue;
            };
            let handle = &entry.handle;

            let up = handle.state() == ControllerState::Up;
            if up && self.try_deliver(handle, &effect).await {
                continue;
            }
            debug!(controller = %effect.controller, path = %effect.path, "queued for later delivery");
            handle.queue.enqueue(effect.op, effect.path).await;
            if up {
                // Delivery failed despite the controller being UP; let
                // its monitor task reconcile without waiting for the
                // next recovery edge.
                handle.audit_notify.notify_one();
            }
        }
    }

    /// One immediate delivery attempt. Creates push the store's current
    /// attributes, read at push time rather than captured with the
    /// effect. `false` means the effect still needs the backlog.
    async fn try_deliver(&self, handle: &ControllerHandle, effect: &Effect) -> bool {
        let client = self.inner.client.as_ref();
        let bound = self.inner.config.southbound_timeout;
        let url = handle.url().await;

        match effect.op {
            PendingOp::Create => {
                // A child pushed before its parent would be rejected
                // anyway; skip straight to the backlog.
                if !self
                    .inner
                    .store
                    .parent_confirmed(&handle.name, &effect.path)
                {
                    return false;
                }
                let Some(payload) = self.inner.store.current_payload(&effect.path) else {
                    // Deleted since the mutation; its delete effect
                    // covers the controller side.
                    return true;
                };
                match ensure(client, &url, &effect.path, &payload, bound).await {
                    Ok(_) => {
                        if self
                            .inner
                            .store
                            .confirm_if_current(&handle.name, &effect.path, &payload)
                        {
                            true
                        } else {
                            debug!(path = %effect.path, "push superseded by a newer mutation");
                            false
                        }
                    }
                    Err(err) => {
                        debug!(path = %effect.path, %err, "immediate create failed");
                        false
                    }
                }
            }
            PendingOp::Delete => {
                match timed_push(client, &url, PushOp::Delete, &effect.path, None, bound).await
                {
                    Ok(()) => true,
                    Err(err) => {
                        debug!(path = %effect.path, %err, "immediate delete failed");
                        false
                    }
                }
            }
        }
    }
}

fn no_such(name: &str) -> CoreError {
    CoreError::NoSuchController {
        name: name.to_owned(),
    }
}

// ── Monitor task ────────────────────────────────────────────────────

/// Per-controller probe loop. Runs audits inline on the DOWN -> UP edge
/// and on demand, so this task is the only audit writer for its
/// controller.
async fn monitor_loop(inner: Arc<Inner>, handle: Arc<ControllerHandle>) {
    let mut debounce = Debounce::new(&inner.config.liveness);
    let mut ticker = tokio::time::interval(inner.config.liveness.probe_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = handle.cancel.cancelled() => break,

            () = handle.audit_notify.notified() => {
                if debounce.state() == ControllerState::Up {
                    audit_once(&inner, &handle).await;
                } else {
                    debug!(controller = %handle.name, "audit trigger ignored while not UP");
                }
            }

            _ = ticker.tick() => {
                let reachable = probe(&inner, &handle).await;
                if let Some(edge) = debounce.observe(reachable) {
                    info!(controller = %handle.name, state = %edge, "controller state changed");
                    handle.record(edge).await;
                    let _ = handle.state_tx.send(edge);

                    if edge == ControllerState::Up {
                        audit_once(&inner, &handle).await;
                    }
                }
            }
        }
    }

    debug!(controller = %handle.name, "monitor task stopped");
}

async fn probe(inner: &Inner, handle: &ControllerHandle) -> bool {
    let url = handle.url().await;
    let attempt =
        tokio::time::timeout(inner.config.liveness.probe_timeout, inner.client.probe(&url)).await;
    matches!(attempt, Ok(Ok(true)))
}

/// One audit pass, abandoned mid-flight on shutdown.
async fn audit_once(inner: &Inner, handle: &ControllerHandle) {
    let url = handle.url().await;
    let outcome = tokio::select! {
        () = handle.cancel.cancelled() => return,
        outcome = run_audit(
            &inner.store,
            &handle.queue,
            inner.client.as_ref(),
            &url,
            &handle.name,
            inner.config.southbound_timeout,
        ) => outcome,
    };
    *handle.last_audit.lock().await = Some(outcome);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use vtnc_southbound::{EntityPath, SimFabric};

    const WAIT: Duration = Duration::from_secs(120);

    fn url() -> Url {
        "http://192.168.10.1:8080/".parse().unwrap()
    }

    fn coordinator(fabric: &Arc<SimFabric>) -> Coordinator {
        Coordinator::new(
            CoordinatorConfig::default(),
            Arc::clone(fabric) as Arc<dyn SouthboundClient>,
        )
        .unwrap()
    }

    fn bridge_path() -> EntityPath {
        EntityPath::VNode {
            tenant: "t1".into(),
            node: "br1".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn controller_earns_up_and_records_history() {
        let fabric = Arc::new(SimFabric::new());
        fabric.attach(url());
        let coord = coordinator(&fabric);

        coord.add_controller("c1", url()).await.unwrap();
        assert_eq!(
            coord.controller_state("c1").unwrap(),
            ControllerState::Unknown
        );

        coord
            .wait_until_state("c1", ControllerState::Up, WAIT)
            .await
            .unwrap();

        let history = coord.state_history("c1").await.unwrap();
        let states: Vec<ControllerState> = history.iter().map(|t| t.state).collect();
        assert_eq!(states, vec![ControllerState::Unknown, ControllerState::Up]);
        // Edge-triggered: no two consecutive identical states.
        for pair in states.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_and_unknown_controllers_error() {
        let fabric = Arc::new(SimFabric::new());
        let coord = coordinator(&fabric);

        coord.add_controller("c1", url()).await.unwrap();
        assert!(matches!(
            coord.add_controller("c1", url()).await,
            Err(CoreError::Conflict { .. })
        ));
        assert!(matches!(
            coord.controller_state("nope"),
            Err(CoreError::NoSuchController { .. })
        ));
        assert!(matches!(
            coord.remove_controller("nope").await,
            Err(CoreError::NoSuchController { .. })
        ));

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_deliver_immediately_while_up() {
        let fabric = Arc::new(SimFabric::new());
        let sim = fabric.attach(url());
        let coord = coordinator(&fabric);

        coord.add_controller("c1", url()).await.unwrap();
        coord
            .wait_until_state("c1", ControllerState::Up, WAIT)
            .await
            .unwrap();

        coord.create_tenant("t1").unwrap();
        coord.create_bridge("t1", "br1", "c1").await.unwrap();

        assert!(sim.contains(&bridge_path()).await);
        assert!(coord.pending_backlog("c1").await.unwrap().is_empty());
        assert!(coord.validate_intent(&Query::present(bridge_path())).satisfied);
        assert!(
            coord
                .validate_delivered("c1", &Query::present(bridge_path()))
                .await
                .unwrap()
                .satisfied
        );

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_pushes_current_attributes_after_renumbering() {
        use crate::model::FilterAction;
        use vtnc_southbound::Direction;

        let entry_spec = || FilterEntrySpec {
            action: FilterAction::Pass,
            flow_list: None,
        };
        let fabric = Arc::new(SimFabric::new());
        let sim = fabric.attach(url());
        let coord = coordinator(&fabric);

        coord.add_controller("c1", url()).await.unwrap();
        coord
            .wait_until_state("c1", ControllerState::Up, WAIT)
            .await
            .unwrap();

        coord.create_tenant("t1").unwrap();
        coord.create_bridge("t1", "br1", "c1").await.unwrap();
        coord.create_interface("t1", "br1", "if1").await.unwrap();
        coord
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .await
            .unwrap();
        coord
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "e1", entry_spec())
            .await
            .unwrap();

        // A head insert lands in the store, but only the shifted "e1"
        // effect is applied first -- the order two racing callers on
        // the same filter can produce.
        let effects = coord
            .inner
            .store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "e0", entry_spec())
            .unwrap();
        let shifted: Vec<Effect> = effects
            .into_iter()
            .filter(|e| {
                matches!(&e.path, EntityPath::FlowFilterEntry { entry, .. } if entry == "e1")
            })
            .collect();
        coord.apply_effects(shifted).await;

        // The push carried e1's position after the renumbering, not
        // the position it held when its effect was minted.
        let e1 = EntityPath::FlowFilterEntry {
            tenant: "t1".into(),
            node: "br1".into(),
            interface: "if1".into(),
            direction: Direction::In,
            entry: "e1".into(),
        };
        assert_eq!(
            sim.attributes(&e1).await.unwrap()["position"],
            serde_json::json!(1)
        );
        assert!(
            coord
                .inner
                .store
                .delivered_status(&e1, "c1")
                .unwrap()
                .is_confirmed()
        );

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_queue_while_down_and_replay_on_recovery() {
        let fabric = Arc::new(SimFabric::new());
        let coord = coordinator(&fabric);

        // Registered but nothing attached at the address: never UP.
        coord.add_controller("c1", url()).await.unwrap();
        coord.create_tenant("t1").unwrap();
        coord.create_bridge("t1", "br1", "c1").await.unwrap();

        let backlog = coord.pending_backlog("c1").await.unwrap();
        assert_eq!(backlog.len(), 2);
        assert!(backlog.iter().all(|e| e.op == PendingOp::Create));

        // Intent is visible even though nothing was delivered.
        assert!(coord.validate_intent(&Query::present(bridge_path())).satisfied);
        assert!(matches!(
            coord
                .validate_delivered("c1", &Query::present(bridge_path()))
                .await,
            Err(CoreError::ValidationUnavailable { .. })
        ));

        // Bring the controller up; the recovery audit replays the
        // backlog in hierarchical order.
        let sim = fabric.attach(url());
        coord
            .wait_until_state("c1", ControllerState::Up, WAIT)
            .await
            .unwrap();
        coord.trigger_audit("c1").unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(sim.contains(&bridge_path()).await);
        assert!(coord.pending_backlog("c1").await.unwrap().is_empty());
        assert!(
            coord
                .last_audit("c1")
                .await
                .unwrap()
                .is_some_and(|o| o.is_clean())
        );

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn vnode_creation_requires_known_controller() {
        let fabric = Arc::new(SimFabric::new());
        let coord = coordinator(&fabric);

        coord.create_tenant("t1").unwrap();
        assert!(matches!(
            coord.create_bridge("t1", "br1", "ghost").await,
            Err(CoreError::NoSuchController { .. })
        ));

        coord.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn removed_controller_discards_backlog() {
        let fabric = Arc::new(SimFabric::new());
        let coord = coordinator(&fabric);

        coord.add_controller("c1", url()).await.unwrap();
        coord.create_tenant("t1").unwrap();
        coord.create_bridge("t1", "br1", "c1").await.unwrap();
        assert_eq!(coord.pending_backlog("c1").await.unwrap().len(), 2);

        coord.remove_controller("c1").await.unwrap();
        assert!(matches!(
            coord.pending_backlog("c1").await,
            Err(CoreError::NoSuchController { .. })
        ));

        coord.shutdown().await;
    }
}
