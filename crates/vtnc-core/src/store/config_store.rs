// ── ConfigStore ──
//
// Transactional storage of logical intent. The tenant table is a
// `DashMap`, so mutations on one tenant serialize against each other
// (position shifts on a filter are atomic w.r.t. concurrent inserts on
// the same filter) while independent tenants proceed concurrently.
//
// Mutations return the `Effect`s they imply for controllers; the
// coordinator decides per effect whether to push immediately (owner UP)
// or park it in the backlog. Deletion is immediate and unconditional
// here -- an entity leaves the store the instant its delete is
// accepted, and only the controller-side removal may be deferred.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::{
    DeliveryStatus, FilterEntrySpec, FlowFilter, FlowFilterEntry, FlowList, FlowListEntry,
    FlowMatch, Interface, PortMapSpec, Tenant, VNode, VNodeKind,
};
use crate::store::ordered_index::IndexError;
use crate::store::pending::PendingOp;
use vtnc_southbound::{Direction, EntityPath};

// ── Effects ─────────────────────────────────────────────────────────

/// A controller-bound consequence of a store mutation. Carries no
/// attribute document: delivery reads [`ConfigStore::current_payload`]
/// at push time, so a later mutation on the same entity can never be
/// undone by an effect that was minted before it.
#[derive(Debug, Clone)]
pub struct Effect {
    /// Name of the controller that owes this mutation.
    pub controller: String,
    pub op: PendingOp,
    pub path: EntityPath,
}

// ── Path constructors ───────────────────────────────────────────────

fn p_tenant(tenant: &str) -> EntityPath {
    EntityPath::Tenant {
        tenant: tenant.into(),
    }
}

fn p_node(tenant: &str, node: &str) -> EntityPath {
    EntityPath::VNode {
        tenant: tenant.into(),
        node: node.into(),
    }
}

fn p_iface(tenant: &str, node: &str, name: &str) -> EntityPath {
    EntityPath::Interface {
        tenant: tenant.into(),
        node: node.into(),
        name: name.into(),
    }
}

fn p_pmap(tenant: &str, node: &str, interface: &str) -> EntityPath {
    EntityPath::PortMap {
        tenant: tenant.into(),
        node: node.into(),
        interface: interface.into(),
    }
}

fn p_flist(tenant: &str, list: &str) -> EntityPath {
    EntityPath::FlowList {
        tenant: tenant.into(),
        list: list.into(),
    }
}

fn p_fl_entry(tenant: &str, list: &str, seq: u32) -> EntityPath {
    EntityPath::FlowListEntry {
        tenant: tenant.into(),
        list: list.into(),
        seq,
    }
}

fn p_filter(tenant: &str, node: &str, interface: &str, direction: Direction) -> EntityPath {
    EntityPath::FlowFilter {
        tenant: tenant.into(),
        node: node.into(),
        interface: interface.into(),
        direction,
    }
}

fn p_ff_entry(
    tenant: &str,
    node: &str,
    interface: &str,
    direction: Direction,
    entry: &str,
) -> EntityPath {
    EntityPath::FlowFilterEntry {
        tenant: tenant.into(),
        node: node.into(),
        interface: interface.into(),
        direction,
        entry: entry.into(),
    }
}

fn create_effect(controller: &str, path: EntityPath) -> Effect {
    Effect {
        controller: controller.to_owned(),
        op: PendingOp::Create,
        path,
    }
}

fn delete_effect(controller: &str, path: EntityPath) -> Effect {
    Effect {
        controller: controller.to_owned(),
        op: PendingOp::Delete,
        path,
    }
}

/// Deepest paths first, stable so creation order breaks ties.
fn sort_deletes(effects: &mut [Effect]) {
    effects.sort_by_key(|e| std::cmp::Reverse(e.path.depth()));
}

// ── EntityView ──────────────────────────────────────────────────────

/// Read-only summary of one stored entity, used by validation.
#[derive(Debug, Clone)]
pub(crate) struct EntityView {
    /// Owning controller; `None` for a tenant (bound per controller).
    pub controller: Option<String>,
    /// Delivery status; `None` for a tenant (tracked per controller).
    pub status: Option<DeliveryStatus>,
    /// Current dense position, for flow filter entries.
    pub position: Option<usize>,
}

// ── ConfigStore ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ConfigStore {
    tenants: DashMap<String, Tenant>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Tenant ──────────────────────────────────────────────────

    pub fn create_tenant(&self, name: &str) -> Result<(), CoreError> {
        match self.tenants.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(CoreError::conflict(p_tenant(name))),
            Entry::Vacant(slot) => {
                slot.insert(Tenant::new(name));
                Ok(())
            }
        }
    }

    /// Remove a tenant and everything under it. Absent tenants are a
    /// no-op. Returned effects are deepest-first.
    pub fn delete_tenant(&self, name: &str) -> Vec<Effect> {
        let Some((_, tenant)) = self.tenants.remove(name) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        for node in tenant.nodes.values() {
            node_delete_effects(&tenant.name, node, &mut effects);
        }
        for list in tenant.flow_lists.values() {
            list_delete_effects(&tenant.name, list, &mut effects);
        }
        for controller in tenant.delivery.keys() {
            effects.push(delete_effect(controller, p_tenant(&tenant.name)));
        }
        sort_deletes(&mut effects);
        effects
    }

    // ── Bridge / terminal ───────────────────────────────────────

    pub fn create_node(
        &self,
        tenant: &str,
        name: &str,
        kind: VNodeKind,
        controller: &str,
    ) -> Result<Vec<Effect>, CoreError> {
        let mut t = self
            .tenants
            .get_mut(tenant)
            .ok_or_else(|| CoreError::not_found(p_tenant(tenant)))?;
        if t.nodes.contains_key(name) {
            return Err(CoreError::conflict(p_node(tenant, name)));
        }

        let mut effects = Vec::new();
        materialize_tenant(&mut t, controller, &mut effects);

        let node = VNode::new(name, kind, controller);
        effects.push(create_effect(controller, p_node(tenant, name)));
        t.nodes.insert(name.to_owned(), node);
        Ok(effects)
    }

    pub fn delete_node(&self, tenant: &str, name: &str) -> Vec<Effect> {
        let Some(mut t) = self.tenants.get_mut(tenant) else {
            return Vec::new();
        };
        let Some(node) = t.nodes.shift_remove(name) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        node_delete_effects(tenant, &node, &mut effects);
        sort_deletes(&mut effects);
        effects
    }

    // ── Interface / port map ────────────────────────────────────

    pub fn create_interface(
        &self,
        tenant: &str,
        node: &str,
        name: &str,
    ) -> Result<Vec<Effect>, CoreError> {
        let mut t = self
            .tenants
            .get_mut(tenant)
            .ok_or_else(|| CoreError::not_found(p_tenant(tenant)))?;
        let n = t
            .nodes
            .get_mut(node)
            .ok_or_else(|| CoreError::not_found(p_node(tenant, node)))?;
        if n.interfaces.contains_key(name) {
            return Err(CoreError::conflict(p_iface(tenant, node, name)));
        }

        let controller = n.controller.clone();
        let iface = Interface::new(name);
        let effect = create_effect(&controller, p_iface(tenant, node, name));
        n.interfaces.insert(name.to_owned(), iface);
        Ok(vec![effect])
    }

    pub fn delete_interface(&self, tenant: &str, node: &str, name: &str) -> Vec<Effect> {
        let Some(mut t) = self.tenants.get_mut(tenant) else {
            return Vec::new();
        };
        let Some(n) = t.nodes.get_mut(node) else {
            return Vec::new();
        };
        let controller = n.controller.clone();
        let Some(iface) = n.interfaces.shift_remove(name) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        iface_delete_effects(tenant, node, &controller, &iface, &mut effects);
        sort_deletes(&mut effects);
        effects
    }

    /// Install or replace the port map on an interface.
    pub fn set_port_map(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        spec: PortMapSpec,
    ) -> Result<Vec<Effect>, CoreError> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            iface.port_map = Some(spec.into());
            vec![create_effect(controller, p_pmap(tenant, node, interface))]
        })
    }

    pub fn delete_port_map(&self, tenant: &str, node: &str, interface: &str) -> Vec<Effect> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            if iface.port_map.take().is_some() {
                vec![delete_effect(controller, p_pmap(tenant, node, interface))]
            } else {
                Vec::new()
            }
        })
        .unwrap_or_default()
    }

    // ── Flow lists ──────────────────────────────────────────────

    pub fn create_flow_list(
        &self,
        tenant: &str,
        name: &str,
        controller: &str,
    ) -> Result<Vec<Effect>, CoreError> {
        let mut t = self
            .tenants
            .get_mut(tenant)
            .ok_or_else(|| CoreError::not_found(p_tenant(tenant)))?;
        if t.flow_lists.contains_key(name) {
            return Err(CoreError::conflict(p_flist(tenant, name)));
        }

        let mut effects = Vec::new();
        materialize_tenant(&mut t, controller, &mut effects);

        let list = FlowList::new(name, controller);
        effects.push(create_effect(controller, p_flist(tenant, name)));
        t.flow_lists.insert(name.to_owned(), list);
        Ok(effects)
    }

    pub fn delete_flow_list(&self, tenant: &str, name: &str) -> Vec<Effect> {
        let Some(mut t) = self.tenants.get_mut(tenant) else {
            return Vec::new();
        };
        let Some(list) = t.flow_lists.shift_remove(name) else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        list_delete_effects(tenant, &list, &mut effects);
        sort_deletes(&mut effects);
        effects
    }

    pub fn create_flow_list_entry(
        &self,
        tenant: &str,
        list: &str,
        seq: u32,
        matches: FlowMatch,
    ) -> Result<Vec<Effect>, CoreError> {
        let mut t = self
            .tenants
            .get_mut(tenant)
            .ok_or_else(|| CoreError::not_found(p_tenant(tenant)))?;
        let l = t
            .flow_lists
            .get_mut(list)
            .ok_or_else(|| CoreError::not_found(p_flist(tenant, list)))?;
        if l.entries.contains_key(&seq) {
            return Err(CoreError::conflict(p_fl_entry(tenant, list, seq)));
        }

        let controller = l.controller.clone();
        let entry = FlowListEntry {
            seq,
            matches,
            delivery: DeliveryStatus::PendingCreate,
        };
        let effect = create_effect(&controller, p_fl_entry(tenant, list, seq));
        l.entries.insert(seq, entry);
        Ok(vec![effect])
    }

    pub fn delete_flow_list_entry(&self, tenant: &str, list: &str, seq: u32) -> Vec<Effect> {
        let Some(mut t) = self.tenants.get_mut(tenant) else {
            return Vec::new();
        };
        let Some(l) = t.flow_lists.get_mut(list) else {
            return Vec::new();
        };
        let controller = l.controller.clone();
        if l.entries.remove(&seq).is_some() {
            vec![delete_effect(&controller, p_fl_entry(tenant, list, seq))]
        } else {
            Vec::new()
        }
    }

    // ── Flow filters ────────────────────────────────────────────

    pub fn create_flow_filter(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: Direction,
    ) -> Result<Vec<Effect>, CoreError> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            let slot = iface.filter_slot(direction);
            if slot.is_some() {
                return Err(CoreError::conflict(p_filter(tenant, node, interface, direction)));
            }
            *slot = Some(FlowFilter::new(direction));
            Ok(vec![create_effect(
                controller,
                p_filter(tenant, node, interface, direction),
            )])
        })?
    }

    pub fn delete_flow_filter(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: Direction,
    ) -> Vec<Effect> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            let Some(filter) = iface.filter_slot(direction).take() else {
                return Vec::new();
            };
            let mut effects = Vec::new();
            filter_delete_effects(tenant, node, controller, interface, &filter, &mut effects);
            sort_deletes(&mut effects);
            effects
        })
        .unwrap_or_default()
    }

    /// Insert a filter entry at `position`, shifting entries at or
    /// above it up by one. Every entry whose position changed is
    /// re-marked pending so its new position reaches the controller.
    pub fn insert_filter_entry(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: Direction,
        position: usize,
        name: &str,
        spec: FilterEntrySpec,
    ) -> Result<Vec<Effect>, CoreError> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            let filter = iface
                .filter_mut(direction)
                .ok_or_else(|| CoreError::not_found(p_filter(tenant, node, interface, direction)))?;

            let entry = FlowFilterEntry {
                name: name.to_owned(),
                action: spec.action,
                flow_list: spec.flow_list,
                delivery: DeliveryStatus::PendingCreate,
            };
            filter.entries.insert_at(position, entry).map_err(|e| match e {
                IndexError::DuplicateKey(key) => {
                    CoreError::conflict(p_ff_entry(tenant, node, interface, direction, &key))
                }
                IndexError::OutOfRange { position, len } => {
                    CoreError::OrderingViolation { position, len }
                }
            })?;

            let mut effects = Vec::new();
            for (pos, e) in filter.entries.iter_mut() {
                if pos >= position {
                    e.delivery = DeliveryStatus::PendingCreate;
                    effects.push(create_effect(
                        controller,
                        p_ff_entry(tenant, node, interface, direction, &e.name),
                    ));
                }
            }
            Ok(effects)
        })?
    }

    /// Remove a filter entry by name, shifting later entries down.
    /// Absent entries are a no-op.
    pub fn remove_filter_entry(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        direction: Direction,
        name: &str,
    ) -> Vec<Effect> {
        self.with_interface_mut(tenant, node, interface, |controller, iface| {
            let Some(filter) = iface.filter_mut(direction) else {
                return Vec::new();
            };
            let Some((vacated, _)) = filter.entries.remove(name) else {
                return Vec::new();
            };

            let mut effects = vec![delete_effect(
                controller,
                p_ff_entry(tenant, node, interface, direction, name),
            )];
            for (pos, e) in filter.entries.iter_mut() {
                if pos >= vacated {
                    e.delivery = DeliveryStatus::PendingCreate;
                    effects.push(create_effect(
                        controller,
                        p_ff_entry(tenant, node, interface, direction, &e.name),
                    ));
                }
            }
            effects
        })
        .unwrap_or_default()
    }

    // ── Delivery bookkeeping ────────────────────────────────────

    /// Record that `path` now matches at `controller`. No-op if the
    /// entity vanished in the meantime (a delete raced the push).
    pub fn mark_confirmed(&self, controller: &str, path: &EntityPath) {
        self.confirm(controller, path, None);
    }

    /// Like [`Self::mark_confirmed`], but only when the entity's
    /// current attributes still equal `pushed`. `false` means a later
    /// mutation superseded the pushed document; the entity stays
    /// pending and its own effect carries the newer attributes.
    pub fn confirm_if_current(
        &self,
        controller: &str,
        path: &EntityPath,
        pushed: &Value,
    ) -> bool {
        self.confirm(controller, path, Some(pushed))
    }

    /// Attribute check and status stamp under one tenant lock, so a
    /// mutation can never slip between them.
    fn confirm(&self, controller: &str, path: &EntityPath, expect: Option<&Value>) -> bool {
        let Some(mut t) = self.tenants.get_mut(path.tenant()) else {
            return false;
        };
        match path {
            EntityPath::Tenant { .. } => {
                if expect.is_some_and(|v| *v != t.attributes()) {
                    return false;
                }
                match t.delivery.get_mut(controller) {
                    Some(status) => {
                        *status = DeliveryStatus::Confirmed;
                        true
                    }
                    None => false,
                }
            }
            EntityPath::VNode { node, .. } => {
                let Some(n) = t.nodes.get_mut(node) else {
                    return false;
                };
                if expect.is_some_and(|v| *v != n.attributes()) {
                    return false;
                }
                n.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::Interface { node, name, .. } => {
                let Some(i) = t.nodes.get_mut(node).and_then(|n| n.interfaces.get_mut(name))
                else {
                    return false;
                };
                if expect.is_some_and(|v| *v != i.attributes()) {
                    return false;
                }
                i.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::PortMap {
                node, interface, ..
            } => {
                let Some(p) = t
                    .nodes
                    .get_mut(node)
                    .and_then(|n| n.interfaces.get_mut(interface))
                    .and_then(|i| i.port_map.as_mut())
                else {
                    return false;
                };
                if expect.is_some_and(|v| *v != p.attributes()) {
                    return false;
                }
                p.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::FlowList { list, .. } => {
                let Some(l) = t.flow_lists.get_mut(list) else {
                    return false;
                };
                if expect.is_some_and(|v| *v != l.attributes()) {
                    return false;
                }
                l.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::FlowListEntry { list, seq, .. } => {
                let Some(e) = t
                    .flow_lists
                    .get_mut(list)
                    .and_then(|l| l.entries.get_mut(seq))
                else {
                    return false;
                };
                if expect.is_some_and(|v| *v != e.attributes()) {
                    return false;
                }
                e.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::FlowFilter {
                node,
                interface,
                direction,
                ..
            } => {
                let Some(f) = t
                    .nodes
                    .get_mut(node)
                    .and_then(|n| n.interfaces.get_mut(interface))
                    .and_then(|i| i.filter_mut(*direction))
                else {
                    return false;
                };
                if expect.is_some_and(|v| *v != f.attributes()) {
                    return false;
                }
                f.delivery = DeliveryStatus::Confirmed;
                true
            }
            EntityPath::FlowFilterEntry {
                node,
                interface,
                direction,
                entry,
                ..
            } => {
                let Some((position, e)) = t
                    .nodes
                    .get_mut(node)
                    .and_then(|n| n.interfaces.get_mut(interface))
                    .and_then(|i| i.filter_mut(*direction))
                    .and_then(|f| f.entries.get_mut(entry))
                else {
                    return false;
                };
                if expect.is_some_and(|v| *v != e.attributes(position)) {
                    return false;
                }
                e.delivery = DeliveryStatus::Confirmed;
                true
            }
        }
    }

    // ── Read side ───────────────────────────────────────────────

    pub fn exists(&self, path: &EntityPath) -> bool {
        self.view(path).is_some()
    }

    /// Delivery status of `path` as owed to `controller`, or `None`
    /// when the entity does not exist or belongs to another controller.
    pub fn delivered_status(&self, path: &EntityPath, controller: &str) -> Option<DeliveryStatus> {
        if let EntityPath::Tenant { tenant } = path {
            return self.tenants.get(tenant)?.delivery.get(controller).copied();
        }
        let view = self.view(path)?;
        (view.controller.as_deref() == Some(controller))
            .then_some(view.status)
            .flatten()
    }

    /// Current dense position of a flow filter entry.
    pub fn position_of(&self, path: &EntityPath) -> Option<usize> {
        self.view(path)?.position
    }

    /// The attribute document `path` should carry on the wire right
    /// now, or `None` once the entity is gone. Every push reads this
    /// instead of a document captured at mutation time, so renumbering
    /// or rewriting an entity invalidates any in-flight stale copy.
    pub fn current_payload(&self, path: &EntityPath) -> Option<Value> {
        let t = self.tenants.get(path.tenant())?;
        match path {
            EntityPath::Tenant { .. } => Some(t.attributes()),
            EntityPath::VNode { node, .. } => Some(t.nodes.get(node)?.attributes()),
            EntityPath::Interface { node, name, .. } => {
                Some(t.nodes.get(node)?.interfaces.get(name)?.attributes())
            }
            EntityPath::PortMap {
                node, interface, ..
            } => Some(
                t.nodes
                    .get(node)?
                    .interfaces
                    .get(interface)?
                    .port_map
                    .as_ref()?
                    .attributes(),
            ),
            EntityPath::FlowList { list, .. } => Some(t.flow_lists.get(list)?.attributes()),
            EntityPath::FlowListEntry { list, seq, .. } => {
                Some(t.flow_lists.get(list)?.entries.get(seq)?.attributes())
            }
            EntityPath::FlowFilter {
                node,
                interface,
                direction,
                ..
            } => Some(
                t.nodes
                    .get(node)?
                    .interfaces
                    .get(interface)?
                    .filter(*direction)?
                    .attributes(),
            ),
            EntityPath::FlowFilterEntry {
                node,
                interface,
                direction,
                entry,
                ..
            } => {
                let f = t
                    .nodes
                    .get(node)?
                    .interfaces
                    .get(interface)?
                    .filter(*direction)?;
                let (position, e) = f.entries.get(entry)?;
                Some(e.attributes(position))
            }
        }
    }

    /// Whether the parent of `path` is already confirmed at
    /// `controller`. Roots have no parent and always pass.
    pub fn parent_confirmed(&self, controller: &str, path: &EntityPath) -> bool {
        match path.parent() {
            None => true,
            Some(parent) => self
                .delivered_status(&parent, controller)
                .is_some_and(DeliveryStatus::is_confirmed),
        }
    }

    pub(crate) fn is_pending_create(&self, controller: &str, path: &EntityPath) -> bool {
        self.delivered_status(path, controller)
            .is_some_and(DeliveryStatus::is_pending)
    }

    pub(crate) fn view(&self, path: &EntityPath) -> Option<EntityView> {
        let t = self.tenants.get(path.tenant())?;
        let simple = |controller: &str, status: DeliveryStatus| EntityView {
            controller: Some(controller.to_owned()),
            status: Some(status),
            position: None,
        };

        match path {
            EntityPath::Tenant { .. } => Some(EntityView {
                controller: None,
                status: None,
                position: None,
            }),
            EntityPath::VNode { node, .. } => {
                let n = t.nodes.get(node)?;
                Some(simple(&n.controller, n.delivery))
            }
            EntityPath::Interface { node, name, .. } => {
                let n = t.nodes.get(node)?;
                let i = n.interfaces.get(name)?;
                Some(simple(&n.controller, i.delivery))
            }
            EntityPath::PortMap {
                node, interface, ..
            } => {
                let n = t.nodes.get(node)?;
                let p = n.interfaces.get(interface)?.port_map.as_ref()?;
                Some(simple(&n.controller, p.delivery))
            }
            EntityPath::FlowList { list, .. } => {
                let l = t.flow_lists.get(list)?;
                Some(simple(&l.controller, l.delivery))
            }
            EntityPath::FlowListEntry { list, seq, .. } => {
                let l = t.flow_lists.get(list)?;
                let e = l.entries.get(seq)?;
                Some(simple(&l.controller, e.delivery))
            }
            EntityPath::FlowFilter {
                node,
                interface,
                direction,
                ..
            } => {
                let n = t.nodes.get(node)?;
                let f = n.interfaces.get(interface)?.filter(*direction)?;
                Some(simple(&n.controller, f.delivery))
            }
            EntityPath::FlowFilterEntry {
                node,
                interface,
                direction,
                entry,
                ..
            } => {
                let n = t.nodes.get(node)?;
                let f = n.interfaces.get(interface)?.filter(*direction)?;
                let (position, e) = f.entries.get(entry)?;
                Some(EntityView {
                    controller: Some(n.controller.clone()),
                    status: Some(e.delivery),
                    position: Some(position),
                })
            }
        }
    }

    /// Everything `controller` should hold, in strict hierarchical +
    /// creation order: tenant, flow lists (and entries, ascending
    /// sequence), then nodes, interfaces, port maps, filters, and
    /// filter entries in ascending position. Pushing in this order
    /// guarantees every object's dependencies already exist. Payloads
    /// come from [`Self::current_payload`] per step, not from here.
    pub fn audit_plan(&self, controller: &str) -> Vec<EntityPath> {
        let mut plan = Vec::new();

        for t in &self.tenants {
            let tenant = t.value();
            if !tenant.delivery.contains_key(controller) {
                continue;
            }
            plan.push(p_tenant(&tenant.name));

            for list in tenant.flow_lists.values() {
                if list.controller != controller {
                    continue;
                }
                plan.push(p_flist(&tenant.name, &list.name));
                for entry in list.entries.values() {
                    plan.push(p_fl_entry(&tenant.name, &list.name, entry.seq));
                }
            }

            for node in tenant.nodes.values() {
                if node.controller != controller {
                    continue;
                }
                plan.push(p_node(&tenant.name, &node.name));

                for iface in node.interfaces.values() {
                    plan.push(p_iface(&tenant.name, &node.name, &iface.name));
                    if iface.port_map.is_some() {
                        plan.push(p_pmap(&tenant.name, &node.name, &iface.name));
                    }
                    for direction in [Direction::In, Direction::Out] {
                        let Some(filter) = iface.filter(direction) else {
                            continue;
                        };
                        plan.push(p_filter(&tenant.name, &node.name, &iface.name, direction));
                        for (_, entry) in filter.entries.iter() {
                            plan.push(p_ff_entry(
                                &tenant.name,
                                &node.name,
                                &iface.name,
                                direction,
                                &entry.name,
                            ));
                        }
                    }
                }
            }
        }

        plan
    }

    // ── Private helpers ─────────────────────────────────────────

    fn with_interface_mut<R>(
        &self,
        tenant: &str,
        node: &str,
        interface: &str,
        f: impl FnOnce(&str, &mut Interface) -> R,
    ) -> Result<R, CoreError> {
        let mut t = self
            .tenants
            .get_mut(tenant)
            .ok_or_else(|| CoreError::not_found(p_tenant(tenant)))?;
        let n = t
            .nodes
            .get_mut(node)
            .ok_or_else(|| CoreError::not_found(p_node(tenant, node)))?;
        let controller = n.controller.clone();
        let i = n
            .interfaces
            .get_mut(interface)
            .ok_or_else(|| CoreError::not_found(p_iface(tenant, node, interface)))?;
        Ok(f(&controller, i))
    }
}

/// First binding of a tenant to a controller: the tenant object itself
/// must reach that controller before any child does.
fn materialize_tenant(tenant: &mut Tenant, controller: &str, effects: &mut Vec<Effect>) {
    if !tenant.delivery.contains_key(controller) {
        tenant
            .delivery
            .insert(controller.to_owned(), DeliveryStatus::PendingCreate);
        effects.push(create_effect(controller, p_tenant(&tenant.name)));
    }
}

fn node_delete_effects(tenant: &str, node: &VNode, effects: &mut Vec<Effect>) {
    for iface in node.interfaces.values() {
        iface_delete_effects(tenant, &node.name, &node.controller, iface, effects);
    }
    effects.push(delete_effect(&node.controller, p_node(tenant, &node.name)));
}

fn iface_delete_effects(
    tenant: &str,
    node: &str,
    controller: &str,
    iface: &Interface,
    effects: &mut Vec<Effect>,
) {
    for direction in [Direction::In, Direction::Out] {
        if let Some(filter) = iface.filter(direction) {
            filter_delete_effects(tenant, node, controller, &iface.name, filter, effects);
        }
    }
    if iface.port_map.is_some() {
        effects.push(delete_effect(controller, p_pmap(tenant, node, &iface.name)));
    }
    effects.push(delete_effect(controller, p_iface(tenant, node, &iface.name)));
}

fn filter_delete_effects(
    tenant: &str,
    node: &str,
    controller: &str,
    interface: &str,
    filter: &FlowFilter,
    effects: &mut Vec<Effect>,
) {
    for (_, entry) in filter.entries.iter() {
        effects.push(delete_effect(
            controller,
            p_ff_entry(tenant, node, interface, filter.direction, &entry.name),
        ));
    }
    effects.push(delete_effect(
        controller,
        p_filter(tenant, node, interface, filter.direction),
    ));
}

fn list_delete_effects(tenant: &str, list: &FlowList, effects: &mut Vec<Effect>) {
    for entry in list.entries.values() {
        effects.push(delete_effect(
            &list.controller,
            p_fl_entry(tenant, &list.name, entry.seq),
        ));
    }
    effects.push(delete_effect(&list.controller, p_flist(tenant, &list.name)));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::FilterAction;
    use pretty_assertions::assert_eq;

    const CTRL: &str = "c1";

    fn store_with_iface() -> ConfigStore {
        let store = ConfigStore::new();
        store.create_tenant("t1").unwrap();
        store
            .create_node("t1", "br1", VNodeKind::Bridge, CTRL)
            .unwrap();
        store.create_interface("t1", "br1", "if1").unwrap();
        store
    }

    fn spec(action: FilterAction) -> FilterEntrySpec {
        FilterEntrySpec {
            action,
            flow_list: None,
        }
    }

    #[test]
    fn duplicate_tenant_is_conflict() {
        let store = ConfigStore::new();
        store.create_tenant("t1").unwrap();
        assert!(matches!(
            store.create_tenant("t1"),
            Err(CoreError::Conflict { .. })
        ));
    }

    #[test]
    fn first_node_materializes_tenant_at_controller() {
        let store = ConfigStore::new();
        store.create_tenant("t1").unwrap();

        let effects = store
            .create_node("t1", "br1", VNodeKind::Bridge, CTRL)
            .unwrap();
        let paths: Vec<String> = effects.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["vtn:t1", "vtn:t1/vnode:br1"]);

        // Second node on the same controller: tenant already bound.
        let effects = store
            .create_node("t1", "br2", VNodeKind::Terminal, CTRL)
            .unwrap();
        assert_eq!(effects.len(), 1);

        // A node on a different controller binds the tenant again.
        let effects = store
            .create_node("t1", "br3", VNodeKind::Bridge, "c2")
            .unwrap();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].controller, "c2");
    }

    #[test]
    fn tenant_cascade_is_deepest_first() {
        let store = store_with_iface();
        store
            .set_port_map(
                "t1",
                "br1",
                "if1",
                PortMapSpec {
                    logical_port: "PP-0000-01".into(),
                    vlan: Some(100),
                },
            )
            .unwrap();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();
        store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "e1", spec(FilterAction::Pass))
            .unwrap();

        let effects = store.delete_tenant("t1");
        assert!(effects.iter().all(|e| e.op == PendingOp::Delete));

        let depths: Vec<usize> = effects.iter().map(|e| e.path.depth()).collect();
        let mut sorted = depths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(depths, sorted, "cascade must delete children first");

        // Tenant root goes last, and the store is empty afterwards.
        assert_eq!(effects.last().unwrap().path.to_string(), "vtn:t1");
        assert!(!store.exists(&p_tenant("t1")));

        // Idempotent: deleting again is a silent no-op.
        assert!(store.delete_tenant("t1").is_empty());
    }

    #[test]
    fn filter_entry_insert_renumbers_and_remarks() {
        let store = store_with_iface();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();
        store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "a", spec(FilterAction::Pass))
            .unwrap();
        store.mark_confirmed(CTRL, &p_ff_entry("t1", "br1", "if1", Direction::In, "a"));

        // Head insertion shifts "a" to position 1 and re-marks it.
        let effects = store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "b", spec(FilterAction::Drop))
            .unwrap();
        assert_eq!(effects.len(), 2);

        let a = p_ff_entry("t1", "br1", "if1", Direction::In, "a");
        let b = p_ff_entry("t1", "br1", "if1", Direction::In, "b");
        assert_eq!(store.position_of(&b), Some(0));
        assert_eq!(store.position_of(&a), Some(1));
        assert_eq!(
            store.delivered_status(&a, CTRL),
            Some(DeliveryStatus::PendingCreate)
        );
    }

    #[test]
    fn confirm_requires_current_attributes() {
        let store = store_with_iface();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();
        store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "a", spec(FilterAction::Pass))
            .unwrap();

        let a = p_ff_entry("t1", "br1", "if1", Direction::In, "a");
        let minted = store.current_payload(&a).unwrap();

        // Renumbered after the document was read: the stale copy must
        // not confirm, and "a" stays pending.
        store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "b", spec(FilterAction::Drop))
            .unwrap();
        assert!(!store.confirm_if_current(CTRL, &a, &minted));
        assert_eq!(
            store.delivered_status(&a, CTRL),
            Some(DeliveryStatus::PendingCreate)
        );

        // The current document does confirm.
        let fresh = store.current_payload(&a).unwrap();
        assert_eq!(fresh["position"], serde_json::json!(1));
        assert!(store.confirm_if_current(CTRL, &a, &fresh));
        assert!(store.delivered_status(&a, CTRL).unwrap().is_confirmed());

        // Once the entity is gone there is nothing left to push.
        store.remove_filter_entry("t1", "br1", "if1", Direction::In, "a");
        assert!(store.current_payload(&a).is_none());
        assert!(!store.confirm_if_current(CTRL, &a, &fresh));
    }

    #[test]
    fn filter_entry_gap_position_is_rejected() {
        let store = store_with_iface();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();

        let err = store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 2, "a", spec(FilterAction::Pass))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::OrderingViolation { position: 2, len: 0 }
        ));
    }

    #[test]
    fn remove_filter_entry_shifts_down() {
        let store = store_with_iface();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            store
                .insert_filter_entry("t1", "br1", "if1", Direction::In, i, name, spec(FilterAction::Pass))
                .unwrap();
        }

        let effects = store.remove_filter_entry("t1", "br1", "if1", Direction::In, "b");
        // One delete plus one re-create for the shifted "c".
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].op, PendingOp::Delete);
        assert_eq!(
            store.position_of(&p_ff_entry("t1", "br1", "if1", Direction::In, "c")),
            Some(1)
        );

        // Removing it again is a no-op.
        assert!(
            store
                .remove_filter_entry("t1", "br1", "if1", Direction::In, "b")
                .is_empty()
        );
    }

    #[test]
    fn audit_plan_orders_dependencies_first() {
        let store = store_with_iface();
        store.create_flow_list("t1", "fl", CTRL).unwrap();
        store
            .create_flow_list_entry("t1", "fl", 10, FlowMatch::default())
            .unwrap();
        store
            .create_flow_filter("t1", "br1", "if1", Direction::In)
            .unwrap();
        store
            .insert_filter_entry("t1", "br1", "if1", Direction::In, 0, "e1", spec(FilterAction::Pass))
            .unwrap();

        let plan = store.audit_plan(CTRL);
        let paths: Vec<String> = plan.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "vtn:t1",
                "vtn:t1/flowlist:fl",
                "vtn:t1/flowlist:fl/seq:10",
                "vtn:t1/vnode:br1",
                "vtn:t1/vnode:br1/if:if1",
                "vtn:t1/vnode:br1/if:if1/flowfilter:in",
                "vtn:t1/vnode:br1/if:if1/flowfilter:in/entry:e1",
            ]
        );

        // Nothing in the plan for a controller that owns nothing.
        assert!(store.audit_plan("c9").is_empty());
    }

    #[test]
    fn parent_confirmed_tracks_delivery() {
        let store = store_with_iface();
        let iface = p_iface("t1", "br1", "if1");
        assert!(!store.parent_confirmed(CTRL, &iface));

        store.mark_confirmed(CTRL, &p_node("t1", "br1"));
        assert!(store.parent_confirmed(CTRL, &iface));
    }

    #[test]
    fn delivered_status_is_controller_scoped() {
        let store = store_with_iface();
        let node = p_node("t1", "br1");
        assert_eq!(
            store.delivered_status(&node, CTRL),
            Some(DeliveryStatus::PendingCreate)
        );
        assert_eq!(store.delivered_status(&node, "other"), None);
    }
}
