// ── Tenant tree ──
//
// Tenant -> bridge/terminal -> interface -> port map. Child collections
// are `IndexMap` so the audit walks them in creation order, which is
// what guarantees a replayed create never precedes its dependencies.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::delivery::DeliveryStatus;
use super::flow::{FlowFilter, FlowList};
use vtnc_southbound::Direction;

// ── Tenant ──────────────────────────────────────────────────────────

/// Top-level isolated virtual network namespace.
///
/// A tenant is not bound to one controller: it materializes at a
/// controller the first time a node bound to that controller is created
/// under it, tracked per controller in `delivery`.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub name: String,
    /// Controller name -> delivery status of this tenant's object there.
    pub delivery: BTreeMap<String, DeliveryStatus>,
    pub nodes: IndexMap<String, VNode>,
    pub flow_lists: IndexMap<String, FlowList>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delivery: BTreeMap::new(),
            nodes: IndexMap::new(),
            flow_lists: IndexMap::new(),
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "name": self.name })
    }
}

// ── VNode ───────────────────────────────────────────────────────────

/// Whether a node is a virtual L2 switch or an edge termination point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VNodeKind {
    Bridge,
    Terminal,
}

impl VNodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Terminal => "terminal",
        }
    }
}

/// A bridge or terminal within a tenant, bound to exactly one
/// controller. The binding is immutable after creation.
#[derive(Debug, Clone)]
pub struct VNode {
    pub name: String,
    pub kind: VNodeKind,
    pub controller: String,
    pub delivery: DeliveryStatus,
    pub interfaces: IndexMap<String, Interface>,
}

impl VNode {
    pub fn new(name: impl Into<String>, kind: VNodeKind, controller: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            controller: controller.into(),
            delivery: DeliveryStatus::PendingCreate,
            interfaces: IndexMap::new(),
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "name": self.name, "kind": self.kind.as_str() })
    }
}

// ── Interface ───────────────────────────────────────────────────────

/// A logical port on a bridge/terminal. Holds at most one port map and
/// one flow filter per direction.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub delivery: DeliveryStatus,
    pub port_map: Option<PortMap>,
    pub filter_in: Option<FlowFilter>,
    pub filter_out: Option<FlowFilter>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delivery: DeliveryStatus::PendingCreate,
            port_map: None,
            filter_in: None,
            filter_out: None,
        }
    }

    pub fn filter(&self, direction: Direction) -> Option<&FlowFilter> {
        match direction {
            Direction::In => self.filter_in.as_ref(),
            Direction::Out => self.filter_out.as_ref(),
        }
    }

    pub fn filter_mut(&mut self, direction: Direction) -> Option<&mut FlowFilter> {
        self.filter_slot(direction).as_mut()
    }

    /// The owning slot for `direction`, for install/remove.
    pub fn filter_slot(&mut self, direction: Direction) -> &mut Option<FlowFilter> {
        match direction {
            Direction::In => &mut self.filter_in,
            Direction::Out => &mut self.filter_out,
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "name": self.name })
    }
}

// ── PortMap ─────────────────────────────────────────────────────────

/// Binding of an interface to a physical port, optionally VLAN-tagged.
#[derive(Debug, Clone)]
pub struct PortMap {
    pub logical_port: String,
    pub vlan: Option<u16>,
    pub delivery: DeliveryStatus,
}

impl PortMap {
    pub fn attributes(&self) -> Value {
        json!({ "logical_port": self.logical_port, "vlan": self.vlan })
    }
}

/// Caller-supplied port-map parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapSpec {
    pub logical_port: String,
    pub vlan: Option<u16>,
}

impl From<PortMapSpec> for PortMap {
    fn from(spec: PortMapSpec) -> Self {
        Self {
            logical_port: spec.logical_port,
            vlan: spec.vlan,
            delivery: DeliveryStatus::PendingCreate,
        }
    }
}
