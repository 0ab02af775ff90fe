// ── Hierarchical entity addressing ──
//
// Every controller-bound object is identified by its position in the
// tenant tree. Paths cross the southbound boundary verbatim, so both
// sides agree on object identity without sharing storage.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Direction ───────────────────────────────────────────────────────

/// Traffic direction a flow filter is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── EntityPath ──────────────────────────────────────────────────────

/// Canonical address of a logical tenant-network object.
///
/// The variants mirror the containment hierarchy: tenant at the root,
/// bridges/terminals (`VNode`) and flow lists below it, then interfaces,
/// port maps, flow filters and their entries. `parent()` walks one level
/// up, which is what both the store cascade and the simulated controller
/// use to enforce that a child never exists without its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityPath {
    Tenant {
        tenant: String,
    },
    /// A bridge or terminal. Both kinds share a namespace within the
    /// tenant, so the path does not need to distinguish them.
    VNode {
        tenant: String,
        node: String,
    },
    Interface {
        tenant: String,
        node: String,
        name: String,
    },
    PortMap {
        tenant: String,
        node: String,
        interface: String,
    },
    FlowList {
        tenant: String,
        list: String,
    },
    FlowListEntry {
        tenant: String,
        list: String,
        seq: u32,
    },
    FlowFilter {
        tenant: String,
        node: String,
        interface: String,
        direction: Direction,
    },
    FlowFilterEntry {
        tenant: String,
        node: String,
        interface: String,
        direction: Direction,
        entry: String,
    },
}

impl EntityPath {
    /// The tenant this object belongs to.
    pub fn tenant(&self) -> &str {
        match self {
            Self::Tenant { tenant }
            | Self::VNode { tenant, .. }
            | Self::Interface { tenant, .. }
            | Self::PortMap { tenant, .. }
            | Self::FlowList { tenant, .. }
            | Self::FlowListEntry { tenant, .. }
            | Self::FlowFilter { tenant, .. }
            | Self::FlowFilterEntry { tenant, .. } => tenant,
        }
    }

    /// The immediate parent path, or `None` for a tenant root.
    pub fn parent(&self) -> Option<EntityPath> {
        match self {
            Self::Tenant { .. } => None,
            Self::VNode { tenant, .. } | Self::FlowList { tenant, .. } => Some(Self::Tenant {
                tenant: tenant.clone(),
            }),
            Self::Interface { tenant, node, .. } => Some(Self::VNode {
                tenant: tenant.clone(),
                node: node.clone(),
            }),
            Self::PortMap {
                tenant,
                node,
                interface,
            } => Some(Self::Interface {
                tenant: tenant.clone(),
                node: node.clone(),
                name: interface.clone(),
            }),
            Self::FlowListEntry { tenant, list, .. } => Some(Self::FlowList {
                tenant: tenant.clone(),
                list: list.clone(),
            }),
            Self::FlowFilter {
                tenant,
                node,
                interface,
                ..
            } => Some(Self::Interface {
                tenant: tenant.clone(),
                node: node.clone(),
                name: interface.clone(),
            }),
            Self::FlowFilterEntry {
                tenant,
                node,
                interface,
                direction,
                ..
            } => Some(Self::FlowFilter {
                tenant: tenant.clone(),
                node: node.clone(),
                interface: interface.clone(),
                direction: *direction,
            }),
        }
    }

    /// Nesting depth: 1 for a tenant, one more per containment level.
    /// Deletions are replayed deepest-first so children go before parents.
    pub fn depth(&self) -> usize {
        match self {
            Self::Tenant { .. } => 1,
            Self::VNode { .. } | Self::FlowList { .. } => 2,
            Self::Interface { .. } | Self::FlowListEntry { .. } => 3,
            Self::PortMap { .. } | Self::FlowFilter { .. } => 4,
            Self::FlowFilterEntry { .. } => 5,
        }
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant { tenant } => write!(f, "vtn:{tenant}"),
            Self::VNode { tenant, node } => write!(f, "vtn:{tenant}/vnode:{node}"),
            Self::Interface { tenant, node, name } => {
                write!(f, "vtn:{tenant}/vnode:{node}/if:{name}")
            }
            Self::PortMap {
                tenant,
                node,
                interface,
            } => write!(f, "vtn:{tenant}/vnode:{node}/if:{interface}/portmap"),
            Self::FlowList { tenant, list } => write!(f, "vtn:{tenant}/flowlist:{list}"),
            Self::FlowListEntry { tenant, list, seq } => {
                write!(f, "vtn:{tenant}/flowlist:{list}/seq:{seq}")
            }
            Self::FlowFilter {
                tenant,
                node,
                interface,
                direction,
            } => write!(
                f,
                "vtn:{tenant}/vnode:{node}/if:{interface}/flowfilter:{direction}"
            ),
            Self::FlowFilterEntry {
                tenant,
                node,
                interface,
                direction,
                entry,
            } => write!(
                f,
                "vtn:{tenant}/vnode:{node}/if:{interface}/flowfilter:{direction}/entry:{entry}"
            ),
        }
    }
}
