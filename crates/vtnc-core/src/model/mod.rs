// ── Domain model ──
//
// Logical tenant-network objects as the coordinator stores them:
// intent plus per-entity delivery status. Wire documents for the
// southbound boundary are derived through the `attributes()` methods,
// never serialized from these structs directly (children and delivery
// bookkeeping stay coordinator-private).

mod delivery;
mod flow;
mod vtn;

pub use delivery::DeliveryStatus;
pub use flow::{
    FilterAction, FilterEntrySpec, FlowFilter, FlowFilterEntry, FlowList, FlowListEntry, FlowMatch,
};
pub use vtn::{Interface, PortMap, PortMapSpec, Tenant, VNode, VNodeKind};
