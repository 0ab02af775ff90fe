//! Controller-state coordination for virtualized tenant networks.
//!
//! The coordinator owns the logical model (tenants, bridges and
//! terminals, interfaces, port maps, flow lists, flow filters), tracks
//! per-controller liveness, and keeps every controller converged with
//! stored intent: mutations are delivered immediately while a
//! controller is UP, parked in a per-controller backlog while it is
//! DOWN, and replayed in dependency order by the audit that runs on
//! recovery.
//!
//! [`Coordinator`] is the entry point; it is driven entirely through a
//! [`SouthboundClient`](vtnc_southbound::SouthboundClient), so tests
//! run against the in-memory fabric in `vtnc-southbound`.

mod audit;
mod config;
mod coordinator;
mod error;
pub mod model;
mod monitor;
mod store;
mod validate;

pub use crate::audit::AuditOutcome;
pub use crate::config::{CoordinatorConfig, LivenessConfig};
pub use crate::coordinator::Coordinator;
pub use crate::error::CoreError;
pub use crate::monitor::{ControllerState, StateTransition};
pub use crate::store::{IndexError, Keyed, OrderedIndex, PendingEntry, PendingOp};
pub use crate::validate::{Query, Verdict};

pub use vtnc_southbound::{Direction, EntityPath};
