// vtnc-southbound: the contract between the coordinator core and physical
// SDN controllers (liveness probe + get/create/update/delete primitives),
// plus an in-memory simulated fabric implementing it.

pub mod client;
pub mod error;
pub mod path;
pub mod sim;

pub use client::{PushOp, SouthboundClient};
pub use error::SouthboundError;
pub use path::{Direction, EntityPath};
pub use sim::{SimController, SimFabric};
