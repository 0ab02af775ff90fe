// ── Logical intent storage ──
//
// Transactional, ordered storage of coordinator intent plus the
// per-controller backlog of undelivered mutations.

mod config_store;
mod ordered_index;
mod pending;

pub use config_store::{ConfigStore, Effect};
pub use ordered_index::{IndexError, Keyed, OrderedIndex};
pub use pending::{PendingEntry, PendingOp, PendingQueue};
