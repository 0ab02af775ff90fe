use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a controller-bound entity stands relative to its controller.
///
/// Stored entities are only ever `PendingCreate` or `Confirmed`;
/// `PendingDelete` lives on backlog items, because the coordinator
/// purges an entity from the store the instant its deletion is
/// accepted -- only the controller-side removal is deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    PendingCreate,
    PendingDelete,
    Confirmed,
}

impl DeliveryStatus {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    pub fn is_pending(self) -> bool {
        !self.is_confirmed()
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingCreate => "pending-create",
            Self::PendingDelete => "pending-delete",
            Self::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}
