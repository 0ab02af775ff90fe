// ── Flow lists and flow filters ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::delivery::DeliveryStatus;
use crate::store::{Keyed, OrderedIndex};
use vtnc_southbound::Direction;

// ── Flow lists ──────────────────────────────────────────────────────

/// A named, ordered set of traffic-match criteria, bound to one
/// controller at creation. Entries are keyed by sequence number;
/// sequence numbers are unique but need not be contiguous.
#[derive(Debug, Clone)]
pub struct FlowList {
    pub name: String,
    pub controller: String,
    pub delivery: DeliveryStatus,
    pub entries: BTreeMap<u32, FlowListEntry>,
}

impl FlowList {
    pub fn new(name: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controller: controller.into(),
            delivery: DeliveryStatus::PendingCreate,
            entries: BTreeMap::new(),
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "name": self.name })
    }
}

/// One match rule within a flow list.
#[derive(Debug, Clone)]
pub struct FlowListEntry {
    pub seq: u32,
    pub matches: FlowMatch,
    pub delivery: DeliveryStatus,
}

impl FlowListEntry {
    pub fn attributes(&self) -> Value {
        json!({ "seq": self.seq, "match": self.matches })
    }
}

/// Traffic-match criteria. All fields optional; an empty match is
/// "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_proto: Option<u8>,
}

// ── Flow filters ────────────────────────────────────────────────────

/// Action applied when a filter entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Pass,
    Drop,
}

impl FilterAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Drop => "drop",
        }
    }
}

/// An ordered rule set attached to one interface + direction.
///
/// Entry evaluation order is the dense position maintained by the
/// [`OrderedIndex`]; entry names are the stable identity that survives
/// renumbering.
#[derive(Debug, Clone)]
pub struct FlowFilter {
    pub direction: Direction,
    pub delivery: DeliveryStatus,
    pub entries: OrderedIndex<FlowFilterEntry>,
}

impl FlowFilter {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            delivery: DeliveryStatus::PendingCreate,
            entries: OrderedIndex::new(),
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "direction": self.direction })
    }
}

/// One match+action rule within a flow filter.
#[derive(Debug, Clone)]
pub struct FlowFilterEntry {
    pub name: String,
    pub action: FilterAction,
    /// Optional reference to a flow list providing the match criteria.
    pub flow_list: Option<String>,
    pub delivery: DeliveryStatus,
}

impl FlowFilterEntry {
    /// Wire document. Position is part of the controller-visible
    /// attributes, so a renumbered entry shows up as drifted and gets
    /// overwritten on the next audit or immediate push.
    pub fn attributes(&self, position: usize) -> Value {
        json!({
            "name": self.name,
            "position": position,
            "action": self.action.as_str(),
            "flow_list": self.flow_list,
        })
    }
}

impl Keyed for FlowFilterEntry {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Caller-supplied filter-entry parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntrySpec {
    pub action: FilterAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_list: Option<String>,
}
