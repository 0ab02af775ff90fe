// ── Validation queries ──
//
// Point assertions about one entity, evaluated either against the
// coordinator's stored intent or against what a controller actually
// holds. The functional-test workflow is: assert at the coordinator,
// break connectivity, mutate, restore, then assert at the controller
// that the audit delivered everything in the right order.

use serde_json::Value;
use url::Url;

use crate::audit::timed_get;
use crate::store::ConfigStore;
use vtnc_southbound::{EntityPath, SouthboundClient, SouthboundError};

/// What the caller expects to find at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: EntityPath,
    pub want_present: bool,
    /// For flow filter entries: the expected dense evaluation position.
    /// Ignored when `want_present` is false.
    pub want_position: Option<usize>,
}

impl Query {
    pub fn present(path: EntityPath) -> Self {
        Self {
            path,
            want_present: true,
            want_position: None,
        }
    }

    pub fn absent(path: EntityPath) -> Self {
        Self {
            path,
            want_present: false,
            want_position: None,
        }
    }

    pub fn at_position(path: EntityPath, position: usize) -> Self {
        Self {
            path,
            want_present: true,
            want_position: Some(position),
        }
    }
}

/// What was actually found, and whether it satisfies the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub present: bool,
    pub position: Option<usize>,
    pub satisfied: bool,
}

fn verdict(query: &Query, present: bool, position: Option<usize>) -> Verdict {
    let satisfied = present == query.want_present
        && (!query.want_present
            || query.want_position.is_none()
            || position == query.want_position);
    Verdict {
        present,
        position,
        satisfied,
    }
}

/// Evaluate against stored intent. Purely local.
pub(crate) fn evaluate_intent(store: &ConfigStore, query: &Query) -> Verdict {
    let present = store.exists(&query.path);
    let position = store.position_of(&query.path);
    verdict(query, present, position)
}

/// Evaluate against what the controller at `url` actually holds.
pub(crate) async fn evaluate_delivered(
    client: &dyn SouthboundClient,
    url: &Url,
    query: &Query,
    bound: std::time::Duration,
) -> Result<Verdict, SouthboundError> {
    let actual = timed_get(client, url, &query.path, bound).await?;
    let position = actual.as_ref().and_then(position_attribute);
    Ok(verdict(query, actual.is_some(), position))
}

fn position_attribute(doc: &Value) -> Option<usize> {
    doc.get("position")?.as_u64().map(|p| p as usize)
}
