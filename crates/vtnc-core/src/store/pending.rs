// ── Per-controller pending backlog ──
//
// FIFO of mutations that could not be delivered because the owning
// controller was down (or a push failed). Enqueued synchronously with
// the store mutation that produced the PENDING status, so backlog order
// equals logical-operation order. The audit re-derives hierarchical
// order from the store; the FIFO sequence is the tie-break and the
// inspection surface.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use vtnc_southbound::EntityPath;

/// What an undelivered backlog item still owes the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Create,
    Delete,
}

/// One undelivered mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Monotonic enqueue sequence, unique per queue.
    pub seq: u64,
    pub op: PendingOp,
    pub path: EntityPath,
}

#[derive(Debug, Default)]
struct QueueInner {
    next_seq: u64,
    entries: VecDeque<PendingEntry>,
}

/// The backlog for a single controller.
#[derive(Debug, Default)]
pub struct PendingQueue {
    inner: Mutex<QueueInner>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an undelivered mutation.
    ///
    /// A delete cancels any queued create for the same path: the
    /// controller never saw the create, so there is nothing to undo
    /// beyond verifying absence. Exact duplicates are coalesced.
    pub async fn enqueue(&self, op: PendingOp, path: EntityPath) {
        let mut inner = self.inner.lock().await;

        if op == PendingOp::Delete {
            inner
                .entries
                .retain(|e| !(e.op == PendingOp::Create && e.path == path));
        }
        if inner.entries.iter().any(|e| e.op == op && e.path == path) {
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push_back(PendingEntry { seq, op, path });
    }

    /// Drop the backlog item for `op` at `path`, if queued.
    pub async fn remove(&self, op: PendingOp, path: &EntityPath) {
        let mut inner = self.inner.lock().await;
        inner.entries.retain(|e| !(e.op == op && e.path == *path));
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// The backlog in FIFO order.
    pub async fn snapshot(&self) -> Vec<PendingEntry> {
        self.inner.lock().await.entries.iter().cloned().collect()
    }

    /// Queued deletes, deepest path first so children are removed from
    /// the controller before their parents; FIFO order breaks ties.
    pub async fn deletes_deepest_first(&self) -> Vec<PendingEntry> {
        let mut deletes: Vec<PendingEntry> = self
            .inner
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.op == PendingOp::Delete)
            .cloned()
            .collect();
        deletes.sort_by(|a, b| b.path.depth().cmp(&a.path.depth()).then(a.seq.cmp(&b.seq)));
        deletes
    }

    /// Drop queued creates whose path no longer satisfies `keep`.
    /// Used after a clean audit to shed items made stale by renumbering.
    pub async fn retain_creates(&self, keep: impl Fn(&EntityPath) -> bool) {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .retain(|e| e.op == PendingOp::Delete || keep(&e.path));
    }

    /// Discard everything. Used when the controller itself is deleted.
    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }
}
