//! Recency history of viewed entities.
//!
//! Nodes live in an arena (`Vec`) and link to each other by slot index; a
//! `HashMap` from entity id to slot gives O(1) lookup, so add, remove and
//! move-to-end never scan the list.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Node {
    id: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// De-duplicating list of entity ids, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    nodes: Vec<Node>,
    free: Vec<usize>,
    slots: HashMap<u64, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    limit: Option<usize>,
}

impl HistoryTracker {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History that evicts its oldest entry beyond `limit` ids.
    /// `None` means unbounded.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Record a view of `id`, moving it to the most-recent end.
    pub fn add(&mut self, id: u64) {
        if self.limit == Some(0) {
            return;
        }
        self.remove(id);

        let node = Node {
            id,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.slots.insert(id, slot);

        if let Some(limit) = self.limit
            && self.slots.len() > limit
            && let Some(head) = self.head
        {
            let oldest = self.nodes[head].id;
            self.remove(oldest);
        }
    }

    /// Forget `id`. No-op if it was never recorded.
    pub fn remove(&mut self, id: u64) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }

        self.free.push(slot);
        true
    }

    /// Snapshot of the ids, oldest to most recently viewed.
    pub fn list(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.slots.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = &self.nodes[slot];
            ids.push(node.id);
            cursor = node.next;
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
