//! ID allocation for tempo entities.

use eyre::{Result, bail};

/// Monotonic id source shared by tasks, epics and subtasks.
///
/// Ids start at 1 and are never handed out twice, even after the entity
/// they named is deleted. `u64::MAX` is never allocated.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume after the highest id seen in restored data.
    pub fn starting_after(max_seen: u64) -> Self {
        Self {
            next: max_seen.saturating_add(1),
        }
    }

    pub fn allocate(&mut self) -> Result<u64> {
        if self.next == u64::MAX {
            bail!("id space exhausted");
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// The id the next call to `allocate` will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
