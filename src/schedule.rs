//! Time slots and the ordered index of scheduled entities.

use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};

/// Half-open interval `[start, end)` occupied by a scheduled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    /// Both a start time and a duration are needed to occupy a slot.
    pub fn of(start: Option<NaiveDateTime>, duration: Option<Duration>) -> Option<Self> {
        let start = start?;
        let end = start.checked_add_signed(duration?)?;
        Some(Self { start, end })
    }

    /// Zero-length slots are scheduled but never conflict.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// Scheduled entities ordered by `(start, id)`.
///
/// Non-empty slots in the index never overlap each other, so their end times
/// are ordered the same way as their start times. That lets a conflict check
/// stop at the first non-empty neighbour that starts before the candidate ends.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    order: BTreeSet<(NaiveDateTime, u64)>,
    slots: HashMap<u64, Slot>,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or move `id` to `slot`.
    pub fn insert(&mut self, id: u64, slot: Slot) {
        self.remove(id);
        self.order.insert((slot.start, id));
        self.slots.insert(id, slot);
    }

    pub fn remove(&mut self, id: u64) -> Option<Slot> {
        let slot = self.slots.remove(&id)?;
        self.order.remove(&(slot.start, id));
        Some(slot)
    }

    /// First indexed entity whose slot overlaps `candidate`, ignoring `exclude`.
    pub fn find_conflict(&self, candidate: &Slot, exclude: Option<u64>) -> Option<u64> {
        if candidate.is_empty() {
            return None;
        }

        for &(_, id) in self.order.range(..(candidate.end, 0)).rev() {
            if Some(id) == exclude {
                continue;
            }
            let Some(slot) = self.slots.get(&id) else {
                continue;
            };
            if slot.is_empty() {
                continue;
            }
            return if slot.end > candidate.start { Some(id) } else { None };
        }

        None
    }

    /// Ids by ascending start time, ties by ascending id.
    pub fn ordered_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.order.iter().map(|&(_, id)| id)
    }
}
