//! The send window: outstanding unacknowledged frames in send order.
//!
//! A bounded ordered list with an explicit occupancy count. Occupied slots
//! always form a contiguous prefix: eviction removes a prefix and the
//! survivors keep their relative order.

use std::collections::VecDeque;
use std::time::Instant;

use link_lab_abstract::Frame;

/// One in-flight frame plus the timestamp of its most recent transmission.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    pub frame: Frame,
    pub sent_at: Instant,
}

#[derive(Debug)]
pub struct SendWindow {
    slots: VecDeque<TimedFrame>,
    capacity: usize,
}

impl SendWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Append a just-transmitted frame. The caller checks [`is_full`] first.
    pub fn push(&mut self, frame: Frame, sent_at: Instant) {
        debug_assert!(!self.is_full(), "push on a full send window");
        self.slots.push_back(TimedFrame { frame, sent_at });
    }

    /// Cumulative-ack eviction.
    ///
    /// Finds the last occupied slot whose stored frame carries an ack field
    /// equal to `ack_value` and evicts it together with every earlier slot,
    /// compacting left. Returns the number of evicted frames; 0 when no
    /// slot matches (stale or out-of-order ack).
    pub fn apply_ack(&mut self, ack_value: u32) -> usize {
        let found = self
            .slots
            .iter()
            .rposition(|slot| slot.frame.header.ack == ack_value);
        match found {
            Some(i) => self.slots.drain(..=i).count(),
            None => 0,
        }
    }

    /// In-order mutable scan of the occupied slots, oldest first.
    /// Used by the retransmission monitor.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TimedFrame> {
        self.slots.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimedFrame> {
        self.slots.iter()
    }
}
