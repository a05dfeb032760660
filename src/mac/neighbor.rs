//! Per-neighbor FIFO queues (C8) and per-frame metadata.
//!
//! Grounded on `neighbor_queue_from_addr` and the `struct neighbor_queue` /
//! `struct qbuf_metadata` layout in
//! `examples/original_source/core/net/mac/aloha.c`. The packet-list entry /
//! metadata pair is represented here as a pair of pool indices rather than an
//! owned linked list node, following `spec.md` §9's "arena + generation
//! indexed handles... avoid reference-counting" design note.

use crate::address::Address;
use crate::status::TxStatus;
use crate::timer::CoarseTimer;

/// `(status, num_transmissions)` delivered to the upper layer exactly once
/// per accepted `send` (P2).
pub type SendCallback = Box<dyn FnOnce(TxStatus, u32) + Send>;

/// Immutable for the entry's lifetime (`spec.md` §3).
pub struct Metadata {
    pub callback: Option<SendCallback>,
    pub max_transmissions: u8,
}

/// One (packet pool index, metadata pool index) pair: a packet-list entry.
pub type Entry = (usize, usize);

pub struct NeighborQueue {
    pub address: Address,
    entries: Vec<Entry>,
    pub transmissions: u32,
    pub transmit_timer: CoarseTimer,
}

impl NeighborQueue {
    pub fn new(address: Address) -> Self {
        NeighborQueue {
            address,
            entries: Vec::new(),
            transmissions: 0,
            transmit_timer: CoarseTimer::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn head(&self) -> Option<Entry> {
        self.entries.first().copied()
    }

    /// ACK-priority insert: front if `at_front`, else back (`spec.md` §4.8
    /// step 7).
    pub fn insert(&mut self, entry: Entry, at_front: bool) {
        if at_front {
            self.entries.insert(0, entry);
        } else {
            self.entries.push(entry);
        }
    }

    /// Remove the head entry, invariant I2: only the head is ever in flight.
    pub fn pop_head(&mut self) -> Option<Entry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }
}
