//! MAC retry controller (C9).
//!
//! Grounded on `schedule_transmission`, `transmit_packet_list`, `tx_ok`,
//! `noack`, and `free_packet` in
//! `examples/original_source/core/net/mac/aloha.c`. The RDC completion that
//! `packet_sent`/`tx_done` receive asynchronously over there is, in this
//! synchronous crate, simply the return value of [`crate::rdc::Rdc::send_list`]
//! — there is no separate callback registration step.

use embassy_time::Instant;
use log::warn;
use rand::Rng;

use crate::framer::Framer;
use crate::radio::Radio;
use crate::scratchpad::Scratchpad;
use crate::status::TxStatus;

use super::MacDriver;

impl<R: Radio, F: Framer, const NEIGH: usize, const POOL: usize, const DUP_N: usize> MacDriver<R, F, NEIGH, POOL, DUP_N> {
    /// `backoff_ticks = uniform_random(1..=20)` coarse ticks (`spec.md` §4.9;
    /// the BE constants are carried in `Config` but unused here, per the
    /// open-question resolution in `SPEC_FULL.md` §9).
    pub(super) fn schedule_backoff(&mut self, now: Instant, neigh_idx: usize) {
        let backoff_ticks: u32 = self.rng.gen_range(1..=20);
        let backoff = self.config.coarse_ticks(backoff_ticks);
        if let Some(neighbor) = self.neighbor_pool.get_mut(neigh_idx) {
            neighbor.transmit_timer.arm_after(now, backoff);
        }
    }

    /// Hand the neighbor's head entry to `Rdc::send_list` and process the
    /// result (`spec.md` §4.9's "transmit head").
    pub(super) fn transmit_head(&mut self, now: Instant, neigh_idx: usize, scratchpad: &mut Scratchpad) {
        let head = match self.neighbor_pool.get(neigh_idx).and_then(|n| n.head()) {
            Some(h) => h,
            None => return,
        };
        let (packet_idx, _metadata_idx) = head;
        let mut queuebuf = match self.packet_pool.get(packet_idx) {
            Some(qb) => qb.clone(),
            None => {
                warn!("mac: head packet index {packet_idx} missing from pool, dropping neighbor entry");
                return;
            }
        };

        let results = self.rdc.send_list(now, scratchpad, std::slice::from_mut(&mut queuebuf));
        if let Some(slot) = self.packet_pool.get_mut(packet_idx) {
            *slot = queuebuf;
        }

        let status = results.into_iter().next().unwrap_or(TxStatus::Err);
        self.on_send_result(now, neigh_idx, status, 1);
    }

    /// Per-frame completion dispatch (`spec.md` §4.9 table).
    fn on_send_result(&mut self, now: Instant, neigh_idx: usize, status: TxStatus, num_transmissions: u32) {
        match status {
            TxStatus::Ok => {
                self.accumulate(neigh_idx, num_transmissions);
                self.tx_done(now, neigh_idx, TxStatus::Ok);
            }
            TxStatus::NoAck => {
                self.accumulate(neigh_idx, num_transmissions);
                if self.retries_exhausted(neigh_idx) {
                    self.tx_done(now, neigh_idx, TxStatus::NoAck);
                } else {
                    self.schedule_backoff(now, neigh_idx);
                }
            }
            TxStatus::Collision | TxStatus::Deferred => {
                // Open question resolved in SPEC_FULL.md §9: treated as
                // "continue waiting", no state change.
            }
            other => {
                self.tx_done(now, neigh_idx, other);
            }
        }
    }

    fn accumulate(&mut self, neigh_idx: usize, num_transmissions: u32) {
        if let Some(neighbor) = self.neighbor_pool.get_mut(neigh_idx) {
            neighbor.transmissions += num_transmissions;
        }
    }

    fn retries_exhausted(&self, neigh_idx: usize) -> bool {
        let Some(neighbor) = self.neighbor_pool.get(neigh_idx) else {
            return true;
        };
        let max_transmissions = neighbor
            .head()
            .and_then(|(_, metadata_idx)| self.metadata_pool.get(metadata_idx))
            .map(|m| m.max_transmissions)
            .unwrap_or(1);
        neighbor.transmissions >= max_transmissions as u32
    }

    /// `tx_done(status)`: reclaim the head entry's allocations, advance the
    /// queue or destroy the neighbor, then invoke the upper-layer callback
    /// exactly once (P2).
    fn tx_done(&mut self, now: Instant, neigh_idx: usize, status: TxStatus) {
        let popped = {
            let Some(neighbor) = self.neighbor_pool.get_mut(neigh_idx) else {
                return;
            };
            let entry = neighbor.pop_head();
            let transmissions = neighbor.transmissions;
            neighbor.transmissions = 0;
            entry.map(|e| (e, transmissions))
        };
        let Some(((packet_idx, metadata_idx), transmissions)) = popped else {
            return;
        };

        self.packet_pool.free(packet_idx);
        let metadata = self.metadata_pool.free(metadata_idx);

        let has_more = self.neighbor_pool.get(neigh_idx).map(|n| !n.is_empty()).unwrap_or(false);
        if has_more {
            self.schedule_backoff(now, neigh_idx);
        } else if let Some(neighbor) = self.neighbor_pool.get_mut(neigh_idx) {
            neighbor.transmit_timer.cancel();
            self.neighbor_pool.free(neigh_idx);
        }

        if let Some(metadata) = metadata {
            if let Some(callback) = metadata.callback {
                callback(status, transmissions);
            }
        }
    }
}
