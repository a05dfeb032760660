//! ALOHA medium access control layer (C8–C9).
//!
//! Grounded on `examples/original_source/core/net/mac/aloha.c`. The MAC
//! driver owns the three bounded pools (C1) and the [`Rdc`] instance it
//! drives; `send`/`input`/`on`/`off`/`channel_check_interval` are the
//! upward contract from `spec.md` §6.

mod retry;
#[cfg(test)]
mod tests;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use embassy_time::Instant;

use crate::address::Address;
use crate::attributes::PacketType;
use crate::config::Config;
use crate::framer::Framer;
use crate::mac::neighbor::{Metadata, NeighborQueue, SendCallback};
use crate::pool::Pool;
use crate::queuebuf::QueueBuffer;
use crate::radio::Radio;
use crate::rdc::{Rdc, DEFAULT_DUP_FILTER_SIZE};
use crate::scratchpad::Scratchpad;
use crate::status::TxStatus;

pub mod neighbor;

/// The MAC driver. `NEIGH` bounds the neighbor registry, `POOL` bounds the
/// packet and metadata pools (shared, per `spec.md` §3: "capacity = min(...,
/// global packet pool size)").
pub struct MacDriver<R: Radio, F: Framer, const NEIGH: usize = 2, const POOL: usize = 8, const DUP_N: usize = DEFAULT_DUP_FILTER_SIZE> {
    pub rdc: Rdc<R, F, DUP_N>,
    neighbor_pool: Pool<NeighborQueue, NEIGH>,
    packet_pool: Pool<QueueBuffer, POOL>,
    metadata_pool: Pool<Metadata, POOL>,
    config: Config,
    our_address: Address,
    seqno: u16,
    seqno_seeded: bool,
    rng: StdRng,
}

impl<R: Radio, F: Framer, const NEIGH: usize, const POOL: usize, const DUP_N: usize> MacDriver<R, F, NEIGH, POOL, DUP_N> {
    pub fn new(radio: R, framer: F, config: Config, our_address: Address, seed: u64, now: Instant) -> Self {
        let rdc = Rdc::new(radio, framer, config.clone(), now);
        MacDriver {
            rdc,
            neighbor_pool: Pool::new(),
            packet_pool: Pool::new(),
            metadata_pool: Pool::new(),
            config,
            our_address,
            seqno: 0,
            seqno_seeded: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `init()`: initialize pools (already empty by construction), timers,
    /// and the RDC sampler.
    pub fn init(&mut self, now: Instant) {
        self.rdc.init(now);
    }

    /// `on()` — delegate to RDC.
    pub fn on(&mut self) {
        self.rdc.on();
    }

    /// `off(keep_radio_on)` — delegate to RDC.
    pub fn off(&mut self, keep_radio_on: bool) {
        self.rdc.off(keep_radio_on);
    }

    /// `channel_check_interval()` — delegate to RDC.
    pub fn channel_check_interval(&self) -> embassy_time::Duration {
        self.rdc.duty_cycle()
    }

    /// `input()` — delegates to the RDC receive path, then (absent a
    /// link-layer security module, out of scope per `spec.md` §1) straight
    /// up to the network layer via `deliver`.
    pub fn input<D: FnOnce(&Scratchpad)>(&mut self, now: Instant, scratchpad: &mut Scratchpad, deliver: D) {
        use crate::rdc::ReceiveOutcome;
        if self.rdc.on_radio_receive(now, scratchpad, self.our_address) == ReceiveOutcome::Deliver {
            deliver(scratchpad);
        }
    }

    /// `send(callback, ctx)` (C8 `enqueue`). Immediate failures (pool/queue
    /// exhaustion) are reported synchronously as `Err`; success means the
    /// frame was enqueued and, if it became the new head, transmitted
    /// immediately — retries thereafter go through a randomized backoff
    /// (`retry.rs`). Either way the upper layer learns the outcome only
    /// through `callback`, invoked once the head's transmission resolves
    /// (P2).
    pub fn send(&mut self, now: Instant, scratchpad: &mut Scratchpad, callback: SendCallback) -> Result<(), TxStatus> {
        self.stamp_seqno(scratchpad);

        let addr = scratchpad.attrs.receiver;
        let is_ack = scratchpad.attrs.packet_type == PacketType::Ack;

        let neigh_idx = match self.find_neighbor(addr) {
            Some(i) => i,
            None => match self.neighbor_pool.alloc(NeighborQueue::new(addr)) {
                Ok(i) => i,
                Err(_) => {
                    warn!("mac: neighbor pool exhausted, dropping send to {addr}");
                    return Err(TxStatus::Err);
                }
            },
        };

        let at_capacity = self.neighbor_pool.get(neigh_idx).map(|n| n.len() >= self.config.max_packet_per_neighbor).unwrap_or(true);
        if at_capacity {
            self.destroy_neighbor_if_empty(neigh_idx);
            warn!("mac: neighbor queue for {addr} is full");
            return Err(TxStatus::Err);
        }

        let queuebuf = QueueBuffer::snapshot_from_scratchpad(scratchpad);
        let packet_idx = match self.packet_pool.alloc(queuebuf) {
            Ok(i) => i,
            Err(_) => {
                self.destroy_neighbor_if_empty(neigh_idx);
                warn!("mac: packet pool exhausted, dropping send to {addr}");
                return Err(TxStatus::Err);
            }
        };

        let max_transmissions = if scratchpad.attrs.max_mac_transmissions != 0 {
            scratchpad.attrs.max_mac_transmissions
        } else {
            self.config.max_frame_retries
        };
        let metadata = Metadata { callback: Some(callback), max_transmissions };
        let metadata_idx = match self.metadata_pool.alloc(metadata) {
            Ok(i) => i,
            Err(_) => {
                self.packet_pool.free(packet_idx);
                self.destroy_neighbor_if_empty(neigh_idx);
                warn!("mac: metadata pool exhausted, dropping send to {addr}");
                return Err(TxStatus::Err);
            }
        };

        let was_empty = self.neighbor_pool.get(neigh_idx).map(|n| n.is_empty()).unwrap_or(true);
        if let Some(neighbor) = self.neighbor_pool.get_mut(neigh_idx) {
            neighbor.insert((packet_idx, metadata_idx), is_ack);
        }

        if was_empty || is_ack {
            self.transmit_head(now, neigh_idx, scratchpad);
        }

        Ok(())
    }

    /// Coarse-timer context: drive due per-neighbor backoff timers and the
    /// RDC burst deadline.
    pub fn on_coarse_timer(&mut self, now: Instant, scratchpad: &mut Scratchpad) {
        self.rdc.on_coarse_timer(now);

        let due: Vec<usize> = self
            .neighbor_pool
            .iter()
            .filter(|(_, n)| n.transmit_timer.deadline().map(|d| now >= d).unwrap_or(false))
            .map(|(i, _)| i)
            .collect();

        for idx in due {
            if let Some(neighbor) = self.neighbor_pool.get_mut(idx) {
                neighbor.transmit_timer.cancel();
            }
            self.transmit_head(now, idx, scratchpad);
        }
    }

    fn stamp_seqno(&mut self, scratchpad: &mut Scratchpad) {
        if !self.seqno_seeded {
            let seed: u16 = self.rng.r#gen();
            self.seqno = if seed == 0 { 1 } else { seed };
            self.seqno_seeded = true;
        }
        scratchpad.attrs.mac_seqno = self.seqno;
        self.seqno = self.seqno.wrapping_add(1);
        if self.seqno == 0 {
            self.seqno = 1;
        }
    }

    fn find_neighbor(&self, address: Address) -> Option<usize> {
        self.neighbor_pool.iter().find(|(_, n)| n.address == address).map(|(i, _)| i)
    }

    fn destroy_neighbor_if_empty(&mut self, neigh_idx: usize) {
        let empty = self.neighbor_pool.get(neigh_idx).map(|n| n.is_empty()).unwrap_or(false);
        if empty {
            self.neighbor_pool.free(neigh_idx);
        }
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbor_pool.iter().count()
    }

    pub fn packet_pool_free_count(&self) -> usize {
        self.packet_pool.free_count()
    }

    pub fn metadata_pool_free_count(&self) -> usize {
        self.metadata_pool.free_count()
    }

    /// Pin the next assigned sequence number so tests can stage a matching
    /// ACK before the immediate transmit `send()` triggers on enqueue.
    #[cfg(test)]
    pub(crate) fn test_force_seqno(&mut self, seqno: u16) {
        self.seqno = if seqno == 0 { 1 } else { seqno };
        self.seqno_seeded = true;
    }
}
