//! RDC receive path (C7).
//!
//! Grounded on `input()`/`packet_input()` in
//! `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`.

use embassy_time::Instant;
use log::trace;

use crate::config::ACK_LEN;
use crate::framer::Framer;
use crate::radio::Radio;
use crate::scratchpad::Scratchpad;

use super::Rdc;

/// Outcome of [`Rdc::on_radio_receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The frame in `scratchpad` should be handed up to the MAC input.
    Deliver,
    /// The frame was an ACK-length reply, not for us, malformed, or a
    /// duplicate; it has already been discarded.
    Dropped,
}

impl<R: Radio, F: Framer, const DUP_N: usize> Rdc<R, F, DUP_N> {
    /// Called when the radio driver signals an incoming frame. `our_address`
    /// is this node's address, used for the destination check in step 4.
    pub fn on_radio_receive(&mut self, now: Instant, scratchpad: &mut Scratchpad, our_address: crate::address::Address) -> ReceiveOutcome {
        if !self.we_are_receiving_burst {
            self.radio_off_guarded();
        }

        if scratchpad.len() == ACK_LEN {
            return ReceiveOutcome::Dropped;
        }

        if self.framer.parse(scratchpad).is_err() {
            return ReceiveOutcome::Dropped;
        }

        let for_us = scratchpad.attrs.receiver == our_address || scratchpad.attrs.receiver.is_broadcast();
        if !for_us {
            return ReceiveOutcome::Dropped;
        }

        if scratchpad.attrs.pending {
            self.we_are_receiving_burst = true;
            self.radio_on();
            self.burst_timer.arm_after(now, self.config.inter_packet_deadline());
        } else {
            self.burst_timer.cancel();
            self.we_are_receiving_burst = false;
            self.radio_off();
        }

        let is_dup = self.dup_filter.check_and_insert(scratchpad.attrs.sender, scratchpad.attrs.mac_seqno);
        if is_dup {
            trace!("rdc receive: dropping duplicate seqno={}", scratchpad.attrs.mac_seqno);
            return ReceiveOutcome::Dropped;
        }

        ReceiveOutcome::Deliver
    }

    /// Coarse-timer context: the burst inter-packet deadline fired without a
    /// next burst frame arriving. Clears `we_are_receiving_burst` and turns
    /// the radio back off.
    pub fn on_coarse_timer(&mut self, now: Instant) {
        if self.burst_timer.poll(now) {
            self.we_are_receiving_burst = false;
            self.radio_off();
        }
    }
}
