//! Single-frame strobe transmitter (C5).
//!
//! Grounded on `send_packet` in
//! `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`:
//! broadcast strobes `radio.transmit()` for `STROBE_TIME`; unicast transmits
//! once, waits `INTER_PACKET_INTERVAL`, then if a reply starts arriving waits
//! `AFTER_ACK_DETECTED_WAIT_TIME` and reads up to `ACK_LEN` bytes.
//!
//! Both waits are real passages of time on the original hardware (busy
//! loops). Since this layer never calls `Instant::now()`, the wait is
//! modeled as "the number of `INTER_PACKET_INTERVAL`-sized slots that fit in
//! `STROBE_TIME`" for broadcast, and as a single logical step for unicast —
//! the protocol-visible behavior (how many frames go out, whether an ACK is
//! captured) is unaffected by not literally spinning on a clock.

use embassy_time::{Duration, Instant};

use crate::config::ACK_LEN;
use crate::framer::Framer;
use crate::queuebuf::QueueBuffer;
use crate::radio::Radio;
use crate::scratchpad::Scratchpad;
use crate::status::TxStatus;

use super::Rdc;

impl<R: Radio, F: Framer, const DUP_N: usize> Rdc<R, F, DUP_N> {
    /// `send_one(callback, ctx)`, modeled here as a pure function of the
    /// scratchpad: the caller is the MAC retry controller, which owns the
    /// callback dispatch.
    pub fn send_one(&mut self, now: Instant, scratchpad: &mut Scratchpad) -> TxStatus {
        if let Some(status) = self.check_preconditions(scratchpad) {
            return status;
        }
        if !scratchpad.attrs.is_created_and_secured {
            scratchpad.attrs.mac_ack = true;
            if self.framer.create(scratchpad).is_err() {
                return TxStatus::ErrFatal;
            }
            scratchpad.attrs.is_created_and_secured = true;
        }
        self.transmit_staged(now, scratchpad)
    }

    /// `send_list(callback, ctx, list)`. Pre-creates-and-secures every entry
    /// (setting `pending` on all but the last) before stepping through them,
    /// because the frame must be framed only once. Stops at the first
    /// non-`TX_OK` outcome.
    pub fn send_list(&mut self, now: Instant, scratchpad: &mut Scratchpad, list: &mut [QueueBuffer]) -> Vec<TxStatus> {
        if self.we_are_receiving_burst {
            return vec![TxStatus::Collision];
        }

        let last = list.len().saturating_sub(1);
        for (i, qb) in list.iter_mut().enumerate() {
            qb.restore_to_scratchpad(scratchpad);
            if !scratchpad.attrs.is_created_and_secured {
                scratchpad.attrs.pending = i != last;
                scratchpad.attrs.mac_ack = true;
                if self.framer.create(scratchpad).is_err() {
                    qb.update_attrs_from_scratchpad(scratchpad);
                    return vec![TxStatus::ErrFatal];
                }
                scratchpad.attrs.is_created_and_secured = true;
                qb.update_attrs_from_scratchpad(scratchpad);
            }
        }

        let mut results = Vec::with_capacity(list.len());
        for qb in list.iter_mut() {
            qb.restore_to_scratchpad(scratchpad);
            let status = if let Some(status) = self.check_preconditions(scratchpad) {
                status
            } else {
                self.transmit_staged(now, scratchpad)
            };
            qb.update_attrs_from_scratchpad(scratchpad);
            let stop = status != TxStatus::Ok;
            results.push(status);
            if stop {
                break;
            }
        }
        results
    }

    fn check_preconditions(&self, scratchpad: &Scratchpad) -> Option<TxStatus> {
        if !self.contikimac_is_on && !self.keep_radio_on {
            return Some(TxStatus::ErrFatal);
        }
        if scratchpad.is_empty() {
            return Some(TxStatus::ErrFatal);
        }
        None
    }

    /// Steps 3–8 of `spec.md` §4.5, assuming the frame is already
    /// created-and-secured.
    fn transmit_staged(&mut self, now: Instant, scratchpad: &mut Scratchpad) -> TxStatus {
        let seqno = scratchpad.attrs.mac_seqno;
        let is_broadcast = scratchpad.attrs.receiver.is_broadcast();

        if is_broadcast && self.broadcast_rate_limited(now) {
            return TxStatus::Collision;
        }

        self.radio.prepare(scratchpad.as_slice());
        self.we_are_sending = true;

        if self.radio.receiving_packet() || self.radio.pending_packet() {
            self.we_are_sending = false;
            return TxStatus::NoAck;
        }

        self.radio_off();

        let was_on = self.contikimac_is_on;
        self.contikimac_is_on = true;

        if !is_broadcast {
            self.radio_on();
        }

        let mut got_ack = false;
        if is_broadcast {
            let strobe_slots = self.strobe_slot_count();
            for _ in 0..strobe_slots {
                self.radio.transmit();
            }
        } else {
            self.radio.transmit();
            if self.radio.receiving_packet() || self.radio.pending_packet() {
                let mut ack = [0u8; ACK_LEN];
                let len = self.radio.read(&mut ack);
                if len == ACK_LEN && ack[ACK_LEN - 1] == (seqno & 0xFF) as u8 {
                    got_ack = true;
                }
            }
        }

        self.radio_off();
        self.contikimac_is_on = was_on;
        self.we_are_sending = false;

        if !is_broadcast && !got_ack {
            TxStatus::NoAck
        } else {
            TxStatus::Ok
        }
    }

    fn strobe_slot_count(&self) -> u64 {
        let interval = self.config.inter_packet_interval().as_micros().max(1);
        (self.config.strobe_time().as_micros() / interval).max(1)
    }

    fn broadcast_rate_limited(&mut self, now: Instant) -> bool {
        let Some(limit) = self.config.broadcast_rate_limit else {
            return false;
        };
        match self.broadcast_window_start {
            Some(start) if now - start < Duration::from_secs(1) => {
                if self.broadcast_count >= limit {
                    true
                } else {
                    self.broadcast_count += 1;
                    false
                }
            }
            _ => {
                self.broadcast_window_start = Some(now);
                self.broadcast_count = 1;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::config::Config;
    use crate::testutil::{MockFramer, MockRadio};

    fn rdc(config: Config) -> Rdc<MockRadio, MockFramer> {
        let mut rdc = Rdc::new(MockRadio::new(), MockFramer::new(), config, Instant::from_ticks(0));
        rdc.init(Instant::from_ticks(0));
        rdc
    }

    #[test]
    fn unicast_with_matching_ack_returns_ok() {
        let mut rdc = rdc(Config::default());
        let seqno = 42u16;
        rdc.radio.queue_ack([0xAA, 0xBB, (seqno & 0xFF) as u8]);
        let mut pad = Scratchpad::new();
        pad.set_payload(&[1, 2, 3]).unwrap();
        pad.attrs.receiver = Address::new([3, 0]);
        pad.attrs.mac_seqno = seqno;
        pad.attrs.is_created_and_secured = true;

        let status = rdc.send_one(Instant::from_ticks(0), &mut pad);
        assert_eq!(status, TxStatus::Ok);
    }

    #[test]
    fn unicast_without_reply_returns_noack() {
        let mut rdc = rdc(Config::default());
        let mut pad = Scratchpad::new();
        pad.set_payload(&[1, 2, 3]).unwrap();
        pad.attrs.receiver = Address::new([3, 0]);
        pad.attrs.mac_seqno = 1;
        pad.attrs.is_created_and_secured = true;

        let status = rdc.send_one(Instant::from_ticks(0), &mut pad);
        assert_eq!(status, TxStatus::NoAck);
    }

    #[test]
    fn broadcast_never_reads_an_ack() {
        let mut rdc = rdc(Config::default());
        let mut pad = Scratchpad::new();
        pad.set_payload(&[1, 2, 3]).unwrap();
        pad.attrs.receiver = Address::BROADCAST;
        pad.attrs.mac_seqno = 1;
        pad.attrs.is_created_and_secured = true;

        let status = rdc.send_one(Instant::from_ticks(0), &mut pad);
        assert_eq!(status, TxStatus::Ok);
        assert!(rdc.radio.transmit_count() > 1, "broadcast must strobe more than once across STROBE_TIME");
    }

    #[test]
    fn send_list_refuses_during_burst_reception() {
        let mut rdc = rdc(Config::default());
        rdc.we_are_receiving_burst = true;
        let mut pad = Scratchpad::new();
        let mut list = vec![QueueBuffer::snapshot_from_scratchpad(&pad)];
        let results = rdc.send_list(Instant::from_ticks(0), &mut pad, &mut list);
        assert_eq!(results, vec![TxStatus::Collision]);
        assert_eq!(rdc.radio.transmit_count(), 0, "B3: must not touch the radio");
    }

    #[test]
    fn fatal_on_disabled_rdc_without_keep_radio_on() {
        let mut rdc = rdc(Config::default());
        rdc.off(false);
        let mut pad = Scratchpad::new();
        pad.set_payload(&[1]).unwrap();
        assert_eq!(rdc.send_one(Instant::from_ticks(0), &mut pad), TxStatus::ErrFatal);
    }

    #[test]
    fn fatal_on_empty_scratchpad() {
        let mut rdc = rdc(Config::default());
        let mut pad = Scratchpad::new();
        assert_eq!(rdc.send_one(Instant::from_ticks(0), &mut pad), TxStatus::ErrFatal);
    }

    #[test]
    fn broadcast_rate_limit_rejects_kplus1th_broadcast() {
        let mut config = Config::default();
        config.broadcast_rate_limit = Some(2);
        let mut rdc = rdc(config);
        let mut make_pad = || {
            let mut pad = Scratchpad::new();
            pad.set_payload(&[1]).unwrap();
            pad.attrs.receiver = Address::BROADCAST;
            pad.attrs.is_created_and_secured = true;
            pad
        };
        let now = Instant::from_ticks(0);
        assert_eq!(rdc.send_one(now, &mut make_pad()), TxStatus::Ok);
        assert_eq!(rdc.send_one(now, &mut make_pad()), TxStatus::Ok);
        assert_eq!(rdc.send_one(now, &mut make_pad()), TxStatus::Collision);
    }
}
