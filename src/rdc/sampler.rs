//! Periodic channel-check state machine (C6).
//!
//! `spec.md` §9 recommends mapping the source's protothread onto "an
//! explicit enum-based state machine (state + locals) resumed from each
//! fine-timer callback" — this is exactly that: [`SamplerState`] plus
//! [`Rdc::on_fine_timer`], grounded on the `powercycle()` protothread in
//! `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`.

use embassy_time::Instant;
use log::{debug, trace};

use crate::framer::Framer;
use crate::radio::Radio;

use super::Rdc;

/// Locals carried across fine-timer re-entries while the sampler is awake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Between cycles; the next fine-timer fire is `CYCLE_START` of the next
    /// period.
    Idle,
    /// `PACKET_SEEN` path: snooping in `CHECK_TIME`-sized sub-periods.
    Snooping { silence_periods: u32, periods: u32 },
}

impl<R: Radio, F: Framer, const DUP_N: usize> Rdc<R, F, DUP_N> {
    /// Advance the sampler. Must be invoked once `self.fine_timer` is due.
    pub fn on_fine_timer(&mut self, now: Instant) {
        if !self.fine_timer.poll(now) {
            return;
        }

        if self.we_are_sending || self.we_are_receiving_burst {
            // Guarded: the sampler must never run LISTEN_CCA or a snoop
            // step while the transmitter or burst receive is using the
            // radio (I4). Re-check shortly.
            self.fine_timer.arm_with_guard(now, now, self.config.check_time());
            return;
        }

        match self.sampler {
            SamplerState::Idle => self.run_cycle_start(now),
            SamplerState::Snooping { silence_periods, periods } => self.run_snoop_subperiod(now, silence_periods, periods),
        }
    }

    fn run_cycle_start(&mut self, now: Instant) {
        self.radio_on();

        // LISTEN_CCA is budgeted by CCA_ACTIVE_TIME, not by a fixed probe
        // count (`contikimac-for-aloha-rdc.c`'s `RTIMER_CLOCK_LT` loop).
        let mut packet_seen = false;
        for _ in 0..self.config.listen_cca_probe_count() {
            if !self.radio.channel_clear() {
                packet_seen = true;
                break;
            }
        }

        if packet_seen {
            trace!("rdc sampler: packet seen during LISTEN_CCA, entering SNOOPING");
            self.sampler = SamplerState::Snooping { silence_periods: 0, periods: 0 };
            self.fine_timer.arm_with_guard(now, now + self.config.check_time(), self.config.check_time());
        } else {
            self.radio_off_guarded();
            self.advance_cycle(now);
        }
    }

    fn run_snoop_subperiod(&mut self, now: Instant, silence_periods: u32, periods: u32) {
        let mut silence_periods = if self.radio.channel_clear() { silence_periods + 1 } else { 0 };
        let periods = periods + 1;
        if self.radio.receiving_packet() {
            silence_periods = 0;
        }

        let fast_sleep_exit = self.config.with_fast_sleep
            && periods > self.config.max_nonactivity_periods
            && !self.radio.receiving_packet()
            && !self.radio.pending_packet();
        let exit = silence_periods > self.config.max_silence_periods
            || fast_sleep_exit
            || self.radio.pending_packet()
            || periods >= self.config.snoop_subperiod_limit();

        if exit {
            debug!("rdc sampler: leaving SNOOPING after {periods} sub-periods");
            self.radio_off_guarded();
            self.advance_cycle(now);
        } else {
            self.sampler = SamplerState::Snooping { silence_periods, periods };
            self.fine_timer.arm_with_guard(now, now + self.config.check_time(), self.config.check_time());
        }
    }

    fn advance_cycle(&mut self, now: Instant) {
        self.sampler = SamplerState::Idle;
        self.cycle_start += self.config.cycle_time() + self.config.cca_active_time();
        self.fine_timer.arm_with_guard(now, self.cycle_start, self.config.check_time());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testutil::{MockFramer, MockRadio};

    fn rdc() -> Rdc<MockRadio, MockFramer> {
        let mut rdc = Rdc::new(MockRadio::new(), MockFramer::new(), Config::default(), Instant::from_ticks(0));
        rdc.init(Instant::from_ticks(0));
        rdc
    }

    #[test]
    fn idle_channel_turns_radio_back_off_after_listen_cca() {
        let mut rdc = rdc();
        let deadline = rdc.fine_timer.deadline().unwrap();
        rdc.on_fine_timer(deadline);
        assert!(!rdc.is_radio_on(), "an idle channel must not keep the radio on past LISTEN_CCA");
        assert_eq!(rdc.sampler, SamplerState::Idle);
    }

    #[test]
    fn busy_channel_enters_snooping() {
        let mut rdc = rdc();
        rdc.radio.set_channel_busy(true);
        let deadline = rdc.fine_timer.deadline().unwrap();
        rdc.on_fine_timer(deadline);
        assert!(matches!(rdc.sampler, SamplerState::Snooping { .. }));
        assert!(rdc.is_radio_on());
    }

    #[test]
    fn sampler_never_turns_radio_off_while_sending() {
        let mut rdc = rdc();
        rdc.we_are_sending = true;
        rdc.radio_on();
        let deadline = rdc.fine_timer.deadline().unwrap();
        rdc.on_fine_timer(deadline);
        assert!(rdc.is_radio_on(), "P5/guard: sampler must not turn the radio off mid-send");
    }

    #[test]
    fn snooping_exits_after_max_silence_periods() {
        let mut rdc = rdc();
        rdc.radio.set_channel_busy(true);
        let mut now = rdc.fine_timer.deadline().unwrap();
        rdc.on_fine_timer(now); // enters snooping

        rdc.radio.set_channel_busy(false); // channel now clear every sub-period
        for _ in 0..(rdc.config.max_silence_periods + 2) {
            now = rdc.fine_timer.deadline().unwrap();
            rdc.on_fine_timer(now);
        }
        assert_eq!(rdc.sampler, SamplerState::Idle, "P5/B-style: must give up snooping once silence exceeds the threshold");
    }
}
