//! ContikiMAC-style radio duty-cycling layer (C4–C7).
//!
//! Grounded on
//! `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`,
//! restructured as an explicit struct with synchronous entry points instead
//! of the original's module-level statics and callback registration, per
//! `SPEC_FULL.md` §0.

mod dup_filter;
mod receive;
mod sampler;
mod transmitter;

pub use dup_filter::DuplicateFilter;
pub use receive::ReceiveOutcome;
pub use sampler::SamplerState;

use embassy_time::Instant;

use crate::config::Config;
use crate::framer::Framer;
use crate::radio::Radio;
use crate::timer::{CoarseTimer, FineTimer};

/// Default capacity of the duplicate-frame filter.
pub const DEFAULT_DUP_FILTER_SIZE: usize = 8;

/// The duty-cycling layer. Owns the radio and framer it drives.
pub struct Rdc<R: Radio, F: Framer, const DUP_N: usize = DEFAULT_DUP_FILTER_SIZE> {
    pub radio: R,
    pub framer: F,
    pub(crate) config: Config,

    pub(crate) contikimac_is_on: bool,
    pub(crate) keep_radio_on: bool,
    pub(crate) radio_is_on: bool,
    pub(crate) we_are_sending: bool,
    pub(crate) we_are_receiving_burst: bool,

    pub(crate) cycle_start: Instant,
    pub(crate) sampler: SamplerState,
    pub(crate) fine_timer: FineTimer,
    pub(crate) burst_timer: CoarseTimer,

    pub(crate) broadcast_count: u32,
    pub(crate) broadcast_window_start: Option<Instant>,

    pub(crate) dup_filter: DuplicateFilter<DUP_N>,
}

impl<R: Radio, F: Framer, const DUP_N: usize> Rdc<R, F, DUP_N> {
    pub fn new(radio: R, framer: F, config: Config, now: Instant) -> Self {
        let keep_radio_on = config.keep_radio_on;
        Rdc {
            radio,
            framer,
            config,
            contikimac_is_on: false,
            keep_radio_on,
            radio_is_on: false,
            we_are_sending: false,
            we_are_receiving_burst: false,
            cycle_start: now,
            sampler: SamplerState::Idle,
            fine_timer: FineTimer::new(),
            burst_timer: CoarseTimer::new(),
            broadcast_count: 0,
            broadcast_window_start: None,
            dup_filter: DuplicateFilter::new(),
        }
    }

    /// `init()`: arm the sampler's first fine timer and (if configured)
    /// switch the radio on.
    pub fn init(&mut self, now: Instant) {
        self.contikimac_is_on = true;
        self.cycle_start = now;
        self.sampler = SamplerState::Idle;
        self.fine_timer.arm_at(now);
    }

    /// `on()`: enable the RDC layer.
    pub fn on(&mut self) {
        self.contikimac_is_on = true;
    }

    /// `off(keep_radio_on)`: disable the RDC layer. Per I5, if
    /// `keep_radio_on` is false the radio is actually switched off.
    pub fn off(&mut self, keep_radio_on: bool) {
        self.contikimac_is_on = false;
        self.keep_radio_on = keep_radio_on;
        self.radio_off();
    }

    /// `duty_cycle() = (CLOCK_SECOND * CYCLE_TIME) / RTIMER_ARCH_SECOND`.
    pub fn duty_cycle(&self) -> embassy_time::Duration {
        self.config.duty_cycle()
    }

    pub fn is_radio_on(&self) -> bool {
        self.radio_is_on
    }

    pub fn we_are_sending(&self) -> bool {
        self.we_are_sending
    }

    pub fn we_are_receiving_burst(&self) -> bool {
        self.we_are_receiving_burst
    }

    /// Radio gate (C4): `on()`.
    pub(crate) fn radio_on(&mut self) {
        if self.contikimac_is_on && !self.radio_is_on {
            self.radio.on();
            self.radio_is_on = true;
        }
    }

    /// Radio gate (C4): `off()`, unconditional modulo the on/keep-radio-on
    /// flags. Used directly by the transmitter and receive path, which
    /// manage `we_are_sending`/`we_are_receiving_burst` themselves.
    pub(crate) fn radio_off(&mut self) {
        if self.contikimac_is_on && self.radio_is_on && !self.keep_radio_on {
            self.radio.off();
            self.radio_is_on = false;
        }
    }

    /// Radio gate (C4) as consulted by the sampler: a no-op while sending or
    /// receiving a burst (I4/I5).
    pub(crate) fn radio_off_guarded(&mut self) {
        if self.we_are_sending || self.we_are_receiving_burst {
            return;
        }
        self.radio_off();
    }
}
