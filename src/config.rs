//! Tunable protocol parameters.
//!
//! Every knob enumerated in `spec.md` §6 lives here, with defaults lifted
//! from `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`
//! and `core/net/mac/aloha.c`. The raw constants in that source are defined in
//! rtimer ticks (`RTIMER_ARCH_SECOND`) and clock ticks (`CLOCK_SECOND`); both
//! are platform-dependent there (printed at runtime, never `#define`d), so we
//! pin the two historically common Contiki defaults — 65536 Hz for the rtimer
//! and 128 Hz for the clock — and derive every other timing constant from
//! them the same way `duty_cycle()` does at line ~774 of that file.

use std::fmt;
use std::path::Path;

use embassy_time::Duration;
use serde::Deserialize;

/// Protocol configuration. Durations are derived from the four base
/// frequencies/rates; construct via [`Config::default`] and override fields,
/// then call [`Config::validate`] before handing it to the drivers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// IEEE 802.15.4 minimum backoff exponent. Carried for interface
    /// completeness; unused by the scheduler (`spec.md` §9 open question).
    pub min_be: u8,
    /// Maximum backoff exponent. Range 3..=8. Unused by the scheduler.
    pub max_be: u8,
    /// Maximum number of backoff stages. Range 0..=5. Unused by the scheduler.
    pub max_backoff: u8,
    /// Default per-frame retry ceiling if the frame doesn't override it.
    /// Range 0..=7.
    pub max_frame_retries: u8,
    /// Neighbor registry capacity.
    pub max_neighbor_queues: usize,
    /// Per-neighbor queue capacity.
    pub max_packet_per_neighbor: usize,
    /// Global packet/metadata pool capacity (`QUEUEBUF_NUM`).
    pub packet_pool_size: usize,
    /// CCA probes per `CHECK_TIME` sub-period (snoop sizing); `LISTEN_CCA`
    /// itself is budgeted by `cca_active_time()`/`cca_check_time()`, see
    /// [`Config::listen_cca_probe_count`].
    pub cca_count_max: u8,
    /// How many full channel-check cycles happen per second.
    pub channel_check_rate_hz: u32,
    /// rtimer tick frequency.
    pub rtimer_arch_hz: u32,
    /// coarse clock tick frequency.
    pub clock_hz: u32,
    /// Maximum consecutive clear sub-periods before the sampler gives up on a
    /// detected packet.
    pub max_silence_periods: u32,
    /// Maximum sub-periods of inactivity before the sampler gives up, when
    /// `with_fast_sleep` is set.
    pub max_nonactivity_periods: u32,
    /// Exit `SNOOPING` early once neither the radio nor a pending packet is
    /// active and inactivity has run long enough. Contiki's default is on.
    pub with_fast_sleep: bool,
    /// Optional cap on broadcasts per rolling one-second window.
    pub broadcast_rate_limit: Option<u32>,
    /// Keep the radio powered even when the RDC layer is switched off.
    pub keep_radio_on: bool,
}

/// Length in bytes of a valid acknowledgement frame (`spec.md` §6).
pub const ACK_LEN: usize = 3;

impl Default for Config {
    fn default() -> Self {
        let packet_pool_size = 8;
        Config {
            min_be: 0,
            max_be: 4,
            max_backoff: 5,
            max_frame_retries: 7,
            max_neighbor_queues: 2,
            max_packet_per_neighbor: packet_pool_size,
            packet_pool_size,
            cca_count_max: 2,
            channel_check_rate_hz: 8,
            rtimer_arch_hz: 65536,
            clock_hz: 128,
            max_silence_periods: 5,
            max_nonactivity_periods: 10,
            with_fast_sleep: true,
            broadcast_rate_limit: None,
            keep_radio_on: false,
        }
    }
}

impl Config {
    /// `CYCLE_TIME = RTIMER_ARCH_SECOND / CHANNEL_CHECK_RATE`.
    pub fn cycle_time(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / self.channel_check_rate_hz as f64)
    }

    /// `CCA_CHECK_TIME = RTIMER_ARCH_SECOND / 8192`.
    pub fn cca_check_time(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / 8192.0)
    }

    /// `CCA_SLEEP_TIME = RTIMER_ARCH_SECOND / 2000`.
    pub fn cca_sleep_time(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / 2000.0)
    }

    /// `CHECK_TIME = CCA_COUNT_MAX * (CCA_CHECK_TIME + CCA_SLEEP_TIME)`.
    pub fn check_time(&self) -> Duration {
        (self.cca_check_time() + self.cca_sleep_time()) * self.cca_count_max as u32
    }

    /// Roughly a 10% duty-cycle fraction of `CYCLE_TIME`, the window over
    /// which `LISTEN_CCA` probes the channel.
    pub fn cca_active_time(&self) -> Duration {
        self.cycle_time() / 10
    }

    /// `LISTEN_TIME_AFTER_PACKET_DETECTED = RTIMER_ARCH_SECOND / 80`.
    pub fn listen_time_after_packet_detected(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / 80.0)
    }

    /// `INTER_PACKET_INTERVAL = RTIMER_ARCH_SECOND / 2500`.
    pub fn inter_packet_interval(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / 2500.0)
    }

    /// `AFTER_ACK_DETECTED_WAIT_TIME = RTIMER_ARCH_SECOND / 1500`.
    pub fn after_ack_detected_wait_time(&self) -> Duration {
        rtimer_ticks(self, self.rtimer_arch_hz as f64 / 1500.0)
    }

    /// `STROBE_TIME = CYCLE_TIME + 2 * CHECK_TIME`.
    pub fn strobe_time(&self) -> Duration {
        self.cycle_time() + self.check_time() * 2
    }

    /// `INTER_PACKET_DEADLINE = CLOCK_SECOND / 32`, a coarse-tick duration.
    pub fn inter_packet_deadline(&self) -> Duration {
        clock_ticks(self, self.clock_hz as f64 / 32.0)
    }

    /// `duty_cycle = (CLOCK_SECOND * CYCLE_TIME) / RTIMER_ARCH_SECOND`,
    /// expressed as a coarse-tick duration.
    pub fn duty_cycle(&self) -> Duration {
        let cycle_secs = self.cycle_time().as_micros() as f64 / 1_000_000.0;
        clock_ticks(self, cycle_secs * self.clock_hz as f64)
    }

    /// Convert a count of coarse (clock-tick) ticks into a `Duration`, used
    /// for MAC backoff scheduling.
    pub fn coarse_ticks(&self, ticks: u32) -> Duration {
        clock_ticks(self, ticks as f64)
    }

    /// How many sub-periods of `check_time()` fit inside
    /// `listen_time_after_packet_detected()`.
    pub fn snoop_subperiod_limit(&self) -> u32 {
        let window = self.listen_time_after_packet_detected().as_micros();
        let sub = self.check_time().as_micros().max(1);
        (window / sub) as u32
    }

    /// How many `channel_clear()` probes fit inside `cca_active_time()`, each
    /// budgeted at `cca_check_time()`. `LISTEN_CCA` is bounded by this count
    /// rather than by wall-clock time, the same non-spinning substitution
    /// `strobe_slot_count` makes for `STROBE_TIME` in the transmitter.
    pub fn listen_cca_probe_count(&self) -> u32 {
        let window = self.cca_active_time().as_micros();
        let probe = self.cca_check_time().as_micros().max(1);
        ((window / probe) as u32).max(1)
    }

    /// Reject out-of-range values, mirroring the style of
    /// `common::scene::validate_scene` in the teacher crate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max-be", self.max_be, 3, 8)?;
        check_range("max-backoff", self.max_backoff, 0, 5)?;
        check_range("max-frame-retries", self.max_frame_retries, 0, 7)?;
        if self.max_neighbor_queues == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max-neighbor-queues",
                message: "must be at least 1".to_string(),
            });
        }
        if self.packet_pool_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "packet-pool-size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.channel_check_rate_hz == 0 || self.rtimer_arch_hz == 0 || self.clock_hz == 0 {
            return Err(ConfigError::OutOfRange {
                field: "channel-check-rate-hz/rtimer-arch-hz/clock-hz",
                message: "frequencies must be nonzero".to_string(),
            });
        }
        Ok(())
    }

    /// Load a configuration from a TOML file, same shape as the teacher's
    /// `ControlConfig::load`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

fn rtimer_ticks(config: &Config, rtimer_ticks: f64) -> Duration {
    let secs = rtimer_ticks / config.rtimer_arch_hz as f64;
    Duration::from_micros((secs * 1_000_000.0) as u64)
}

fn clock_ticks(config: &Config, clock_ticks: f64) -> Duration {
    let secs = clock_ticks / config.clock_hz as f64;
    Duration::from_micros((secs * 1_000_000.0) as u64)
}

fn check_range(field: &'static str, value: u8, min: u8, max: u8) -> Result<(), ConfigError> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange {
            field,
            message: format!("{value} outside allowed range {min}..={max}"),
        })
    } else {
        Ok(())
    }
}

/// Raised by [`Config::validate`]. Distinct from [`crate::status::TxStatus`]:
/// this type is a real `std::error::Error`, raised only at configuration
/// boundaries, never on the protocol hot path (`SPEC_FULL.md` §7). I/O and
/// TOML-parse failures in [`Config::load`] are reported as `anyhow::Error`
/// instead, since callers only ever display or propagate them.
#[derive(Debug)]
pub enum ConfigError {
    OutOfRange { field: &'static str, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OutOfRange { field, message } => write!(f, "config field '{field}' out of range: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().expect("default config must validate");
    }

    #[test]
    fn rejects_out_of_range_max_be() {
        let mut config = Config::default();
        config.max_be = 20;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { field: "max-be", .. })));
    }

    #[test]
    fn strobe_time_is_cycle_plus_two_check_times() {
        let config = Config::default();
        let expected = config.cycle_time() + config.check_time() * 2;
        assert_eq!(config.strobe_time(), expected);
    }

    #[test]
    fn duty_cycle_matches_formula() {
        let config = Config::default();
        let cycle_secs = config.cycle_time().as_micros() as f64 / 1_000_000.0;
        let expected = Duration::from_micros((cycle_secs * config.clock_hz as f64 * 1_000_000.0) as u64);
        assert_eq!(config.duty_cycle(), expected);
    }
}
