//! End-to-end scenarios driving the full [`super::MacDriver`] against
//! [`crate::testutil`]'s mock radio and framer, matching the numbered
//! scenarios in `spec.md` §8 not already covered by a narrower unit test.

use std::sync::{Arc, Mutex};

use embassy_time::Instant;

use crate::address::Address;
use crate::attributes::PacketType;
use crate::config::Config;
use crate::scratchpad::Scratchpad;
use crate::status::TxStatus;
use crate::testutil::{MockFramer, MockRadio};

use super::MacDriver;

fn driver(config: Config) -> MacDriver<MockRadio, MockFramer> {
    let mut mac = MacDriver::new(MockRadio::new(), MockFramer::new(), config, Address::new([1, 0]), 7, Instant::from_ticks(0));
    mac.init(Instant::from_ticks(0));
    mac.on();
    mac
}

fn advance_past_backoff(config: &Config, now: Instant) -> Instant {
    now + config.coarse_ticks(25)
}

#[test]
fn scenario_1_unicast_acked_completes_and_reclaims_pools() {
    let config = Config::default();
    let mut mac = driver(config.clone());

    let result = Arc::new(Mutex::new(None));
    let result_cb = Arc::clone(&result);

    // send() transmits a new head synchronously (spec.md §4.8 step 8), so
    // the matching ACK has to be staged before send() is called, using a
    // pinned sequence number since the real one is RNG-derived.
    mac.test_force_seqno(123);
    mac.rdc.radio.queue_ack([0xAA, 0xBB, (123u16 & 0xFF) as u8]);

    let mut pad = Scratchpad::new();
    pad.set_payload(&[0u8; 20]).unwrap();
    pad.attrs.receiver = Address::new([3, 0]);
    let now = Instant::from_ticks(0);
    mac.send(now, &mut pad, Box::new(move |status, n| *result_cb.lock().unwrap() = Some((status, n)))).unwrap();

    assert_eq!(
        *result.lock().unwrap(),
        Some((TxStatus::Ok, 1)),
        "the first transmission of a newly-queued frame must complete inside send() itself"
    );
    assert_eq!(mac.neighbor_count(), 0, "P4: empty neighbor is reclaimed");
    assert_eq!(mac.packet_pool_free_count(), config.packet_pool_size);
    assert_eq!(mac.metadata_pool_free_count(), config.packet_pool_size);
}

#[test]
fn scenario_2_unicast_unresponsive_exhausts_retries() {
    let config = Config::default();
    let mut mac = driver(config.clone());

    let result = Arc::new(Mutex::new(None));
    let result_cb = Arc::clone(&result);

    let mut pad = Scratchpad::new();
    pad.set_payload(&[1u8, 2, 3]).unwrap();
    pad.attrs.receiver = Address::new([3, 0]);
    pad.attrs.max_mac_transmissions = 3;
    let mut now = Instant::from_ticks(0);

    // No ACK is ever queued, so even the synchronous first attempt inside
    // send() times out; the remaining two attempts run off the retry
    // backoff via on_coarse_timer.
    mac.send(now, &mut pad, Box::new(move |status, n| *result_cb.lock().unwrap() = Some((status, n)))).unwrap();
    assert_eq!(*result.lock().unwrap(), None, "P7: must not complete after only the first attempt");

    let mut scratch = Scratchpad::new();
    for attempt in 2..=3 {
        now = advance_past_backoff(&config, now);
        mac.on_coarse_timer(now, &mut scratch);
        if attempt < 3 {
            assert_eq!(*result.lock().unwrap(), None, "P7: must not complete before max_transmissions attempts");
        }
    }

    assert_eq!(*result.lock().unwrap(), Some((TxStatus::NoAck, 3)));
    assert_eq!(mac.neighbor_count(), 0);
}

#[test]
fn scenario_5_pool_exhaustion_leaves_free_counts_unchanged() {
    let config = Config::default();
    let mut mac = driver(config.clone());
    let now = Instant::from_ticks(0);

    let addr_a = Address::new([3, 0]);
    let addr_b = Address::new([4, 0]);

    // Fill the shared 8-slot packet/metadata pool with 4 frames to each of
    // two neighbors (NEIGH default capacity is 2). The first send to each
    // neighbor fires a synchronous transmit attempt that fails (no ACK is
    // queued) and falls back to a retry backoff without touching the pools.
    for addr in [addr_a, addr_b] {
        for _ in 0..4 {
            let mut pad = Scratchpad::new();
            pad.set_payload(&[9u8]).unwrap();
            pad.attrs.receiver = addr;
            mac.send(now, &mut pad, Box::new(|_, _| {})).unwrap();
        }
    }

    assert_eq!(mac.packet_pool_free_count(), 0);
    assert_eq!(mac.metadata_pool_free_count(), 0);

    let mut pad = Scratchpad::new();
    pad.set_payload(&[9u8]).unwrap();
    pad.attrs.receiver = addr_a;
    let outcome = mac.send(now, &mut pad, Box::new(|_, _| {}));

    assert_eq!(outcome, Err(TxStatus::Err));
    assert_eq!(mac.packet_pool_free_count(), 0, "B2: pool exhaustion must not change free counts");
    assert_eq!(mac.metadata_pool_free_count(), 0);
    assert_eq!(mac.neighbor_count(), 2, "existing neighbors must be untouched");
}

#[test]
fn scenario_6_ack_type_frame_jumps_the_queue() {
    let config = Config::default();
    let mut mac = driver(config.clone());
    let order: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let now = Instant::from_ticks(0);

    // No ACK queued yet: the data frame's synchronous first attempt inside
    // send() fails and falls back to the retry backoff.
    mac.test_force_seqno(10);
    let mut data_pad = Scratchpad::new();
    data_pad.set_payload(&[1u8, 2]).unwrap();
    data_pad.attrs.receiver = Address::new([3, 0]);
    data_pad.attrs.packet_type = PacketType::Data;
    let order_data = Arc::clone(&order);
    mac.send(now, &mut data_pad, Box::new(move |_, _| order_data.lock().unwrap().push(1))).unwrap();
    let data_seqno = data_pad.attrs.mac_seqno;
    assert_eq!(data_seqno, 10);

    // The ACK-type frame jumps to the front of the queue and, being
    // ACK-priority, transmits immediately from inside send() even though
    // the queue wasn't empty. Stage its matching ACK beforehand.
    let ack_seqno = 11u16;
    mac.rdc.radio.queue_ack([0, 0, (ack_seqno & 0xFF) as u8]);
    let mut ack_pad = Scratchpad::new();
    ack_pad.set_payload(&[3u8]).unwrap();
    ack_pad.attrs.receiver = Address::new([3, 0]);
    ack_pad.attrs.packet_type = PacketType::Ack;
    let order_ack = Arc::clone(&order);
    mac.send(now, &mut ack_pad, Box::new(move |_, _| order_ack.lock().unwrap().push(2))).unwrap();
    assert_eq!(ack_pad.attrs.mac_seqno, ack_seqno);
    assert_eq!(*order.lock().unwrap(), vec![2], "ACK-type frame must complete before the earlier-enqueued data frame");

    // Now let the retried data frame succeed.
    let mut scratch = Scratchpad::new();
    let clock = advance_past_backoff(&config, now);
    mac.rdc.radio.queue_ack([0, 0, (data_seqno & 0xFF) as u8]);
    mac.on_coarse_timer(clock, &mut scratch);
    assert_eq!(*order.lock().unwrap(), vec![2, 1]);
}
