//! Mock [`Radio`] and [`Framer`] implementations shared by unit tests across
//! the crate.

use std::collections::VecDeque;

use crate::config::ACK_LEN;
use crate::framer::Framer;
use crate::radio::Radio;
use crate::scratchpad::Scratchpad;

pub struct MockRadio {
    on: bool,
    transmit_count: u32,
    channel_busy: bool,
    receiving: bool,
    pending: bool,
    ack_queue: VecDeque<[u8; ACK_LEN]>,
}

impl MockRadio {
    pub fn new() -> Self {
        MockRadio {
            on: false,
            transmit_count: 0,
            channel_busy: false,
            receiving: false,
            pending: false,
            ack_queue: VecDeque::new(),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn transmit_count(&self) -> u32 {
        self.transmit_count
    }

    pub fn queue_ack(&mut self, bytes: [u8; ACK_LEN]) {
        self.ack_queue.push_back(bytes);
    }

    pub fn set_channel_busy(&mut self, busy: bool) {
        self.channel_busy = busy;
    }

    pub fn set_receiving_packet(&mut self, value: bool) {
        self.receiving = value;
    }

    pub fn set_pending_packet(&mut self, value: bool) {
        self.pending = value;
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl Radio for MockRadio {
    fn prepare(&mut self, _frame: &[u8]) {}

    fn transmit(&mut self) -> bool {
        self.transmit_count += 1;
        true
    }

    fn on(&mut self) {
        self.on = true;
    }

    fn off(&mut self) {
        self.on = false;
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.ack_queue.pop_front() {
            Some(ack) => {
                let n = ack.len().min(buf.len());
                buf[..n].copy_from_slice(&ack[..n]);
                n
            }
            None => 0,
        }
    }

    fn channel_clear(&mut self) -> bool {
        !self.channel_busy
    }

    fn receiving_packet(&mut self) -> bool {
        self.receiving || !self.ack_queue.is_empty()
    }

    fn pending_packet(&mut self) -> bool {
        self.pending
    }
}

#[derive(Default)]
pub struct MockFramer {
    pub fail_create: bool,
    pub fail_parse: bool,
}

impl MockFramer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Framer for MockFramer {
    fn create(&mut self, scratchpad: &mut Scratchpad) -> Result<usize, ()> {
        if self.fail_create {
            return Err(());
        }
        Ok(scratchpad.len())
    }

    fn parse(&mut self, _scratchpad: &mut Scratchpad) -> Result<(), ()> {
        if self.fail_parse {
            return Err(());
        }
        Ok(())
    }
}
