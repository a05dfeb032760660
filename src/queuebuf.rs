//! Queue-buffer adapter (C2).
//!
//! Grounded on the snapshot/restore discipline in
//! `examples/original_source/core/net/mac/contikimac/contikimac-for-aloha-rdc.c`'s
//! `packet_input`/`read_packet` functions: a queue-buffer is an owned copy of
//! the scratchpad, independent of whatever the scratchpad holds afterwards.

use crate::attributes::FrameAttributes;
use crate::scratchpad::{Scratchpad, MAX_FRAME_LEN};

/// An owned, sized copy of a frame that once sat in the scratchpad.
#[derive(Debug, Clone)]
pub struct QueueBuffer {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
    pub attrs: FrameAttributes,
}

impl QueueBuffer {
    /// Copy the active scratchpad frame (payload + attributes) into a fresh
    /// queue-buffer.
    pub fn snapshot_from_scratchpad(scratchpad: &Scratchpad) -> Self {
        let mut buf = [0u8; MAX_FRAME_LEN];
        buf[..scratchpad.len()].copy_from_slice(scratchpad.as_slice());
        QueueBuffer {
            buf,
            len: scratchpad.len(),
            attrs: scratchpad.attrs,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copy this buffer back into the scratchpad so a retransmit can reuse
    /// framer-populated bytes.
    pub fn restore_to_scratchpad(&self, scratchpad: &mut Scratchpad) {
        scratchpad.set_payload(self.as_slice()).expect("queue-buffer payload always fits MAX_FRAME_LEN");
        scratchpad.attrs = self.attrs;
    }

    /// Refresh only the attribute set, used by the retry path to attribute
    /// transmission energy correctly without re-copying the payload.
    pub fn update_attrs_from_scratchpad(&mut self, scratchpad: &Scratchpad) {
        self.attrs = scratchpad.attrs;
    }
}
