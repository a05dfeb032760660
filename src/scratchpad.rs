//! The shared packet scratchpad (C2, `spec.md` §3 and §9).
//!
//! `spec.md` §9 describes the source's `packetbuf` as a process-wide
//! singleton and suggests modeling it "as a `SharedScratchpad` object passed
//! explicitly into framer, radio, and MAC". We take that option: callers own
//! a `Scratchpad` value and pass `&mut` references to the drivers that need
//! it, so the single-owner discipline the source relies on is enforced by
//! the borrow checker instead of documented by convention.

use crate::attributes::FrameAttributes;

/// Maximum frame size the scratchpad can hold (802.15.4 aMaxPHYPacketSize).
pub const MAX_FRAME_LEN: usize = 127;

/// Holds at most one frame being actively prepared, transmitted, or
/// received, together with its attributes.
#[derive(Debug, Clone)]
pub struct Scratchpad {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
    pub attrs: FrameAttributes,
}

impl Scratchpad {
    pub fn new() -> Self {
        Scratchpad {
            buf: [0; MAX_FRAME_LEN],
            len: 0,
            attrs: FrameAttributes::default(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Replace the payload. Fails without mutating state if `data` would
    /// overflow the frame buffer.
    pub fn set_payload(&mut self, data: &[u8]) -> Result<(), ()> {
        if data.len() > MAX_FRAME_LEN {
            return Err(());
        }
        self.buf[..data.len()].copy_from_slice(data);
        self.len = data.len();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.attrs = FrameAttributes::default();
    }
}

impl Default for Scratchpad {
    fn default() -> Self {
        Self::new()
    }
}
