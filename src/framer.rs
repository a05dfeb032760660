//! The framer contract consumed by the RDC layer (`spec.md` §6).
//!
//! Link-layer security is out of scope (`spec.md` §1 non-goals); a `Framer`
//! implementation is free to fold security processing into `create`/`parse`.

use crate::scratchpad::Scratchpad;

/// External collaborator: header (de)composition, operating in place on the
/// shared scratchpad.
pub trait Framer {
    /// Finalize the frame currently staged in `scratchpad`, returning its
    /// on-air length, or `Err` on a fatal framing failure. Implementations
    /// need not touch `scratchpad.attrs.is_created_and_secured`: the RDC
    /// layer sets it itself once `create` succeeds.
    fn create(&mut self, scratchpad: &mut Scratchpad) -> Result<usize, ()>;
    /// Parse a just-received frame in place, or `Err` to drop it.
    fn parse(&mut self, scratchpad: &mut Scratchpad) -> Result<(), ()>;
}
