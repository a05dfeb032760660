//! The radio driver contract consumed by the RDC layer (`spec.md` §6).

/// External collaborator: the physical (or simulated) radio.
pub trait Radio {
    /// Stage `frame` for transmission.
    fn prepare(&mut self, frame: &[u8]);
    /// Transmit the staged frame. Returns `false` on a hardware failure.
    fn transmit(&mut self) -> bool;
    fn on(&mut self);
    fn off(&mut self);
    /// Read up to `buf.len()` bytes of the most recently received frame.
    fn read(&mut self, buf: &mut [u8]) -> usize;
    /// Clear Channel Assessment: `true` if the channel is idle.
    fn channel_clear(&mut self) -> bool;
    fn receiving_packet(&mut self) -> bool;
    fn pending_packet(&mut self) -> bool;
}
