//! Protocol-level send outcomes.
//!
//! `TxStatus` is data, not a Rust `Error`: it is the payload of the upper
//! layer's send callback (`spec.md` §7), never propagated with `?`.

/// Outcome of a completed or provisional transmit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Frame acknowledged (unicast) or fully strobed (broadcast).
    Ok,
    /// Ack expected but not captured within the strobe window.
    NoAck,
    /// Channel or radio busy at send time; the caller should keep waiting.
    Collision,
    /// Transient failure, typically pool exhaustion. Terminal for the frame.
    Err,
    /// Fatal failure: framer error, RDC disabled when required, zero length.
    ErrFatal,
    /// The RDC layer deferred completion; it will invoke the callback again.
    Deferred,
}

impl TxStatus {
    /// Whether this status ends the frame's lifecycle (it will not be
    /// retried and no further callback for the same attempt is expected).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Collision | TxStatus::Deferred)
    }
}
