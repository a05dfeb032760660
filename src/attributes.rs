//! Frame attributes carried alongside the scratchpad payload.
//!
//! Names follow the contract-level attribute set in `spec.md` §6
//! (`MAC_SEQNO`, `MAC_ACK`, `MAX_MAC_TRANSMISSIONS`, `PACKET_TYPE`,
//! `PENDING`, `IS_CREATED_AND_SECURED`, receiver/sender addresses).

use crate::address::Address;

/// Packet-type attribute. ACK-type frames jump the neighbor queue (C8 step
/// 7); everything else is plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketType {
    #[default]
    Data,
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameAttributes {
    pub mac_seqno: u16,
    pub mac_ack: bool,
    pub max_mac_transmissions: u8,
    pub packet_type: PacketType,
    pub pending: bool,
    pub is_created_and_secured: bool,
    pub receiver: Address,
    pub sender: Address,
}
