//! Forwarding policy - per-direction decisions on extracted frames.
//!
//! The two directions are not symmetric. Everything coming up from the
//! chip is real controller traffic and is forwarded. Going down, vendor
//! packets are control messages between the kernel's vhci driver and its
//! client; they are meaningless (and potentially harmful) on the wire to
//! the physical chip, so they are consumed and discarded.

use std::fmt;

use crate::protocol::PacketType;

/// A bridge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Hardware channel to virtual-HCI device (controller to host).
    ChipToHost,
    /// Virtual-HCI device to hardware channel (host to controller).
    HostToChip,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ChipToHost => write!(f, "rx<-chip"),
            Direction::HostToChip => write!(f, "tx->chip"),
        }
    }
}

/// Decide whether a frame crossing in `direction` is forwarded verbatim
/// to the opposite endpoint or dropped.
pub fn should_forward(direction: Direction, packet_type: PacketType) -> bool {
    match direction {
        Direction::ChipToHost => true,
        Direction::HostToChip => packet_type != PacketType::Vendor,
    }
}
