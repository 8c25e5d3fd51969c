//! Protocol module - H4 wire format, boundary resolution, and reassembly.
//!
//! This module holds everything the bridge knows about the byte streams:
//! - packet-type tags and per-type total-length computation
//! - the frame boundary resolver (pure, testable on literal arrays)
//! - the per-direction reassembler that turns reads into frames

mod frame;
mod h4;
mod reassembler;

pub use frame::Frame;
pub use h4::{
    resolve, Boundary, PacketType, ACL_DATA_TAG, COMMAND_TAG, EVENT_TAG, SCO_DATA_TAG, VENDOR_TAG,
};
pub use reassembler::{Reassembler, DEFAULT_CAPACITY};
