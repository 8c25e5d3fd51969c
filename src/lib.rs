//! # h4-bridge
//!
//! Bidirectional packet-framing bridge between a virtual HCI device
//! (`/dev/vhci`) and a vendor Bluetooth data channel (`/dev/stpbt`).
//!
//! Both endpoints are raw byte streams carrying H4-framed HCI traffic with
//! no transport envelope. The bridge reconstructs discrete packets from
//! arbitrarily fragmented non-blocking reads, classifies them, drops the
//! vhci driver's internal control packets on the way down, and forwards
//! everything else verbatim and in order to the opposite endpoint.
//!
//! ## Architecture
//!
//! - **protocol**: packet-type tags, the pure frame-boundary resolver, and
//!   the per-direction reassembler
//! - **policy**: per-direction forward/drop decisions
//! - **transport**: non-blocking duplex endpoints over raw fds
//! - **bridge**: the session and the cooperative, readiness-driven loop
//!
//! ## Example
//!
//! ```ignore
//! use h4_bridge::{Bridge, BridgeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> h4_bridge::Result<()> {
//!     let cancel = CancellationToken::new();
//!     let bridge = Bridge::open(&BridgeConfig::default(), cancel.clone()).await?;
//!     bridge.run().await
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod transport;

pub use bridge::{Bridge, BridgeConfig};
pub use error::{BridgeError, Result};
