//! Bridge session and cooperative forwarding loop.
//!
//! Ties the pieces together: two [`Endpoint`]s, one [`Reassembler`] per
//! direction, the forwarding policy, and a single-task readiness-driven
//! loop. All parsing, buffering, and writing run to completion between
//! readiness waits; the only suspension points are the `select!` arms.
//!
//! # Example
//!
//! ```ignore
//! use h4_bridge::{Bridge, BridgeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let bridge = Bridge::open(&BridgeConfig::default(), cancel.clone()).await?;
//! bridge.run().await?;
//! ```

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, Result};
use crate::policy::{self, Direction};
use crate::protocol::{Frame, Reassembler, DEFAULT_CAPACITY};
use crate::transport::Endpoint;

/// Default virtual-HCI device node. Opening it is what makes the kernel
/// register a controller instance.
pub const VHCI_DEV: &str = "/dev/vhci";

/// Default vendor Bluetooth data channel.
pub const STPBT_DEV: &str = "/dev/stpbt";

/// Scratch buffer size for a single non-blocking read.
const READ_CHUNK: usize = 4096;

/// Upper bound on time between cancellation checks when no traffic flows.
const LIVENESS_TICK: Duration = Duration::from_secs(1);

/// Delay between the two opens, giving the kernel time to materialize the
/// controller device node created by the vhci open.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Hex-dump truncation point for verbose frame logging.
const DUMP_LIMIT: usize = 32;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Path of the virtual-HCI device node.
    pub vhci_path: PathBuf,
    /// Path of the hardware data channel.
    pub chip_path: PathBuf,
    /// Log a truncated hex dump of every frame crossing the bridge.
    pub verbose: bool,
    /// Per-direction accumulator capacity.
    pub capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            vhci_path: PathBuf::from(VHCI_DEV),
            chip_path: PathBuf::from(STPBT_DEV),
            verbose: false,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A bridge session: two open endpoints plus loop state.
///
/// Created once at startup; torn down by dropping, which closes both
/// endpoint fds. Field order matters: the chip channel closes before the
/// vhci device, the reverse of the open order.
pub struct Bridge {
    chip: Endpoint,
    vhci: Endpoint,
    verbose: bool,
    capacity: usize,
    cancel: CancellationToken,
}

/// One completed readiness wait.
enum Wakeup {
    Cancelled,
    Tick,
    Chip(io::Result<usize>),
    Vhci(io::Result<usize>),
}

impl Bridge {
    /// Open both endpoints and assemble a session.
    ///
    /// The virtual-HCI device is opened first: that open is what causes
    /// the kernel to register the controller, and the hardware channel
    /// open may depend on it. A short settle delay sits between the two.
    pub async fn open(config: &BridgeConfig, cancel: CancellationToken) -> Result<Self> {
        tracing::info!("opening {}", config.vhci_path.display());
        let vhci = Endpoint::open(&config.vhci_path, "vhci")?;

        tokio::time::sleep(SETTLE_DELAY).await;

        tracing::info!("opening {}", config.chip_path.display());
        let chip = Endpoint::open(&config.chip_path, "chip")?;

        Ok(Self::new(vhci, chip, config, cancel))
    }

    /// Assemble a session from already open endpoints.
    ///
    /// Lets tests run the full loop over socketpairs.
    pub fn new(
        vhci: Endpoint,
        chip: Endpoint,
        config: &BridgeConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            chip,
            vhci,
            verbose: config.verbose,
            capacity: config.capacity,
            cancel,
        }
    }

    /// Run the forwarding loop until cancellation or a fatal error.
    ///
    /// Per iteration: wait for readability on either endpoint (bounded by
    /// a liveness tick so cancellation is observed even with no traffic),
    /// perform one non-blocking read on whichever endpoint woke us, feed
    /// the bytes to that direction's reassembler, and forward or drop each
    /// extracted frame per the policy. Returns `Ok(())` only on observed
    /// cancellation; any fatal read, write, parse, or overflow condition
    /// is returned as the error that ended the loop.
    pub async fn run(self) -> Result<()> {
        // The endpoints stay on `self` and are only borrowed here, so the
        // close order on every exit path comes from the field order above.
        let chip = &self.chip;
        let vhci = &self.vhci;
        let cancel = &self.cancel;
        let verbose = self.verbose;

        let mut from_chip = Reassembler::with_capacity(self.capacity);
        let mut from_host = Reassembler::with_capacity(self.capacity);

        let mut chip_buf = vec![0u8; READ_CHUNK];
        let mut host_buf = vec![0u8; READ_CHUNK];

        let mut tick = tokio::time::interval(LIVENESS_TICK);

        loop {
            let wakeup = tokio::select! {
                _ = cancel.cancelled() => Wakeup::Cancelled,
                _ = tick.tick() => Wakeup::Tick,
                read = chip.read_chunk(&mut chip_buf) => Wakeup::Chip(read),
                read = vhci.read_chunk(&mut host_buf) => Wakeup::Vhci(read),
            };

            match wakeup {
                Wakeup::Cancelled => {
                    tracing::info!("cancellation observed, shutting down bridge");
                    return Ok(());
                }

                Wakeup::Tick => continue,

                Wakeup::Chip(read) => {
                    let n = read_or_fail(read, Direction::ChipToHost)?;
                    pump(
                        Direction::ChipToHost,
                        &chip_buf[..n],
                        &mut from_chip,
                        vhci,
                        verbose,
                    )
                    .await?;
                }

                Wakeup::Vhci(read) => {
                    let n = read_or_fail(read, Direction::HostToChip)?;
                    pump(
                        Direction::HostToChip,
                        &host_buf[..n],
                        &mut from_host,
                        chip,
                        verbose,
                    )
                    .await?;
                }
            }
        }
    }
}

fn read_or_fail(read: io::Result<usize>, direction: Direction) -> Result<usize> {
    read.map_err(|e| {
        tracing::error!("{direction}: read failed: {e}");
        BridgeError::from(e).in_direction(direction)
    })
}

/// Feed one read's bytes through a direction: reassemble, consult the
/// policy, forward or drop each frame.
async fn pump(
    direction: Direction,
    chunk: &[u8],
    reassembler: &mut Reassembler,
    sink: &Endpoint,
    verbose: bool,
) -> Result<()> {
    let frames = reassembler.feed(chunk).map_err(|e| {
        tracing::error!("{direction}: {e}");
        e.in_direction(direction)
    })?;

    for frame in frames {
        if !policy::should_forward(direction, frame.packet_type) {
            if verbose {
                tracing::info!("{direction} {} (ignored)", dump(&frame));
            }
            continue;
        }

        if verbose {
            tracing::info!("{direction} {}", dump(&frame));
        }

        if let Err(e) = sink.write_frame(frame.as_bytes()).await {
            tracing::error!(
                "{direction}: failed to forward {:?} frame of {} bytes to {}: {e}",
                frame.packet_type,
                frame.len(),
                sink.name(),
            );
            return Err(e.in_direction(direction));
        }
    }

    // A feed can complete frames and then hit a garbage tag; those frames
    // were forwarded above, now the stream failure becomes fatal.
    if let Some(tag) = reassembler.poison() {
        let e = BridgeError::InvalidPacketType { tag };
        tracing::error!("{direction}: {e}");
        return Err(e.in_direction(direction));
    }

    Ok(())
}

fn dump(frame: &Frame) -> String {
    let bytes = frame.as_bytes();
    let mut out = String::with_capacity(16 + 3 * DUMP_LIMIT);

    let _ = write!(out, "({} bytes):", bytes.len());
    for byte in bytes.iter().take(DUMP_LIMIT) {
        let _ = write!(out, " {byte:02x}");
    }
    if bytes.len() > DUMP_LIMIT {
        out.push_str(" ...");
    }

    out
}
