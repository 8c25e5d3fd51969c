//! End-to-end bridge tests.
//!
//! These run the real forwarding loop over socketpairs standing in for the
//! two device nodes: one end of each pair is wrapped as a bridge endpoint,
//! the other end plays the device and is driven by the test.

use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use h4_bridge::policy::Direction;
use h4_bridge::transport::Endpoint;
use h4_bridge::{Bridge, BridgeConfig, BridgeError};

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay long enough that two writes land in separate bridge reads.
const READ_SEPARATION: Duration = Duration::from_millis(100);

/// One bridge endpoint plus the peer that plays the device behind it.
fn endpoint_pair(name: &'static str) -> (Endpoint, UnixStream) {
    let (ours, theirs) = StdUnixStream::pair().unwrap();
    ours.set_nonblocking(true).unwrap();
    theirs.set_nonblocking(true).unwrap();

    let endpoint = Endpoint::from_fd(OwnedFd::from(ours), name).unwrap();
    let peer = UnixStream::from_std(theirs).unwrap();

    (endpoint, peer)
}

struct Harness {
    /// Plays the kernel side of /dev/vhci (the host stack).
    host: UnixStream,
    /// Plays the Bluetooth chip behind /dev/stpbt.
    chip: UnixStream,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<h4_bridge::Result<()>>,
}

impl Harness {
    fn start() -> Self {
        let (vhci_endpoint, host) = endpoint_pair("vhci");
        let (chip_endpoint, chip) = endpoint_pair("chip");

        let cancel = CancellationToken::new();
        let bridge = Bridge::new(
            vhci_endpoint,
            chip_endpoint,
            &BridgeConfig::default(),
            cancel.clone(),
        );
        let task = tokio::spawn(bridge.run());

        Self {
            host,
            chip,
            cancel,
            task,
        }
    }

    async fn shutdown(self) -> h4_bridge::Result<()> {
        self.cancel.cancel();
        timeout(TEST_TIMEOUT, self.task).await.unwrap().unwrap()
    }
}

async fn read_exactly(stream: &mut UnixStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(TEST_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for forwarded bytes")
        .unwrap();
    buf
}

#[tokio::test]
async fn test_event_frame_split_across_reads_forwarded_once() {
    let mut harness = Harness::start();

    // Command Complete event, 7 bytes total, split 3 + 4
    harness.chip.write_all(&[0x04, 0x0e, 0x04]).await.unwrap();
    tokio::time::sleep(READ_SEPARATION).await;
    harness
        .chip
        .write_all(&[0x01, 0x0c, 0x20, 0x00])
        .await
        .unwrap();

    let forwarded = read_exactly(&mut harness.host, 7).await;
    assert_eq!(forwarded, [0x04, 0x0e, 0x04, 0x01, 0x0c, 0x20, 0x00]);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_multiple_frames_in_one_read_forwarded_in_order() {
    let mut harness = Harness::start();

    // Event then ACL data, written back to back
    let stream = [
        0x04, 0x0e, 0x01, 0x05, // event, 1 param byte
        0x02, 0x01, 0x00, 0x02, 0x00, 0xaa, 0xbb, // acl, 2 data bytes
    ];
    harness.chip.write_all(&stream).await.unwrap();

    let forwarded = read_exactly(&mut harness.host, stream.len()).await;
    assert_eq!(forwarded, stream);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_command_forwarded_host_to_chip() {
    let mut harness = Harness::start();

    let command = [0x01, 0x03, 0x0c, 0x00]; // HCI Reset
    harness.host.write_all(&command).await.unwrap();

    let forwarded = read_exactly(&mut harness.chip, command.len()).await;
    assert_eq!(forwarded, command);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_vendor_frame_dropped_host_to_chip() {
    let mut harness = Harness::start();

    // vhci-internal control packet; must never reach the chip
    harness.host.write_all(&[0xff, 0x01, 0xaa]).await.unwrap();
    tokio::time::sleep(READ_SEPARATION).await;

    // A command sent afterwards must be the first thing the chip sees
    let command = [0x01, 0x03, 0x0c, 0x00];
    harness.host.write_all(&command).await.unwrap();

    let forwarded = read_exactly(&mut harness.chip, command.len()).await;
    assert_eq!(forwarded, command);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_vendor_frame_forwarded_chip_to_host() {
    let mut harness = Harness::start();

    // Same byte pattern as the dropped case, opposite direction
    let vendor = [0xff, 0x01, 0xaa];
    harness.chip.write_all(&vendor).await.unwrap();

    let forwarded = read_exactly(&mut harness.host, vendor.len()).await;
    assert_eq!(forwarded, vendor);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_packet_type_is_fatal() {
    let mut harness = Harness::start();

    harness.host.write_all(&[0x05, 0x00, 0x00]).await.unwrap();

    let result = timeout(TEST_TIMEOUT, harness.task).await.unwrap().unwrap();
    match result {
        Err(BridgeError::Stream { direction, source }) => {
            assert_eq!(direction, Direction::HostToChip);
            assert!(matches!(
                *source,
                BridgeError::InvalidPacketType { tag: 0x05 }
            ));
        }
        other => panic!("expected a fatal stream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_frame_ahead_of_invalid_tag_forwarded_before_fatal() {
    let mut harness = Harness::start();

    // A complete HCI Reset with a garbage tag right behind it, one read
    harness
        .host
        .write_all(&[0x01, 0x03, 0x0c, 0x00, 0x05])
        .await
        .unwrap();

    // The command must reach the chip before the stream failure kills the loop
    let forwarded = read_exactly(&mut harness.chip, 4).await;
    assert_eq!(forwarded, [0x01, 0x03, 0x0c, 0x00]);

    let result = timeout(TEST_TIMEOUT, harness.task).await.unwrap().unwrap();
    match result {
        Err(BridgeError::Stream { direction, source }) => {
            assert_eq!(direction, Direction::HostToChip);
            assert!(matches!(
                *source,
                BridgeError::InvalidPacketType { tag: 0x05 }
            ));
        }
        other => panic!("expected a fatal stream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_endpoints_closed_after_shutdown() {
    let mut harness = Harness::start();

    harness.cancel.cancel();
    timeout(TEST_TIMEOUT, harness.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // Session teardown closed both bridge-side fds; the peers see EOF
    let mut buf = [0u8; 1];
    let n = timeout(TEST_TIMEOUT, harness.host.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
    let n = timeout(TEST_TIMEOUT, harness.chip.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_cancellation_yields_clean_shutdown() {
    let harness = Harness::start();
    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_traffic_flows_both_ways_independently() {
    let mut harness = Harness::start();

    harness.host.write_all(&[0x01, 0x03, 0x0c, 0x00]).await.unwrap();
    harness.chip.write_all(&[0x04, 0x0e, 0x01, 0x09]).await.unwrap();

    let to_chip = read_exactly(&mut harness.chip, 4).await;
    let to_host = read_exactly(&mut harness.host, 4).await;

    assert_eq!(to_chip, [0x01, 0x03, 0x0c, 0x00]);
    assert_eq!(to_host, [0x04, 0x0e, 0x01, 0x09]);

    harness.shutdown().await.unwrap();
}
