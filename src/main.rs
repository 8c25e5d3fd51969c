//! Bridge binary: /dev/vhci <-> /dev/stpbt.
//!
//! Runs until SIGINT or SIGTERM, then shuts down cooperatively. Set
//! `BRIDGE_VERBOSE` in the environment to hex-dump every frame crossing
//! the bridge; `RUST_LOG` controls the log filter as usual.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use h4_bridge::{Bridge, BridgeConfig, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BridgeConfig {
        verbose: std::env::var_os("BRIDGE_VERBOSE").is_some(),
        ..BridgeConfig::default()
    };

    let cancel = CancellationToken::new();
    if let Err(e) = spawn_signal_listener(cancel.clone()) {
        tracing::error!("failed to install signal handlers: {e}");
        return ExitCode::FAILURE;
    }

    let bridge = match Bridge::open(&config, cancel).await {
        Ok(bridge) => bridge,
        Err(e) => {
            tracing::error!("failed to open bridge endpoints: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("bridge running; check /sys/class/bluetooth/ for the controller");

    match bridge.run().await {
        Ok(()) => {
            tracing::info!("bridge stopped cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("bridge terminated: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Cancel the token on the first SIGINT or SIGTERM.
fn spawn_signal_listener(cancel: CancellationToken) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
        cancel.cancel();
    });

    Ok(())
}
