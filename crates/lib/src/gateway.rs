//! Gateway entry point: open both endpoints, dispatch until shutdown or until
//! the serial link is lost.

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::endpoint::{NetworkEndpoint, SerialEndpoint};
use anyhow::{Context, Result};

/// Run the gateway between UDP `listen` and the serial device at `device`.
/// Returns `Ok` after SIGINT/SIGTERM and an error when startup fails or the
/// serial port goes away.
pub async fn run_gateway(config: Config, listen: &str, device: &str) -> Result<()> {
    config.validate()?;

    let network = NetworkEndpoint::bind(listen, &config.network)
        .await
        .context("starting network endpoint")?;
    let serial = match SerialEndpoint::open(device, &config.serial, &config.pacing) {
        Ok(s) => s,
        Err(e) => {
            network.close();
            return Err(e).context("starting serial endpoint");
        }
    };
    if !config.pacing.enabled {
        log::warn!("output pacing disabled; the device may drop bytes");
    }

    let mut dispatcher = Dispatcher::new(network, serial, tokio::io::stdout());
    let outcome = tokio::select! {
        res = dispatcher.run() => res,
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, closing endpoints");
            Ok(())
        }
    };
    dispatcher.close();
    outcome.context("gateway stopped")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
