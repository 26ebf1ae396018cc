//! Signal handling for graceful shutdown and display transitions

use std::sync::Arc;
use signal_hook_tokio::Signals;
use futures::stream::StreamExt;
use tracing::{info, warn};

use crate::state::AppState;

/// Wait for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal() {
    let mut signals = match Signals::new([
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
    ]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Failed to create signal handler: {}", e);
            return std::future::pending().await;
        }
    };

    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
}

/// Switch the display on SIGUSR1 (background) and SIGUSR2 (foreground),
/// the way a host reports entering and leaving low-power mode
pub async fn display_signal_task(state: Arc<AppState>) {
    let mut signals = match Signals::new([
        signal_hook::consts::SIGUSR1,
        signal_hook::consts::SIGUSR2,
    ]) {
        Ok(signals) => signals,
        Err(e) => {
            warn!("Failed to create display signal handler: {}", e);
            return;
        }
    };

    while let Some(signal) = signals.next().await {
        let mut display = match state.display() {
            Ok(display) => display,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let result = if signal == signal_hook::consts::SIGUSR1 {
            display.enter_background()
        } else {
            display.enter_foreground()
        };

        if let Err(e) = result {
            warn!("Failed to switch display on signal {}: {}", signal, e);
        }
    }
}
