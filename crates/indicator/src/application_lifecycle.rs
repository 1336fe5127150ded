//! Daemon shutdown.
//!
//! Every long running task selects on [`recv_exit`], so a single [`send_exit`] winds down the IPC
//! server, the animation timers and the feature pollers. The exit flag is latched: a task that
//! only starts waiting after the exit was requested returns right away.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tokio::sync::watch;

static APPLICATION_EXIT: Lazy<watch::Sender<bool>> = Lazy::new(|| watch::channel(false).0);

/// Request the termination of the daemon.
pub fn send_exit() {
    APPLICATION_EXIT.send_replace(true);
}

pub fn is_exiting() -> bool {
    *APPLICATION_EXIT.borrow()
}

/// Resolves once the daemon is shutting down.
pub async fn recv_exit() -> Result<()> {
    let mut exit = APPLICATION_EXIT.subscribe();
    exit.wait_for(|exiting| *exiting).await.context("Lifecycle channel closed")?;
    Ok(())
}

/// Select in a loop, breaking once the daemon is shutting down (see `crate::application_lifecycle`).
#[macro_export]
macro_rules! loop_select_exiting {
    ($($content:tt)*) => {
        loop {
            tokio::select! {
                Ok(()) = $crate::application_lifecycle::recv_exit() => {
                    break;
                }
                $($content)*
            }
        }
    };
}
