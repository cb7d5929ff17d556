//! Common utilities

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::error::CensusError;

/// Check if a command is available in PATH
pub fn command_exists(cmd: &str) -> bool {
    std::process::Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run-level cancellation flag shared with the signal handler
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Bail out of the run if cancellation was requested
    pub fn check(&self) -> Result<(), CensusError> {
        if self.is_cancelled() {
            Err(CensusError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Cancel `token` on the first Ctrl-C
///
/// The signal is awaited on a dedicated thread with its own current-thread
/// runtime; the census itself stays blocking.
pub fn cancel_on_ctrl_c(token: CancelToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "failed to start signal runtime; Ctrl-C will not cancel cleanly");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("received Ctrl-C, cancelling run");
                token.cancel();
            }
        });
    });
}
