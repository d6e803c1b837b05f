//! Ctrl+C handling.
//!
//! The first Ctrl+C raises a shared shutdown flag. Leaf hashing checks the
//! flag between files and stops with [`FinderError::Interrupted`], which the
//! binary maps to exit code 130. A second Ctrl+C exits the process
//! immediately, which is what gets the user out of a blocked prompt or a
//! hung filter command.
//!
//! [`FinderError::Interrupted`]: crate::duplicates::FinderError::Interrupted

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::ExitCode;

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag lowered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag itself, for [`FinderConfig::with_shutdown_flag`].
    ///
    /// [`FinderConfig::with_shutdown_flag`]: crate::duplicates::FinderConfig::with_shutdown_flag
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Errors from installing the signal hook.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// `ctrlc` refused the handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// Calling it again returns the same handler with the flag lowered. If some
/// other code already owns the Ctrl+C hook, an unhooked handler is returned
/// so that callers can still raise the flag themselves.
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// the hook cannot be installed at all.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();
    let hooked = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            let _ = writeln!(std::io::stderr(), "\nInterrupted again, exiting.");
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Stopping after the current file (Ctrl+C again to exit now)..."
        );
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });

    if let Err(e) = hooked {
        log::debug!("Ctrl+C handler not installed ({e}), using unhooked handler");
    }
    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
