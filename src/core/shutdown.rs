//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_signal`], an async helper that completes with the first
//! shutdown signal the process receives.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd)
//! - `SIGUSR1`, `SIGUSR2` (used by the rig's launcher scripts to stop the supervisor)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`], reported as [`SignalKind::Interrupt`]

use std::fmt;

/// Shutdown signal that was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl SignalKind {
    /// Conventional signal name.
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::User1 => "SIGUSR1",
            SignalKind::User2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waits for a shutdown signal.
///
/// Each call creates independent signal listeners.
///
/// Returns the signal, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<SignalKind> {
    use tokio::signal::unix::{SignalKind as Os, signal};

    let mut sigint = signal(Os::interrupt())?;
    let mut sigterm = signal(Os::terminate())?;
    let mut sigusr1 = signal(Os::user_defined1())?;
    let mut sigusr2 = signal(Os::user_defined2())?;

    let kind = tokio::select! {
        _ = sigint.recv()  => SignalKind::Interrupt,
        _ = sigterm.recv() => SignalKind::Terminate,
        _ = sigusr1.recv() => SignalKind::User1,
        _ = sigusr2.recv() => SignalKind::User2,
    };
    Ok(kind)
}

/// Waits for a shutdown signal.
///
/// Each call creates independent signal listeners.
///
/// Returns the signal, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<SignalKind> {
    tokio::signal::ctrl_c().await?;
    Ok(SignalKind::Interrupt)
}
