//! Interrupt handling.
//!
//! The interpreter never prints from inside a signal handler. `SIGINT` only
//! sets an atomic flag, which the main loop inspects at its next safe point.

use nix::sys::signal::{self, SigHandler, Signal};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reported whenever a caught interrupt is noticed.
pub const INTERRUPT_MESSAGE: &str = "Caught SIGINT. Press Ctrl+D to exit shell.";

/// What spawned children do with an interactive interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptPolicy {
    /// Children get the default disposition and are terminated by `SIGINT`.
    #[default]
    Terminate,
    /// Children ignore `SIGINT`; it is set to ignored between fork and exec.
    Ignore,
}

impl InterruptPolicy {
    /// Prepares `command` so the child starts with this disposition.
    pub(crate) fn apply(self, command: &mut Command) {
        if self == InterruptPolicy::Ignore {
            // SAFETY: the hook only calls signal(2), which is async-signal-safe.
            unsafe {
                command.pre_exec(ignore_sigint);
            }
        }
    }
}

fn ignore_sigint() -> io::Result<()> {
    // SAFETY: SigIgn installs no Rust code as a handler.
    unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }?;
    Ok(())
}

impl FromStr for InterruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminate" => Ok(InterruptPolicy::Terminate),
            "ignore" => Ok(InterruptPolicy::Ignore),
            other => Err(format!(
                "unknown interrupt policy `{other}` (expected `terminate` or `ignore`)"
            )),
        }
    }
}

impl fmt::Display for InterruptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptPolicy::Terminate => f.write_str("terminate"),
            InterruptPolicy::Ignore => f.write_str("ignore"),
        }
    }
}

/// Flag set asynchronously by `SIGINT` and drained by the interpreter.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Registers a `SIGINT` handler that sets the returned flag.
    ///
    /// From then on `SIGINT` no longer terminates the interpreter process.
    pub fn install() -> io::Result<Self> {
        let flag = InterruptFlag::default();
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag.0))?;
        tracing::debug!("SIGINT handler installed");
        Ok(flag)
    }

    /// Marks an interrupt as pending without a signal.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears the flag, returning whether an interrupt was pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
