use crate::command::{ExecError, ExitCode};
use crate::external::{ExternalCommand, Launcher};
use crate::parser::{RedirectKind, Redirection};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::process::Stdio;

/// Permission bits for files created by `>` and `>>` (before the umask).
pub const CREATE_MODE: u32 = 0o644;

/// Opens the target of a redirection with the mode its operator implies.
///
/// `<` opens read-only and requires the file to exist; `>` creates or
/// truncates; `>>` creates or appends.
pub fn open_target(redirect: &Redirection) -> Result<File, ExecError> {
    let mut options = OpenOptions::new();
    match redirect.kind {
        RedirectKind::Input => options.read(true),
        RedirectKind::Output => options
            .write(true)
            .create(true)
            .truncate(true)
            .mode(CREATE_MODE),
        RedirectKind::Append => options.append(true).create(true).mode(CREATE_MODE),
    };
    options
        .open(&redirect.target)
        .map_err(|source| ExecError::Open {
            path: PathBuf::from(&redirect.target),
            source,
        })
}

impl Launcher {
    /// Runs `cmd` with one standard stream replaced by the redirection target.
    ///
    /// Nothing is spawned when the target cannot be opened. The parent's copy
    /// of the descriptor is closed as soon as the child has been spawned.
    pub fn run_redirected(
        &self,
        cmd: &ExternalCommand,
        redirect: &Redirection,
    ) -> Result<ExitCode, ExecError> {
        let file = open_target(redirect)?;
        let (stdin, stdout) = match redirect.kind {
            RedirectKind::Input => (Stdio::from(file), Stdio::inherit()),
            RedirectKind::Output | RedirectKind::Append => (Stdio::inherit(), Stdio::from(file)),
        };
        self.run_with(cmd, stdin, stdout)
    }
}
