//! Launching external programs.
//!
//! Programs are located by the operating system's usual search of the
//! directories in `PATH` (the `execvp` rules `std::process::Command` follows);
//! names containing a `/` are used as paths.

use crate::command::{ExecError, ExitCode, SUCCESS};
use crate::signals::InterruptPolicy;
use std::process::{Child, Command, ExitStatus, Stdio};

/// Command that is not a builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits an argument vector into program and arguments.
    ///
    /// Returns `None` for an empty vector, which names nothing to execute.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Spawns external programs and reaps them.
///
/// Every child handed out by [`Launcher::spawn`] must be passed to [`wait`]
/// exactly once; the launchers in this crate never drop an unreaped child.
#[derive(Debug, Clone, Copy, Default)]
pub struct Launcher {
    interrupt: InterruptPolicy,
}

impl Launcher {
    pub fn new(interrupt: InterruptPolicy) -> Self {
        Self { interrupt }
    }

    /// Spawns `cmd` with the given standard streams.
    ///
    /// The `Stdio` values are consumed: whatever descriptors they carry are
    /// closed in this process once the child has been created (or has failed
    /// to be created).
    pub fn spawn(
        &self,
        cmd: &ExternalCommand,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<Child, ExecError> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).stdin(stdin).stdout(stdout);
        self.interrupt.apply(&mut command);

        let child = command.spawn().map_err(|source| ExecError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;
        tracing::debug!(program = %cmd.program, pid = child.id(), "spawned child");
        Ok(child)
    }

    /// Runs `cmd` with inherited standard streams and waits for it.
    pub fn run(&self, cmd: &ExternalCommand) -> Result<ExitCode, ExecError> {
        self.run_with(cmd, Stdio::inherit(), Stdio::inherit())
    }

    /// Runs `cmd` with the given standard streams and waits for it.
    pub fn run_with(
        &self,
        cmd: &ExternalCommand,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<ExitCode, ExecError> {
        let child = self.spawn(cmd, stdin, stdout)?;
        wait(child, &cmd.program)
    }

    /// Runs an argument vector, treating an empty one as a successful no-op.
    pub fn run_argv(&self, argv: &[String]) -> Result<ExitCode, ExecError> {
        match ExternalCommand::from_argv(argv) {
            Some(cmd) => self.run(&cmd),
            None => Ok(SUCCESS),
        }
    }
}

/// Blocks until this specific child exits and returns its status.
pub fn wait(mut child: Child, program: &str) -> Result<ExitCode, ExecError> {
    let pid = child.id();
    let status = child.wait().map_err(|source| ExecError::Wait {
        program: program.to_string(),
        source,
    })?;
    let code = exit_code(status);
    tracing::debug!(pid, code, "reaped child");
    Ok(code)
}

/// Converts a wait status into a shell-style exit code.
pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
