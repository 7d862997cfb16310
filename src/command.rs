use std::fmt;
use std::io;
use std::path::PathBuf;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

pub const SUCCESS: ExitCode = 0;

/// Status of a command aborted by an OS error before or after its program ran.
pub const GENERAL_ERROR: ExitCode = 1;

/// Status of a command whose program could not be executed at all.
pub const EXEC_FAILED: ExitCode = 127;

/// Operating-system failures met while launching commands.
#[derive(Debug)]
pub enum ExecError {
    /// The redirection target could not be opened.
    Open { path: PathBuf, source: io::Error },
    /// The program could not be located or executed.
    Spawn { program: String, source: io::Error },
    /// Waiting for a spawned child failed.
    Wait { program: String, source: io::Error },
    /// A pipeline channel could not be allocated.
    Channel { source: io::Error },
}

impl ExecError {
    /// Status the failed command counts as for sequencing purposes.
    ///
    /// `None` when no program ever ran (the command was aborted before spawning).
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            ExecError::Spawn { .. } => Some(EXEC_FAILED),
            ExecError::Open { .. } | ExecError::Wait { .. } | ExecError::Channel { .. } => None,
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Open { path, source } => write!(f, "{}: {}", path.display(), source),
            ExecError::Spawn { program, source } if source.kind() == io::ErrorKind::NotFound => {
                write!(f, "{program}: command not found")
            }
            ExecError::Spawn { program, source } => write!(f, "{program}: {source}"),
            ExecError::Wait { program, source } => {
                write!(f, "{program}: failed to wait for child: {source}")
            }
            ExecError::Channel { source } => write!(f, "pipe: {source}"),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Open { source, .. }
            | ExecError::Spawn { source, .. }
            | ExecError::Wait { source, .. }
            | ExecError::Channel { source } => Some(source),
        }
    }
}
