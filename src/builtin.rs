use crate::command::ExitCode;
use crate::history::HistoryStore;
use anyhow::{Context, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;

/// Interpreter state a builtin may look at.
pub struct BuiltinContext<'a> {
    pub history: &'a HistoryStore,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command, writing any regular output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, ctx: &BuiltinContext<'_>) -> Result<ExitCode>;
}

/// Returns `true` when `name` is handled in-process.
pub fn is_builtin(name: &str) -> bool {
    name == Cd::name() || name == History::name()
}

/// Runs `argv` as a builtin if its first word names one.
///
/// Returns `None` when `argv` is empty or not a builtin; the caller then
/// treats it as an external program. Failures are reported to stderr here and
/// come back as a non-zero status.
pub fn dispatch(
    argv: &[String],
    ctx: &BuiltinContext<'_>,
    stdout: &mut dyn Write,
) -> Option<ExitCode> {
    let (name, args) = argv.split_first()?;
    let code = match name.as_str() {
        n if n == Cd::name() => run::<Cd>(args, ctx, stdout),
        n if n == History::name() => run::<History>(args, ctx, stdout),
        _ => return None,
    };
    Some(code)
}

fn run<T: BuiltinCommand>(
    args: &[String],
    ctx: &BuiltinContext<'_>,
    stdout: &mut dyn Write,
) -> ExitCode {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::name()], &args) {
        Ok(cmd) => match cmd.execute(stdout, ctx) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{e:#}");
                1
            }
        },
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => match writeln!(stdout, "{}", output.trim_end()) {
                Ok(()) => 0,
                Err(_) => 1,
            },
            Err(()) => {
                eprintln!("{}: {}", T::name(), output.trim_end());
                1
            }
        },
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, _ctx: &BuiltinContext<'_>) -> Result<ExitCode> {
        let Some(target) = self.target else {
            bail!("cd: missing argument");
        };
        env::set_current_dir(&target).with_context(|| format!("cd: {target}"))?;
        tracing::debug!(dir = %target, "changed directory");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the lines entered in this session, numbered from 1.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &BuiltinContext<'_>) -> Result<ExitCode> {
        ctx.history.write_to(stdout)?;
        Ok(0)
    }
}
