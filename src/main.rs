//! speak CLI entry point.
//!
//! Usage:
//!   speak                      # Interactive session (or lines from piped stdin)
//!   speak -c <line>            # Interpret one line and exit with its status

use anyhow::{Context, Result};
use argh::FromArgs;
use speak::io_adapters::{EditorSource, ReaderSource};
use speak::signals::{InterruptFlag, InterruptPolicy};
use speak::{Config, Interpreter};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// An interactive command interpreter with `;`, `&&`, `|` and `<`/`>`/`>>`.
struct Args {
    #[argh(option, short = 'c')]
    /// interpret this line and exit with its status
    command: Option<String>,

    #[argh(option)]
    /// configuration file overriding the defaults (default: ~/.config/speak/config.toml)
    config: Option<PathBuf>,

    #[argh(option)]
    /// prompt shown before each interactive line
    prompt: Option<String>,

    #[argh(option)]
    /// what children do on Ctrl+C: terminate or ignore
    child_interrupt: Option<InterruptPolicy>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args: Args = argh::from_env();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("speak: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(prompt) = args.prompt {
        config.prompt = prompt;
    }
    if let Some(policy) = args.child_interrupt {
        config.child_interrupt = policy;
    }
    tracing::debug!(?config, "configuration loaded");

    let interrupts = InterruptFlag::install().context("failed to install SIGINT handler")?;
    let mut interpreter = Interpreter::new(config).with_interrupt_flag(interrupts);

    if let Some(line) = args.command {
        let code = interpreter.process_line(&line);
        return Ok(ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)));
    }

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        let mut source = EditorSource::new()?;
        interpreter.repl(&mut source)?;
    } else {
        let mut source = ReaderSource::new(stdin.lock());
        interpreter.repl(&mut source)?;
    }
    Ok(ExitCode::SUCCESS)
}
