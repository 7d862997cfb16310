use crate::builtin::{self, BuiltinContext};
use crate::command::{ExecError, ExitCode, GENERAL_ERROR, SUCCESS};
use crate::config::Config;
use crate::external::{ExternalCommand, Launcher};
use crate::history::HistoryStore;
use crate::io_adapters::{LineSource, ReadOutcome};
use crate::parser::{self, Limits, RedirectKind, Redirection, Segment, SimpleCommand};
use crate::pipeline::pipeline_status;
use crate::redirect::open_target;
use crate::signals::{INTERRUPT_MESSAGE, InterruptFlag};
use std::fmt::Display;
use std::io::{self, Write};

/// Status of a line or segment rejected before anything ran.
pub const SYNTAX_ERROR: ExitCode = 2;

/// Whether the rest of the line still runs after a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue(ExitCode),
    Stop(ExitCode),
}

/// An interactive command interpreter session.
///
/// The interpreter owns the session's history and settings. Each line is
/// split into `&&` chains of `;` segments; every segment runs to completion
/// (its children reaped) before the next one starts. The first external
/// program that exits non-zero abandons the rest of the line. Builtins never
/// do, whatever their outcome, and pipelines only do when
/// [`Config::pipeline_failure_stops_chain`] is set.
///
/// Example
/// ```
/// use speak::{Config, Interpreter};
/// let mut sh = Interpreter::new(Config::default());
/// let mut out = Vec::new();
/// let code = sh.process_line_with_output("true ; history", &mut out);
/// assert_eq!(code, 0);
/// assert_eq!(String::from_utf8(out).unwrap(), "1: true ; history\n");
/// ```
pub struct Interpreter {
    config: Config,
    limits: Limits,
    history: HistoryStore,
    launcher: Launcher,
    interrupts: InterruptFlag,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self {
            limits: config.limits(),
            history: HistoryStore::new(config.history_capacity, config.history_overflow),
            launcher: Launcher::new(config.child_interrupt),
            interrupts: InterruptFlag::default(),
            config,
        }
    }

    /// Use `flag` (typically from [`InterruptFlag::install`]) to notice interrupts.
    pub fn with_interrupt_flag(mut self, flag: InterruptFlag) -> Self {
        self.interrupts = flag;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Read-Eval-Print Loop: runs until `source` reports end-of-input.
    ///
    /// Only a failing line source ends the loop with an error.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> anyhow::Result<()> {
        loop {
            self.report_interrupt(&mut io::stdout());
            match source.read_line(&self.config.prompt)? {
                ReadOutcome::Line(line) => {
                    self.process_line(&line);
                }
                ReadOutcome::Interrupted => {
                    self.interrupts.take();
                    println!("{INTERRUPT_MESSAGE}");
                }
                ReadOutcome::Eof => {
                    println!("\nExiting shell.");
                    return Ok(());
                }
            }
        }
    }

    /// Interprets one line, builtins writing to the process's stdout.
    pub fn process_line(&mut self, line: &str) -> ExitCode {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        self.process_line_with_output(line, &mut stdout)
    }

    /// Interprets one line, builtins writing to `stdout`.
    ///
    /// External programs always inherit the process's own standard streams.
    /// Returns the status of the last command that ran (0 if none did).
    pub fn process_line_with_output(&mut self, line: &str, stdout: &mut dyn Write) -> ExitCode {
        if line.trim().is_empty() {
            return SUCCESS;
        }
        let length = line.chars().count();
        if length > self.config.max_line_length {
            report(format_args!(
                "line too long ({length} characters, at most {})",
                self.config.max_line_length
            ));
            return SYNTAX_ERROR;
        }

        self.history.push(line);
        tracing::debug!(line, "interpreting");

        let parsed = match parser::parse_line(line, &self.limits) {
            Ok(parsed) => parsed,
            Err(e) => {
                report(e);
                return SYNTAX_ERROR;
            }
        };

        let mut status = SUCCESS;
        for chain in &parsed.chains {
            for segment in chain {
                let flow = self.run_segment(segment, stdout);
                self.report_interrupt(stdout);
                match flow {
                    Flow::Continue(code) => status = code,
                    Flow::Stop(code) => {
                        tracing::debug!(code, "abandoning rest of line");
                        return code;
                    }
                }
            }
        }
        status
    }

    fn run_segment(&self, segment: &Segment, stdout: &mut dyn Write) -> Flow {
        match segment {
            Segment::Pipeline(text) => self.run_pipeline(text),
            Segment::Simple(text) => match parser::classify(text, &self.limits) {
                Ok(cmd) => self.run_simple(&cmd, stdout),
                Err(e) => {
                    report(e);
                    Flow::Continue(SYNTAX_ERROR)
                }
            },
        }
    }

    fn run_pipeline(&self, text: &str) -> Flow {
        let stages = match parser::split_pipeline(text, &self.limits) {
            Ok(stages) => stages,
            Err(e) => {
                report(e);
                return Flow::Continue(SYNTAX_ERROR);
            }
        };
        let outcomes = match self.launcher.run_pipeline(&stages) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                report(e);
                return Flow::Continue(GENERAL_ERROR);
            }
        };
        for err in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
            report(err);
        }

        let code = pipeline_status(&outcomes);
        if self.config.pipeline_failure_stops_chain && code != SUCCESS {
            Flow::Stop(code)
        } else {
            Flow::Continue(code)
        }
    }

    fn run_simple(&self, cmd: &SimpleCommand, stdout: &mut dyn Write) -> Flow {
        let ctx = BuiltinContext {
            history: &self.history,
        };
        match &cmd.redirect {
            None => {
                if let Some(code) = builtin::dispatch(&cmd.argv, &ctx, stdout) {
                    let _ = stdout.flush();
                    return Flow::Continue(code);
                }
                match ExternalCommand::from_argv(&cmd.argv) {
                    Some(external) => finish(self.launcher.run(&external)),
                    None => Flow::Continue(SUCCESS),
                }
            }
            Some(redirect) => {
                if cmd.argv.first().is_some_and(|name| builtin::is_builtin(name)) {
                    let code = self.run_builtin_redirected(&cmd.argv, redirect, &ctx, stdout);
                    return Flow::Continue(code);
                }
                match ExternalCommand::from_argv(&cmd.argv) {
                    Some(external) => finish(self.launcher.run_redirected(&external, redirect)),
                    None => Flow::Continue(SUCCESS),
                }
            }
        }
    }

    /// Runs a builtin in-process with the redirection target as its output.
    fn run_builtin_redirected(
        &self,
        argv: &[String],
        redirect: &Redirection,
        ctx: &BuiltinContext<'_>,
        stdout: &mut dyn Write,
    ) -> ExitCode {
        let mut file = match open_target(redirect) {
            Ok(file) => file,
            Err(e) => {
                report(e);
                return GENERAL_ERROR;
            }
        };
        let code = match redirect.kind {
            RedirectKind::Input => builtin::dispatch(argv, ctx, stdout),
            RedirectKind::Output | RedirectKind::Append => builtin::dispatch(argv, ctx, &mut file),
        };
        code.unwrap_or(SUCCESS)
    }

    fn report_interrupt(&self, out: &mut dyn Write) {
        if self.interrupts.take() {
            let _ = writeln!(out, "{INTERRUPT_MESSAGE}");
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Turns an external command's result into sequencing flow.
fn finish(result: Result<ExitCode, ExecError>) -> Flow {
    match result {
        Ok(SUCCESS) => Flow::Continue(SUCCESS),
        Ok(code) => Flow::Stop(code),
        Err(e) => {
            report(&e);
            match e.exit_code() {
                Some(code) => Flow::Stop(code),
                None => Flow::Continue(GENERAL_ERROR),
            }
        }
    }
}

fn report(err: impl Display) {
    eprintln!("speak: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EXEC_FAILED;
    use crate::history::Overflow;
    use crate::test_support::lock_current_dir;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        (dir, path)
    }

    fn run(sh: &mut Interpreter, line: &str) -> (ExitCode, String) {
        let mut out = Vec::new();
        let code = sh.process_line_with_output(line, &mut out);
        (code, String::from_utf8(out).unwrap())
    }

    fn show(path: &Path) -> String {
        path.display().to_string()
    }

    #[test]
    fn test_failure_stops_rest_of_chain() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        let (code, _) = run(&mut sh, &format!("false ; echo should_not_print > {}", show(&out)));
        assert_eq!(code, 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_failure_stops_later_and_chains() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        run(&mut sh, &format!("false && echo x > {}", show(&out)));
        assert!(!out.exists());

        run(&mut sh, &format!("true && echo x > {}", show(&out)));
        assert_eq!(fs::read_to_string(&out).unwrap(), "x\n");
    }

    #[test]
    fn test_builtin_failure_never_stops_chain() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        let (code, _) = run(
            &mut sh,
            &format!("cd /nonexistent_speak_dir ; echo should_print > {}", show(&out)),
        );
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "should_print\n");
    }

    #[test]
    fn test_missing_program_stops_chain() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        let (code, _) = run(
            &mut sh,
            &format!("definitely-not-a-program-42 ; echo x > {}", show(&out)),
        );
        assert_eq!(code, EXEC_FAILED);
        assert!(!out.exists());
    }

    #[test]
    fn test_open_failure_and_syntax_error_only_skip_their_segment() {
        let (dir, out) = fixture();
        let missing = dir.path().join("missing.txt");
        let mut sh = Interpreter::default();
        let (code, _) = run(
            &mut sh,
            &format!("cat < {} ; echo > ; echo ok > {}", show(&missing), show(&out)),
        );
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "ok\n");
    }

    #[test]
    fn test_redirected_failure_stops_chain() {
        let (dir, out) = fixture();
        let scratch = dir.path().join("scratch.txt");
        let mut sh = Interpreter::default();
        run(
            &mut sh,
            &format!("ls /nonexistent_speak_dir > {} ; echo x > {}", show(&scratch), show(&out)),
        );
        assert!(scratch.exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_pipeline_failure_does_not_stop_by_default() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        run(&mut sh, &format!("false | true ; echo x > {}", show(&out)));
        assert!(out.exists());
    }

    #[test]
    fn test_pipeline_failure_can_stop_chain() {
        let (_dir, out) = fixture();
        let config = Config {
            pipeline_failure_stops_chain: true,
            ..Config::default()
        };
        let mut sh = Interpreter::new(config);
        let (code, _) = run(&mut sh, &format!("false | true ; echo x > {}", show(&out)));
        assert_eq!(code, 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_history_records_raw_lines() {
        let mut sh = Interpreter::default();
        run(&mut sh, "true && true | true");
        run(&mut sh, "   ");
        run(&mut sh, "definitely-not-a-program-42");
        let (code, out) = run(&mut sh, "history");
        assert_eq!(code, 0);
        assert_eq!(
            out,
            "1: true && true | true\n2: definitely-not-a-program-42\n3: history\n"
        );
    }

    #[test]
    fn test_history_output_can_be_redirected() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        let line = format!("history > {}", show(&out));
        let (code, printed) = run(&mut sh, &line);
        assert_eq!(code, 0);
        assert!(printed.is_empty());
        assert_eq!(fs::read_to_string(&out).unwrap(), format!("1: {line}\n"));
    }

    #[test]
    fn test_history_is_bounded() {
        let _lock = lock_current_dir();
        let mut sh = Interpreter::default();
        for _ in 0..105 {
            run(&mut sh, "cd .");
        }
        assert_eq!(sh.history().len(), 100);
        let (_, out) = run(&mut sh, "history");
        assert_eq!(out.lines().count(), 100);
        assert_eq!(out.lines().last(), Some("100: cd ."));
    }

    #[test]
    fn test_history_bound_drop_oldest() {
        let config = Config {
            history_overflow: Overflow::DropOldest,
            ..Config::default()
        };
        let mut sh = Interpreter::new(config);
        for i in 1..=105 {
            run(&mut sh, &format!("true {i}"));
        }
        let (_, out) = run(&mut sh, "history");
        assert_eq!(out.lines().count(), 100);
        assert_eq!(out.lines().next(), Some("1: true 7"));
        assert_eq!(out.lines().last(), Some("100: history"));
    }

    #[test]
    fn test_cd_dot_leaves_cwd_unchanged() {
        let _lock = lock_current_dir();
        let before = std::env::current_dir().unwrap();
        let mut sh = Interpreter::default();
        for _ in 0..5 {
            assert_eq!(run(&mut sh, "cd .").0, 0);
        }
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_huge_history_capacity_is_accepted() {
        let config = Config::from_overlay_str("history_capacity = 9223372036854775807").unwrap();
        let mut sh = Interpreter::new(config);
        let (code, out) = run(&mut sh, "history");
        assert_eq!(code, 0);
        assert_eq!(out, "1: history\n");
    }

    #[test]
    fn test_too_long_line_is_rejected() {
        let config = Config {
            max_line_length: 8,
            ..Config::default()
        };
        let mut sh = Interpreter::new(config);
        assert_eq!(run(&mut sh, "echo too long").0, SYNTAX_ERROR);
        assert!(sh.history().is_empty());
        assert_eq!(run(&mut sh, "true").0, 0);
    }

    #[test]
    fn test_too_many_segments_runs_nothing() {
        let (_dir, out) = fixture();
        let mut sh = Interpreter::default();
        let mut line = "true ; ".repeat(10);
        line.push_str(&format!("echo x > {}", show(&out)));
        assert_eq!(run(&mut sh, &line).0, SYNTAX_ERROR);
        assert!(!out.exists());
        assert_eq!(sh.history().len(), 1);
    }

    #[test]
    fn test_pending_interrupt_is_reported_after_segment() {
        let flag = InterruptFlag::default();
        let mut sh = Interpreter::default().with_interrupt_flag(flag.clone());
        flag.raise();
        let (_, out) = run(&mut sh, "true");
        assert_eq!(out, format!("{INTERRUPT_MESSAGE}\n"));
        assert!(!flag.take());
    }
}
