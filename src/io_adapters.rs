use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::BufRead;

/// Result of asking a [`LineSource`] for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line, without its trailing newline.
    Line(String),
    /// The read was cut short by an interrupt; ask again.
    Interrupted,
    /// The input is exhausted.
    Eof,
}

/// Where the interpreter's main loop gets its lines from.
pub trait LineSource {
    /// Reads the next line, showing `prompt` if the source is interactive.
    ///
    /// An `Err` means no further input can be read.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

/// Interactive terminal input with line editing.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialise line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                    tracing::warn!("failed to add editor history entry: {}", e);
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err).context("failed to read line"),
        }
    }
}

/// Non-interactive input read line by line, with no prompt.
///
/// Reads are retried on `EINTR`, so a `SIGINT` arriving mid-read is only
/// reported by the interpreter before the next line.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
            }
            Err(e) => Err(e).context("failed to read line"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    #[test]
    fn test_reader_source_strips_newline_and_ends() {
        let mut source = ReaderSource::new(Cursor::new("ls -l\n\nlast"));
        assert_eq!(
            source.read_line("> ").unwrap(),
            ReadOutcome::Line("ls -l".to_string())
        );
        assert_eq!(source.read_line("> ").unwrap(), ReadOutcome::Line(String::new()));
        assert_eq!(
            source.read_line("> ").unwrap(),
            ReadOutcome::Line("last".to_string())
        );
        assert_eq!(source.read_line("> ").unwrap(), ReadOutcome::Eof);
    }

    /// Fails its first read with `EINTR`, then reads from `inner`.
    struct InterruptedOnce<R> {
        interrupted: bool,
        inner: R,
    }

    impl<R: Read> Read for InterruptedOnce<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_reader_source_retries_interrupted_read() {
        let reader = InterruptedOnce {
            interrupted: false,
            inner: Cursor::new("true\n"),
        };
        let mut source = ReaderSource::new(BufReader::new(reader));
        assert_eq!(
            source.read_line("").unwrap(),
            ReadOutcome::Line("true".to_string())
        );
        assert_eq!(source.read_line("").unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn test_reader_source_tolerates_invalid_utf8() {
        let mut source = ReaderSource::new(Cursor::new(b"echo \xff\n".to_vec()));
        assert_eq!(
            source.read_line("").unwrap(),
            ReadOutcome::Line("echo \u{fffd}".to_string())
        );
    }
}
