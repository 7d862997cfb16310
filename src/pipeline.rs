//! Launching `|` pipelines.
//!
//! A pipeline of N stages owns exactly N-1 channels. Channel ends are created
//! close-on-exec, so no child inherits an end it was not explicitly wired to,
//! and each end is closed in this process as soon as the stage using it has
//! been spawned. By the time the first stage is waited on, the parent holds
//! no channel descriptors at all.

use crate::command::{ExecError, ExitCode, GENERAL_ERROR, SUCCESS};
use crate::external::{ExternalCommand, Launcher, wait};
use std::io::{PipeReader, PipeWriter};
use std::process::Stdio;

/// What happened to one stage: its exit code, or why it never ran.
pub type StageOutcome = Result<ExitCode, ExecError>;

impl Launcher {
    /// Runs all stages concurrently, the last one writing to inherited stdout.
    pub fn run_pipeline(&self, stages: &[Vec<String>]) -> Result<Vec<StageOutcome>, ExecError> {
        self.run_pipeline_with_output(stages, Stdio::inherit())
    }

    /// Runs all stages concurrently, the last one writing to `output`.
    ///
    /// A stage that fails to spawn does not cancel its siblings: its
    /// neighbours simply see end-of-stream or a closed reader. Every spawned
    /// stage is waited on, in spawn order, and one outcome is returned per
    /// stage. Only failing to allocate the channels aborts the whole pipeline,
    /// before anything is spawned.
    pub fn run_pipeline_with_output(
        &self,
        stages: &[Vec<String>],
        output: Stdio,
    ) -> Result<Vec<StageOutcome>, ExecError> {
        let commands: Vec<ExternalCommand> = stages
            .iter()
            .filter_map(|argv| ExternalCommand::from_argv(argv))
            .collect();
        let Some(last) = commands.len().checked_sub(1) else {
            return Ok(Vec::new());
        };

        let (mut readers, mut writers): (Vec<Option<PipeReader>>, Vec<Option<PipeWriter>>) =
            open_channels(last)?
                .into_iter()
                .map(|(reader, writer)| (Some(reader), Some(writer)))
                .unzip();
        let mut output = Some(output);

        let mut children = Vec::with_capacity(commands.len());
        for (i, cmd) in commands.iter().enumerate() {
            let stdin = match i.checked_sub(1) {
                Some(prev) => readers[prev].take().map_or_else(Stdio::null, Stdio::from),
                None => Stdio::inherit(),
            };
            let stdout = if i < last {
                writers[i].take().map_or_else(Stdio::null, Stdio::from)
            } else {
                output.take().unwrap_or_else(Stdio::inherit)
            };
            children.push(self.spawn(cmd, stdin, stdout));
        }

        Ok(children
            .into_iter()
            .zip(&commands)
            .map(|(child, cmd)| child.and_then(|child| wait(child, cmd.program())))
            .collect())
    }
}

fn open_channels(count: usize) -> Result<Vec<(PipeReader, PipeWriter)>, ExecError> {
    tracing::trace!(count, "allocating pipeline channels");
    (0..count)
        .map(|_| std::io::pipe().map_err(|source| ExecError::Channel { source }))
        .collect()
}

/// Collapses stage outcomes into one status: the first failing stage's code.
///
/// A stage that could not be executed counts as [`EXEC_FAILED`]; one that
/// could not be reaped counts as [`GENERAL_ERROR`].
///
/// [`EXEC_FAILED`]: crate::command::EXEC_FAILED
pub fn pipeline_status(outcomes: &[StageOutcome]) -> ExitCode {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(code) => *code,
            Err(err) => err.exit_code().unwrap_or(GENERAL_ERROR),
        })
        .find(|code| *code != SUCCESS)
        .unwrap_or(SUCCESS)
}
